//! Quota policy checks.
//!
//! Pure functions invoked at the moment a file is offered to a
//! workflow, before anything is downloaded or written, so a rejection
//! never leaves an orphaned scratch file behind. A rejection reports
//! the reason and leaves the session state untouched.

use crate::config::MB;
use thiserror::Error;

/// Why an offered file or batch was rejected.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum QuotaViolation {
    /// A single file is larger than the per-file limit.
    #[error("File size exceeds the limit of {limit_mb} MB")]
    FileTooLarge {
        /// Per-file limit in whole megabytes.
        limit_mb: u64,
    },
    /// The batch already holds the maximum number of files.
    #[error("Maximum file limit of {max} reached. Please send 'done' to start merging.")]
    BatchFull {
        /// Maximum number of files per batch.
        max: usize,
    },
    /// Accepting the file would push the batch past its total size limit.
    #[error("Total file size exceeds the limit of {limit_mb} MB. Please send smaller PDFs.")]
    BatchTotalExceeded {
        /// Batch total limit in whole megabytes.
        limit_mb: u64,
    },
}

/// Reject files larger than `limit` bytes.
///
/// # Errors
///
/// Returns [`QuotaViolation::FileTooLarge`] when `size > limit`.
pub fn check_file_size(size: u64, limit: u64) -> Result<(), QuotaViolation> {
    if size > limit {
        return Err(QuotaViolation::FileTooLarge { limit_mb: limit / MB });
    }
    Ok(())
}

/// Reject additions to a batch that already holds `max` files.
///
/// # Errors
///
/// Returns [`QuotaViolation::BatchFull`] when `current >= max`.
pub fn check_batch_count(current: usize, max: usize) -> Result<(), QuotaViolation> {
    if current >= max {
        return Err(QuotaViolation::BatchFull { max });
    }
    Ok(())
}

/// Reject an incoming file that would push the batch total past
/// `max_total` bytes.
///
/// # Errors
///
/// Returns [`QuotaViolation::BatchTotalExceeded`] when the new total
/// would exceed the limit.
pub fn check_batch_total(
    current_total: u64,
    incoming: u64,
    max_total: u64,
) -> Result<(), QuotaViolation> {
    if current_total.saturating_add(incoming) > max_total {
        return Err(QuotaViolation::BatchTotalExceeded {
            limit_mb: max_total / MB,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_at_limit_is_accepted() {
        assert_eq!(check_file_size(5 * MB, 5 * MB), Ok(()));
        assert_eq!(
            check_file_size(5 * MB + 1, 5 * MB),
            Err(QuotaViolation::FileTooLarge { limit_mb: 5 })
        );
    }

    #[test]
    fn sixth_file_is_rejected() {
        assert_eq!(check_batch_count(4, 5), Ok(()));
        assert_eq!(check_batch_count(5, 5), Err(QuotaViolation::BatchFull { max: 5 }));
    }

    #[test]
    fn batch_total_is_checked_incrementally() {
        assert_eq!(check_batch_total(10 * MB, 5 * MB, 15 * MB), Ok(()));
        assert_eq!(
            check_batch_total(10 * MB, 5 * MB + 1, 15 * MB),
            Err(QuotaViolation::BatchTotalExceeded { limit_mb: 15 })
        );
    }

    #[test]
    fn batch_total_does_not_overflow() {
        assert!(check_batch_total(u64::MAX, u64::MAX, 15 * MB).is_err());
    }
}
