//! Archive extraction for zip, rar, and 7z uploads.
//!
//! Extraction always targets a caller-provided scratch directory, and
//! malformed archives come back as [`ArchiveError::Corrupt`] rather
//! than a panic or an untyped failure, so the workflow layer can
//! report them and discard the artifact in one place.

use std::fmt;
use std::fs::File;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

/// Supported archive container formats, selected by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveKind {
    /// `.zip`
    Zip,
    /// `.rar`
    Rar,
    /// `.7z`
    SevenZ,
}

impl ArchiveKind {
    /// Detect the archive kind from a file name, if any.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        let lower = name.to_ascii_lowercase();
        if lower.ends_with(".zip") {
            Some(Self::Zip)
        } else if lower.ends_with(".rar") {
            Some(Self::Rar)
        } else if lower.ends_with(".7z") {
            Some(Self::SevenZ)
        } else {
            None
        }
    }
}

impl fmt::Display for ArchiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Zip => write!(f, "ZIP"),
            Self::Rar => write!(f, "RAR"),
            Self::SevenZ => write!(f, "7z"),
        }
    }
}

/// Errors produced while extracting archives.
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// The archive is malformed and cannot be read.
    #[error("The provided {kind} file is corrupted.")]
    Corrupt {
        /// Container format of the offending archive.
        kind: ArchiveKind,
        /// Decoder detail, for logs only.
        detail: String,
    },
    /// Filesystem trouble while writing extracted entries.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Extract `input` into `dest`.
///
/// # Errors
///
/// Returns [`ArchiveError::Corrupt`] for malformed archives and
/// [`ArchiveError::Io`] for filesystem failures.
pub fn extract(input: &Path, kind: ArchiveKind, dest: &Path) -> Result<(), ArchiveError> {
    std::fs::create_dir_all(dest)?;
    match kind {
        ArchiveKind::Zip => extract_zip(input, dest),
        ArchiveKind::Rar => extract_rar(input, dest),
        ArchiveKind::SevenZ => extract_7z(input, dest),
    }?;
    debug!(?kind, dest = %dest.display(), "archive extracted");
    Ok(())
}

fn corrupt(kind: ArchiveKind, detail: impl fmt::Display) -> ArchiveError {
    ArchiveError::Corrupt {
        kind,
        detail: detail.to_string(),
    }
}

fn extract_zip(input: &Path, dest: &Path) -> Result<(), ArchiveError> {
    let file = File::open(input)?;
    let mut archive =
        zip::ZipArchive::new(file).map_err(|e| corrupt(ArchiveKind::Zip, e))?;
    archive
        .extract(dest)
        .map_err(|e| match e {
            zip::result::ZipError::Io(io) => ArchiveError::Io(io),
            other => corrupt(ArchiveKind::Zip, other),
        })
}

fn extract_rar(input: &Path, dest: &Path) -> Result<(), ArchiveError> {
    let mut archive = unrar::Archive::new(input)
        .open_for_processing()
        .map_err(|e| corrupt(ArchiveKind::Rar, e))?;
    while let Some(header) = archive
        .read_header()
        .map_err(|e| corrupt(ArchiveKind::Rar, e))?
    {
        archive = if header.entry().is_file() {
            header
                .extract_with_base(dest)
                .map_err(|e| corrupt(ArchiveKind::Rar, e))?
        } else {
            header.skip().map_err(|e| corrupt(ArchiveKind::Rar, e))?
        };
    }
    Ok(())
}

fn extract_7z(input: &Path, dest: &Path) -> Result<(), ArchiveError> {
    sevenz_rust::decompress_file(input, dest).map_err(|e| corrupt(ArchiveKind::SevenZ, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_zip(path: &Path, entries: &[(&str, &[u8])]) {
        let file = File::create(path).expect("create zip");
        let mut writer = zip::ZipWriter::new(file);
        let options = zip::write::SimpleFileOptions::default();
        for (name, bytes) in entries {
            writer.start_file(*name, options).expect("start entry");
            writer.write_all(bytes).expect("write entry");
        }
        writer.finish().expect("finish zip");
    }

    #[test]
    fn kind_is_detected_from_extension() {
        assert_eq!(ArchiveKind::from_name("stuff.ZIP"), Some(ArchiveKind::Zip));
        assert_eq!(ArchiveKind::from_name("stuff.rar"), Some(ArchiveKind::Rar));
        assert_eq!(ArchiveKind::from_name("stuff.7z"), Some(ArchiveKind::SevenZ));
        assert_eq!(ArchiveKind::from_name("stuff.tar.gz"), None);
    }

    #[test]
    fn zip_roundtrip_extracts_entries() {
        let dir = tempfile::tempdir().expect("dir");
        let archive = dir.path().join("bundle.zip");
        write_zip(&archive, &[("a.txt", b"alpha"), ("sub/b.txt", b"beta")]);

        let dest = dir.path().join("out");
        extract(&archive, ArchiveKind::Zip, &dest).expect("extract");
        assert_eq!(std::fs::read(dest.join("a.txt")).expect("a"), b"alpha");
        assert_eq!(std::fs::read(dest.join("sub/b.txt")).expect("b"), b"beta");
    }

    #[test]
    fn corrupt_zip_is_a_typed_error() {
        let dir = tempfile::tempdir().expect("dir");
        let archive = dir.path().join("broken.zip");
        std::fs::write(&archive, b"definitely not a zip").expect("write");

        let dest = dir.path().join("out");
        let err = extract(&archive, ArchiveKind::Zip, &dest).expect_err("must fail");
        assert!(matches!(
            err,
            ArchiveError::Corrupt {
                kind: ArchiveKind::Zip,
                ..
            }
        ));
    }
}
