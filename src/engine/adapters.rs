//! Collaborator seams the engine drives: file transport and format
//! codecs.
//!
//! The engine only ever sees these two traits, so the workflow tests
//! run against in-memory stubs and the codecs stay swappable.

use crate::archive::{self, ArchiveError, ArchiveKind};
use crate::pdf::{self, PdfError};
use crate::render::{self, RenderError};
use crate::session::FileRef;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Failure fetching bytes from the chat transport.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The download failed; transient or permanent, the session only
    /// learns it failed.
    #[error("file download failed: {0}")]
    Download(String),
}

/// Failure inside a format codec.
#[derive(Debug, Error)]
pub enum AdapterError {
    /// The input itself is malformed (bad PDF, bad image, bad archive).
    #[error("{0}")]
    Corrupt(String),
    /// Anything else: IO, encoder trouble, library failure.
    #[error("{0}")]
    Failed(String),
}

impl From<PdfError> for AdapterError {
    fn from(e: PdfError) -> Self {
        match e {
            PdfError::Load { .. } | PdfError::NoPages | PdfError::Image(_) => {
                Self::Corrupt(e.to_string())
            }
            other => Self::Failed(other.to_string()),
        }
    }
}

impl From<ArchiveError> for AdapterError {
    fn from(e: ArchiveError) -> Self {
        match e {
            ArchiveError::Corrupt { .. } => Self::Corrupt(e.to_string()),
            ArchiveError::Io(io) => Self::Failed(io.to_string()),
        }
    }
}

impl From<RenderError> for AdapterError {
    fn from(e: RenderError) -> Self {
        match e {
            RenderError::Corrupt(_) => Self::Corrupt(e.to_string()),
            other => Self::Failed(other.to_string()),
        }
    }
}

/// Retrieves file bytes for an opaque transport handle.
#[async_trait]
pub trait FileFetcher: Send + Sync {
    /// Download the file the transport referenced.
    async fn fetch(&self, file_ref: &FileRef) -> Result<Vec<u8>, TransportError>;
}

/// The format codecs, as fallible blocking functions. The engine runs
/// them on the blocking pool.
pub trait FormatAdapter: Send + Sync {
    /// Merge the ordered inputs into `output`; returns the page count.
    ///
    /// # Errors
    ///
    /// Returns an [`AdapterError`] on malformed input or write failure.
    fn merge(&self, inputs: &[PathBuf], output: &Path) -> Result<usize, AdapterError>;

    /// Split `input` into one file per page inside `out_dir`, in page
    /// order.
    ///
    /// # Errors
    ///
    /// Returns an [`AdapterError`] on malformed input or write failure.
    fn split(&self, input: &Path, out_dir: &Path) -> Result<Vec<PathBuf>, AdapterError>;

    /// Build a PDF from the ordered images; returns the bytes and page
    /// count.
    ///
    /// # Errors
    ///
    /// Returns an [`AdapterError`] on undecodable images or
    /// serialisation failure.
    fn assemble_images(&self, images: &[PathBuf]) -> Result<(Vec<u8>, usize), AdapterError>;

    /// Render every page of `input` to PNG bytes at the given zoom.
    ///
    /// # Errors
    ///
    /// Returns an [`AdapterError`] on malformed input or render
    /// failure.
    fn render_pages(&self, input: &Path, zoom: f32) -> Result<Vec<Vec<u8>>, AdapterError>;

    /// Extract the archive at `input` into `dest`.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::Corrupt`] for malformed archives.
    fn extract_archive(
        &self,
        input: &Path,
        kind: ArchiveKind,
        dest: &Path,
    ) -> Result<(), AdapterError>;
}

/// Production adapter backed by lopdf, pdfium, and the archive crates.
#[derive(Debug, Default)]
pub struct NativeAdapter;

impl FormatAdapter for NativeAdapter {
    fn merge(&self, inputs: &[PathBuf], output: &Path) -> Result<usize, AdapterError> {
        Ok(pdf::merge_documents(inputs, output)?)
    }

    fn split(&self, input: &Path, out_dir: &Path) -> Result<Vec<PathBuf>, AdapterError> {
        Ok(pdf::split_document(input, out_dir)?)
    }

    fn assemble_images(&self, images: &[PathBuf]) -> Result<(Vec<u8>, usize), AdapterError> {
        Ok(pdf::assemble_images(images)?)
    }

    fn render_pages(&self, input: &Path, zoom: f32) -> Result<Vec<Vec<u8>>, AdapterError> {
        Ok(render::render_pages(input, zoom)?)
    }

    fn extract_archive(
        &self,
        input: &Path,
        kind: ArchiveKind,
        dest: &Path,
    ) -> Result<(), AdapterError> {
        Ok(archive::extract(input, kind, dest)?)
    }
}
