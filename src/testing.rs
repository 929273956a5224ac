//! In-memory collaborator doubles for workflow tests.
//!
//! The engine only talks to files through [`FileFetcher`] and to the
//! codecs through [`FormatAdapter`], so the integration tests can run
//! whole conversations without a network or a native PDF toolchain.

use crate::archive::ArchiveKind;
use crate::engine::{AdapterError, FileFetcher, FormatAdapter, TransportError};
use crate::session::FileRef;
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

/// Byte payload that makes [`StubAdapter`] report a corrupt input.
pub const CORRUPT_MARKER: &[u8] = b"corrupt";

/// Serves file bytes from a fixed map; unknown refs fail the download.
#[derive(Debug, Default)]
pub struct MapFetcher {
    files: HashMap<FileRef, Vec<u8>>,
}

impl MapFetcher {
    /// Build a fetcher over the given (ref, bytes) pairs.
    #[must_use]
    pub fn new(files: impl IntoIterator<Item = (FileRef, Vec<u8>)>) -> Self {
        Self {
            files: files.into_iter().collect(),
        }
    }
}

#[async_trait]
impl FileFetcher for MapFetcher {
    async fn fetch(&self, file_ref: &FileRef) -> Result<Vec<u8>, TransportError> {
        self.files
            .get(file_ref)
            .cloned()
            .ok_or_else(|| TransportError::Download(format!("unknown file ref {file_ref}")))
    }
}

/// Deterministic codec stand-in.
///
/// Inputs whose bytes start with [`CORRUPT_MARKER`] come back as
/// [`AdapterError::Corrupt`]; everything else succeeds with a small
/// synthetic output. A `fail_all` switch turns every call into
/// [`AdapterError::Failed`], for teardown tests.
#[derive(Debug, Default)]
pub struct StubAdapter {
    fail_all: AtomicBool,
}

impl StubAdapter {
    /// Make every subsequent codec call fail.
    pub fn fail_everything(&self) {
        self.fail_all.store(true, Ordering::SeqCst);
    }

    fn gate(&self) -> Result<(), AdapterError> {
        if self.fail_all.load(Ordering::SeqCst) {
            return Err(AdapterError::Failed("stub failure".into()));
        }
        Ok(())
    }

    fn check_corrupt(path: &Path) -> Result<Vec<u8>, AdapterError> {
        let bytes =
            std::fs::read(path).map_err(|e| AdapterError::Failed(e.to_string()))?;
        if bytes.starts_with(CORRUPT_MARKER) {
            return Err(AdapterError::Corrupt(format!(
                "unreadable input {}",
                path.display()
            )));
        }
        Ok(bytes)
    }
}

impl FormatAdapter for StubAdapter {
    fn merge(&self, inputs: &[PathBuf], output: &Path) -> Result<usize, AdapterError> {
        self.gate()?;
        let mut merged = Vec::new();
        for input in inputs {
            merged.extend(Self::check_corrupt(input)?);
        }
        std::fs::write(output, merged).map_err(|e| AdapterError::Failed(e.to_string()))?;
        Ok(inputs.len())
    }

    fn split(&self, input: &Path, out_dir: &Path) -> Result<Vec<PathBuf>, AdapterError> {
        self.gate()?;
        let bytes = Self::check_corrupt(input)?;
        // One output page per input byte chunk of 4, at least one.
        let pages = (bytes.len() / 4).max(1);
        let mut paths = Vec::with_capacity(pages);
        for page in 1..=pages {
            let path = out_dir.join(format!("page_{page}.pdf"));
            std::fs::write(&path, format!("page {page}"))
                .map_err(|e| AdapterError::Failed(e.to_string()))?;
            paths.push(path);
        }
        Ok(paths)
    }

    fn assemble_images(&self, images: &[PathBuf]) -> Result<(Vec<u8>, usize), AdapterError> {
        self.gate()?;
        for image in images {
            Self::check_corrupt(image)?;
        }
        Ok((b"%PDF-stub".to_vec(), images.len()))
    }

    fn render_pages(&self, input: &Path, _zoom: f32) -> Result<Vec<Vec<u8>>, AdapterError> {
        self.gate()?;
        let bytes = Self::check_corrupt(input)?;
        let pages = (bytes.len() / 4).max(1);
        Ok((1..=pages).map(|p| format!("png {p}").into_bytes()).collect())
    }

    fn extract_archive(
        &self,
        input: &Path,
        kind: ArchiveKind,
        dest: &Path,
    ) -> Result<(), AdapterError> {
        self.gate()?;
        let bytes = std::fs::read(input).map_err(|e| AdapterError::Failed(e.to_string()))?;
        if bytes.starts_with(CORRUPT_MARKER) {
            return Err(AdapterError::Corrupt(format!(
                "The provided {kind} file is corrupted."
            )));
        }
        std::fs::create_dir_all(dest).map_err(|e| AdapterError::Failed(e.to_string()))?;
        std::fs::write(dest.join("extracted.txt"), bytes)
            .map_err(|e| AdapterError::Failed(e.to_string()))?;
        Ok(())
    }
}
