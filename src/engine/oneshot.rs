//! Single-shot operations: split, PDF-to-image, unarchive.
//!
//! These have no multi-step conversation; everything happens inside
//! one event while the chat's lock is held, which also keeps a second
//! request from the same chat from overlapping the first. All scratch
//! space lives in a `ScopedDir` and vanishes on every exit path.

use super::{AdapterError, DocumentMeta, Engine, Reply};
use crate::archive::ArchiveKind;
use crate::quota;
use crate::render::RENDER_ZOOM;
use crate::session::ChatSession;
use crate::tempfs::ScopedDir;
use std::path::Path;
use tracing::info;

impl Engine {
    /// `/splitpdf` as a reply to a PDF document.
    pub(super) async fn split_pdf(
        &self,
        session: &mut ChatSession,
        replied: Option<DocumentMeta>,
    ) -> Vec<Reply> {
        let Some(doc) = replied else {
            return vec![Reply::Text(
                "Please reply to a PDF file with the /splitpdf command.".into(),
            )];
        };
        if !doc
            .name
            .as_deref()
            .is_some_and(|n| n.to_ascii_lowercase().ends_with(".pdf"))
        {
            return vec![Reply::Text(
                "Invalid file format. Please send a PDF file.".into(),
            )];
        }
        if quota::check_file_size(doc.size, self.limits.split_file_bytes).is_err() {
            return vec![Reply::Text(
                "Sorry, the maximum file size allowed is 20 MB.".into(),
            )];
        }

        let scratch = match ScopedDir::create_under(&self.work_root) {
            Ok(dir) => dir,
            Err(e) => return Self::fail(session, "Failed to split the PDF.", &e),
        };
        let input = match self.download_to(&scratch, "input.pdf", &doc).await {
            Ok(path) => path,
            Err(reply) => return reply,
        };

        let mut replies = vec![Reply::Text(
            "PDF file received. Splitting process started...".into(),
        )];

        let out_dir = scratch.path().to_path_buf();
        let split = self
            .run_codec(move |adapter| adapter.split(&input, &out_dir))
            .await;
        match split {
            Ok(pages) => {
                for (index, page) in pages.iter().enumerate() {
                    match std::fs::read(page) {
                        Ok(bytes) => replies.push(Reply::File {
                            filename: format!("page_{}.pdf", index + 1),
                            bytes,
                        }),
                        Err(e) => return Self::fail(session, "Failed to split the PDF.", &e),
                    }
                }
                info!(pages = pages.len(), "split completed");
                replies.push(Reply::Text("Splitting process completed.".into()));
                replies
            }
            Err(AdapterError::Corrupt(detail)) => {
                Self::fail(session, "That PDF could not be read.", &detail)
            }
            Err(e) => Self::fail(session, "Failed to split the PDF.", &e),
        }
    }

    /// `/pdf2image` as a reply to a PDF document.
    pub(super) async fn pdf_to_images(
        &self,
        session: &mut ChatSession,
        replied: Option<DocumentMeta>,
    ) -> Vec<Reply> {
        let Some(doc) = replied else {
            return vec![Reply::Text(
                "Please reply to an already uploaded PDF file with this command.".into(),
            )];
        };
        if !doc
            .name
            .as_deref()
            .is_some_and(|n| n.to_ascii_lowercase().ends_with(".pdf"))
        {
            return vec![Reply::Text(
                "The file you replied to is not a PDF. Please reply to a valid PDF file.".into(),
            )];
        }
        if quota::check_file_size(doc.size, self.limits.split_file_bytes).is_err() {
            return vec![Reply::Text(
                "Sorry, the maximum file size allowed is 20 MB.".into(),
            )];
        }

        let scratch = match ScopedDir::create_under(&self.work_root) {
            Ok(dir) => dir,
            Err(e) => return Self::fail(session, "Failed to convert the PDF.", &e),
        };
        let input = match self.download_to(&scratch, "input.pdf", &doc).await {
            Ok(path) => path,
            Err(reply) => return reply,
        };

        let mut replies = vec![Reply::Text(
            "Converting PDF to images. Please wait...".into(),
        )];

        let rendered = self
            .run_codec(move |adapter| adapter.render_pages(&input, RENDER_ZOOM))
            .await;
        match rendered {
            Ok(pages) => {
                let count = pages.len();
                for (index, bytes) in pages.into_iter().enumerate() {
                    replies.push(Reply::File {
                        filename: format!("page_{}.png", index + 1),
                        bytes,
                    });
                }
                info!(pages = count, "pdf-to-image completed");
                replies.push(Reply::Text(format!(
                    "Conversion completed! {count} pages sent as documents."
                )));
                replies
            }
            Err(AdapterError::Corrupt(detail)) => {
                Self::fail(session, "That PDF could not be read.", &detail)
            }
            Err(e) => Self::fail(session, "Failed to convert the PDF to images.", &e),
        }
    }

    /// An uploaded archive document, regardless of session state.
    pub(super) async fn unarchive_run(&self, meta: &DocumentMeta, kind: ArchiveKind) -> Vec<Reply> {
        let mut replies = vec![Reply::Text("File received. Extracting...".into())];

        let scratch = match ScopedDir::create_under(&self.work_root) {
            Ok(dir) => dir,
            Err(e) => {
                tracing::warn!("unarchive scratch dir failed: {e}");
                return vec![Reply::Text("Failed to extract the archive.".into())];
            }
        };
        let bytes = match self.fetch(&meta.file_ref).await {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!("archive download failed: {e}");
                return vec![Reply::Text("Failed to download the archive.".into())];
            }
        };
        let archive_path = match scratch.write_file("upload.archive", &bytes) {
            Ok(path) => path,
            Err(e) => {
                tracing::warn!("archive write failed: {e}");
                return vec![Reply::Text("Failed to extract the archive.".into())];
            }
        };

        let dest = scratch.path().join("extracted");
        let extract_dest = dest.clone();
        let extracted = self
            .run_codec(move |adapter| adapter.extract_archive(&archive_path, kind, &extract_dest))
            .await;
        // The uploaded artifact and any partial extraction vanish with
        // `scratch` no matter which way this went.
        match extracted {
            Ok(()) => {
                match collect_files(&dest) {
                    Ok(files) => {
                        for (name, bytes) in files {
                            replies.push(Reply::File {
                                filename: name,
                                bytes,
                            });
                        }
                    }
                    Err(e) => {
                        tracing::warn!("reading extracted files failed: {e}");
                        return vec![Reply::Text("Failed to extract the archive.".into())];
                    }
                }
                info!(%kind, "extraction completed");
                replies.push(Reply::Text("Extraction complete.".into()));
                replies
            }
            Err(AdapterError::Corrupt(detail)) => {
                tracing::warn!("corrupt archive: {detail}");
                vec![Reply::Text(detail)]
            }
            Err(e) => {
                tracing::warn!("extraction failed: {e}");
                vec![Reply::Text("Failed to extract the archive.".into())]
            }
        }
    }

    async fn download_to(
        &self,
        scratch: &ScopedDir,
        name: &str,
        doc: &DocumentMeta,
    ) -> Result<std::path::PathBuf, Vec<Reply>> {
        let bytes = self
            .fetch(&doc.file_ref)
            .await
            .map_err(|e| {
                tracing::warn!("download failed: {e}");
                vec![Reply::Text("Failed to download the file.".into())]
            })?;
        scratch.write_file(name, &bytes).map_err(|e| {
            tracing::warn!("scratch write failed: {e}");
            vec![Reply::Text("Failed to process the file.".into())]
        })
    }
}

/// Walk `dest` and return every regular file as (relative name,
/// bytes), in sorted path order. Files at the extraction root are
/// included alongside those in subdirectories.
fn collect_files(dest: &Path) -> std::io::Result<Vec<(String, Vec<u8>)>> {
    let mut paths = Vec::new();
    let mut stack = vec![dest.to_path_buf()];
    while let Some(dir) = stack.pop() {
        for entry in std::fs::read_dir(&dir)? {
            let entry = entry?;
            let path = entry.path();
            if entry.file_type()?.is_dir() {
                stack.push(path);
            } else {
                paths.push(path);
            }
        }
    }
    paths.sort();

    let mut files = Vec::with_capacity(paths.len());
    for path in paths {
        let name = path
            .strip_prefix(dest)
            .unwrap_or(&path)
            .to_string_lossy()
            .into_owned();
        files.push((name, std::fs::read(&path)?));
    }
    Ok(files)
}
