//! Image-to-PDF workflow: collect images, ask for a name, build.
//!
//! Every accepted image is persisted into the session's scratch
//! directory immediately; the whole directory drops with the session,
//! so cancellation and failure leave nothing behind.

use super::{DocumentMeta, Engine, PhotoMeta, Reply};
use crate::config::has_image_extension;
use crate::session::{ChatKey, ChatSession, ImageToPdfStage, ImageToPdfState, Workflow};
use crate::tempfs::ScopedDir;
use tracing::info;

/// Name used when the user skips choosing one.
const DEFAULT_PDF_NAME: &str = "images.pdf";

impl Engine {
    /// `/image2pdf`: start collecting images, discarding any prior
    /// session for the chat.
    pub(super) fn image2pdf_begin(&self, chat: ChatKey, session: &mut ChatSession) -> Vec<Reply> {
        let dir = match ScopedDir::create_under(&self.work_root) {
            Ok(dir) => dir,
            Err(e) => return Self::fail(session, "Failed to start the image session.", &e),
        };
        info!(chat, "image-to-pdf session opened");
        session.begin(Workflow::ImageToPdf(ImageToPdfState {
            dir,
            images: Vec::new(),
            stage: ImageToPdfStage::Collecting,
        }));
        vec![Reply::Text(
            "Send the images you want to convert to PDF.\nWhen you're done, type 'go'.".into(),
        )]
    }

    /// A Telegram photo offered while collecting.
    pub(super) async fn image2pdf_accept_photo(
        &self,
        session: &mut ChatSession,
        meta: PhotoMeta,
    ) -> Vec<Reply> {
        let bytes = match self.fetch(&meta.file_ref).await {
            Ok(bytes) => bytes,
            Err(e) => return Self::fail(session, "Failed to download the photo.", &e),
        };
        let Workflow::ImageToPdf(state) = &mut session.workflow else {
            return Vec::new();
        };
        let name = format!("{:03}.jpg", state.images.len());
        match state.dir.write_file(&name, &bytes) {
            Ok(path) => {
                state.images.push(path);
                let count = state.images.len();
                vec![Reply::Text(format!(
                    "Received photo {count}. Send more or type 'go'."
                ))]
            }
            Err(e) => Self::fail(session, "Failed to store the photo.", &e),
        }
    }

    /// A document offered while collecting; only image-typed documents
    /// with a supported extension are accepted.
    pub(super) async fn image2pdf_accept_document(
        &self,
        session: &mut ChatSession,
        meta: DocumentMeta,
    ) -> Vec<Reply> {
        let is_image_mime = meta
            .mime
            .as_deref()
            .is_some_and(|m| m.starts_with("image/"));
        if !is_image_mime {
            return vec![Reply::Text(
                "The uploaded document is not a valid image. Please send JPG, PNG, or similar."
                    .into(),
            )];
        }
        let Some(name) = meta.name.as_deref().filter(|n| has_image_extension(n)) else {
            return vec![Reply::Text(
                "Unsupported image format. Please upload JPG, PNG, or similar.".into(),
            )];
        };
        let ext = name
            .rsplit('.')
            .next()
            .unwrap_or("jpg")
            .to_ascii_lowercase();

        let bytes = match self.fetch(&meta.file_ref).await {
            Ok(bytes) => bytes,
            Err(e) => return Self::fail(session, "Failed to download the image.", &e),
        };
        let Workflow::ImageToPdf(state) = &mut session.workflow else {
            return Vec::new();
        };
        let file_name = format!("{:03}.{ext}", state.images.len());
        match state.dir.write_file(&file_name, &bytes) {
            Ok(path) => {
                state.images.push(path);
                let count = state.images.len();
                vec![Reply::Text(format!(
                    "Received image document {count}. Send more or type 'go'."
                ))]
            }
            Err(e) => Self::fail(session, "Failed to store the image.", &e),
        }
    }

    /// `go`: move on to asking for a name, provided at least one image
    /// was collected.
    pub(super) fn image2pdf_request_name(&self, session: &mut ChatSession) -> Vec<Reply> {
        let Workflow::ImageToPdf(state) = &mut session.workflow else {
            return Vec::new();
        };
        if state.images.is_empty() {
            return vec![Reply::Text("You haven't sent any images yet.".into())];
        }
        state.stage = ImageToPdfStage::AwaitingName;
        vec![Reply::Text(
            "Please send a name for your PDF file. If you want to skip, click /skip.".into(),
        )]
    }

    /// `/skip` while a name is awaited.
    pub(super) async fn image2pdf_skip(&self, session: &mut ChatSession) -> Vec<Reply> {
        let awaiting = matches!(
            &session.workflow,
            Workflow::ImageToPdf(state) if state.stage == ImageToPdfStage::AwaitingName
        );
        if awaiting {
            self.image2pdf_build(session, None).await
        } else {
            Vec::new()
        }
    }

    /// Build and emit the PDF. `name` is the user's choice, or `None`
    /// to use the default.
    pub(super) async fn image2pdf_build(
        &self,
        session: &mut ChatSession,
        name: Option<&str>,
    ) -> Vec<Reply> {
        let Workflow::ImageToPdf(state) = &session.workflow else {
            return Vec::new();
        };
        let images = state.images.clone();

        let filename = match name.map(str::trim) {
            None | Some("/skip") | Some("") => DEFAULT_PDF_NAME.to_string(),
            Some(chosen) => format!("{chosen}.pdf"),
        };

        let assembled = self
            .run_codec(move |adapter| adapter.assemble_images(&images))
            .await;
        match assembled {
            Ok((bytes, pages)) => {
                info!(pages, "image-to-pdf build completed");
                session.end();
                vec![
                    Reply::File { filename, bytes },
                    Reply::Text(format!(
                        "Your PDF has been created and sent! It contains {pages} pages."
                    )),
                ]
            }
            Err(e) => Self::fail(session, "Failed to build the PDF from your images.", &e),
        }
    }
}
