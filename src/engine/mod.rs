//! Workflow state machines and event dispatch.
//!
//! Every inbound chat event funnels through [`Engine::handle`]: the
//! chat's session is locked, the owning workflow (if any) consumes the
//! event, and the replies to send come back as data. Errors never
//! escape the owning session; each failure turns into exactly one
//! user-visible message plus, where required, session teardown.

/// Transport and codec seams
pub mod adapters;
mod image2pdf;
mod merge;
mod oneshot;
mod resize;

pub use adapters::{AdapterError, FileFetcher, FormatAdapter, NativeAdapter, TransportError};
pub use resize::{CHOICE_DIMENSIONS, CHOICE_FILE_SIZE};

use crate::config::Limits;
use crate::session::{
    ChatKey, ChatSession, FileRef, ImageToPdfStage, ResizeStage, SessionStore, Workflow,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, warn};

/// Metadata of a document message, before any bytes are fetched.
#[derive(Debug, Clone)]
pub struct DocumentMeta {
    /// Transport handle for the file bytes.
    pub file_ref: FileRef,
    /// Original file name, when the transport provides one.
    pub name: Option<String>,
    /// Declared size in bytes.
    pub size: u64,
    /// Declared MIME type, when the transport provides one.
    pub mime: Option<String>,
}

impl DocumentMeta {
    fn is_pdf(&self) -> bool {
        self.mime.as_deref() == Some("application/pdf")
            || self
                .name
                .as_deref()
                .is_some_and(|n| n.to_ascii_lowercase().ends_with(".pdf"))
    }
}

/// Metadata of a photo message.
#[derive(Debug, Clone)]
pub struct PhotoMeta {
    /// Transport handle for the file bytes.
    pub file_ref: FileRef,
    /// Declared size in bytes.
    pub size: u64,
}

/// Entry commands and the skip sentinel, already parsed by the
/// transport layer. Reply-scoped commands carry the replied-to
/// attachment when there is one.
#[derive(Debug, Clone)]
pub enum Command {
    /// `/help`
    Help,
    /// `/mergepdf`
    MergePdf,
    /// `/splitpdf`, as a reply to a document
    SplitPdf {
        /// Document the command was a reply to, if any.
        replied: Option<DocumentMeta>,
    },
    /// `/image2pdf`
    Image2Pdf,
    /// `/resizeimage`, as a reply to a photo
    ResizeImage {
        /// Photo the command was a reply to, if any.
        replied: Option<PhotoMeta>,
    },
    /// `/pdf2image`, as a reply to a document
    Pdf2Image {
        /// Document the command was a reply to, if any.
        replied: Option<DocumentMeta>,
    },
    /// `/unarchive`
    Unarchive,
    /// `/skip`
    Skip,
}

/// One inbound chat event.
#[derive(Debug, Clone)]
pub enum Event {
    /// A recognised bot command.
    Command(Command),
    /// A document upload.
    Document(DocumentMeta),
    /// A photo upload.
    Photo(PhotoMeta),
    /// Free text.
    Text(String),
    /// An inline-keyboard button press, by callback data.
    Button(String),
}

/// One outbound action for the transport to perform, in order.
#[derive(Debug)]
pub enum Reply {
    /// Plain text message.
    Text(String),
    /// HTML-formatted message.
    Html(String),
    /// A file sent as a document.
    File {
        /// Name the receiving chat sees.
        filename: String,
        /// File contents.
        bytes: Vec<u8>,
    },
    /// An image sent as a photo.
    Photo {
        /// Image contents.
        bytes: Vec<u8>,
    },
    /// Text message carrying an inline keyboard.
    Keyboard {
        /// Message text.
        text: String,
        /// Button rows as (label, callback data).
        buttons: Vec<(String, String)>,
    },
}

/// Read-only view of a chat's workflow, for tests and diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowSnapshot {
    /// No active workflow.
    Idle,
    /// Merge batch in progress.
    Merging {
        /// Accepted file count.
        files: usize,
        /// Sum of declared sizes, bytes.
        total_bytes: u64,
    },
    /// Image-to-PDF session in progress.
    ImageToPdf {
        /// Collected image count.
        images: usize,
        /// Conversation stage.
        stage: ImageToPdfStage,
    },
    /// Resize session in progress.
    Resizing {
        /// Conversation stage.
        stage: ResizeStage,
    },
}

/// The per-chat workflow engine.
pub struct Engine {
    sessions: SessionStore,
    adapter: Arc<dyn FormatAdapter>,
    fetcher: Arc<dyn FileFetcher>,
    limits: Limits,
    work_root: PathBuf,
}

impl Engine {
    /// Build an engine over the given collaborators.
    #[must_use]
    pub fn new(
        adapter: Arc<dyn FormatAdapter>,
        fetcher: Arc<dyn FileFetcher>,
        limits: Limits,
        work_root: PathBuf,
    ) -> Self {
        Self {
            sessions: SessionStore::new(),
            adapter,
            fetcher,
            limits,
            work_root,
        }
    }

    /// Consume one event for `chat` and return the replies to send, in
    /// order. Never panics the dispatch loop; internal failures come
    /// back as user-facing replies.
    pub async fn handle(&self, chat: ChatKey, event: Event) -> Vec<Reply> {
        let mut session = self.sessions.lock(chat).await;
        match event {
            Event::Command(cmd) => self.handle_command(chat, &mut session, cmd).await,
            Event::Document(meta) => self.handle_document(&mut session, meta).await,
            Event::Photo(meta) => self.handle_photo(&mut session, meta).await,
            Event::Text(text) => self.handle_text(&mut session, &text).await,
            Event::Button(data) => self.handle_button(&mut session, &data),
        }
    }

    /// Replace a chat's workflow directly, bypassing event dispatch.
    /// Lets harnesses built on [`crate::testing`] place a session into
    /// states that no event sequence produces.
    pub async fn set_workflow(&self, chat: ChatKey, workflow: Workflow) {
        let mut session = self.sessions.lock(chat).await;
        session.begin(workflow);
    }

    /// Snapshot of the chat's current workflow.
    pub async fn snapshot(&self, chat: ChatKey) -> WorkflowSnapshot {
        let session = self.sessions.lock(chat).await;
        match &session.workflow {
            Workflow::Idle => WorkflowSnapshot::Idle,
            Workflow::Merging(state) => WorkflowSnapshot::Merging {
                files: state.pending.len(),
                total_bytes: state.total_bytes(),
            },
            Workflow::ImageToPdf(state) => WorkflowSnapshot::ImageToPdf {
                images: state.images.len(),
                stage: state.stage,
            },
            Workflow::Resizing(state) => WorkflowSnapshot::Resizing { stage: state.stage },
        }
    }

    async fn handle_command(
        &self,
        chat: ChatKey,
        session: &mut ChatSession,
        cmd: Command,
    ) -> Vec<Reply> {
        match cmd {
            Command::Help => vec![Reply::Html(help_text())],
            Command::MergePdf => self.merge_begin(chat, session),
            Command::Image2Pdf => self.image2pdf_begin(chat, session),
            Command::ResizeImage { replied } => self.resize_begin(session, replied).await,
            Command::SplitPdf { replied } => self.split_pdf(session, replied).await,
            Command::Pdf2Image { replied } => self.pdf_to_images(session, replied).await,
            Command::Unarchive => {
                vec![Reply::Text(
                    "Please upload a .zip, .rar, or .7z file to unarchive.".into(),
                )]
            }
            Command::Skip => self.image2pdf_skip(session).await,
        }
    }

    async fn handle_document(&self, session: &mut ChatSession, meta: DocumentMeta) -> Vec<Reply> {
        // Decide the route first; the workflow borrow must end before
        // a handler takes the session mutably.
        let route = match &session.workflow {
            Workflow::Merging(_) if meta.is_pdf() => DocumentRoute::MergeInput,
            Workflow::ImageToPdf(state) if state.stage == ImageToPdfStage::Collecting => {
                DocumentRoute::ImageInput
            }
            // A non-PDF document during a merge, or any document with
            // no owning workflow: archives are handled statelessly,
            // everything else is not for us.
            _ => DocumentRoute::Unowned,
        };
        match route {
            DocumentRoute::MergeInput => self.merge_accept(session, &meta),
            DocumentRoute::ImageInput => self.image2pdf_accept_document(session, meta).await,
            DocumentRoute::Unowned => {
                if let Some(kind) = meta
                    .name
                    .as_deref()
                    .and_then(crate::archive::ArchiveKind::from_name)
                {
                    self.unarchive_run(&meta, kind).await
                } else {
                    Vec::new()
                }
            }
        }
    }

    async fn handle_photo(&self, session: &mut ChatSession, meta: PhotoMeta) -> Vec<Reply> {
        let collecting = matches!(
            &session.workflow,
            Workflow::ImageToPdf(state) if state.stage == ImageToPdfStage::Collecting
        );
        if collecting {
            return self.image2pdf_accept_photo(session, meta).await;
        }
        match &session.workflow {
            // A name is pending; the photo is neither collected nor
            // an occasion to restart.
            Workflow::ImageToPdf(_) => Vec::new(),
            _ => vec![Reply::Text("Please start by typing /image2pdf.".into())],
        }
    }

    async fn handle_text(&self, session: &mut ChatSession, text: &str) -> Vec<Reply> {
        let trimmed = text.trim();
        let lowered = trimmed.to_ascii_lowercase();
        let route = match &session.workflow {
            Workflow::Merging(_) if lowered == "done" => TextRoute::MergeDone,
            Workflow::ImageToPdf(state) => match state.stage {
                ImageToPdfStage::Collecting if lowered == "go" => TextRoute::ImagesDone,
                ImageToPdfStage::AwaitingName => TextRoute::OutputName,
                ImageToPdfStage::Collecting => TextRoute::Ignore,
            },
            Workflow::Resizing(state) => match state.stage {
                ResizeStage::AwaitingSize => TextRoute::TargetSize,
                ResizeStage::AwaitingDimensions => TextRoute::TargetDimensions,
                ResizeStage::AwaitingChoice => TextRoute::Ignore,
            },
            _ if lowered == "done" || lowered == "go" => TextRoute::Hint,
            _ => TextRoute::Ignore,
        };
        match route {
            TextRoute::MergeDone => self.merge_finish(session).await,
            TextRoute::ImagesDone => self.image2pdf_request_name(session),
            TextRoute::OutputName => self.image2pdf_build(session, Some(trimmed)).await,
            TextRoute::TargetSize => self.resize_by_size(session, trimmed).await,
            TextRoute::TargetDimensions => self.resize_by_dimensions(session, trimmed).await,
            TextRoute::Hint => vec![Reply::Text(
                "Invalid command. Send '/help' for more information.".into(),
            )],
            TextRoute::Ignore => Vec::new(),
        }
    }

    fn handle_button(&self, session: &mut ChatSession, data: &str) -> Vec<Reply> {
        match &mut session.workflow {
            Workflow::Resizing(state) if state.stage == ResizeStage::AwaitingChoice => {
                self.resize_choice(state, data)
            }
            _ => Vec::new(),
        }
    }

    /// Fetch file bytes through the transport.
    async fn fetch(&self, file_ref: &FileRef) -> Result<Vec<u8>, TransportError> {
        self.fetcher.fetch(file_ref).await
    }

    /// Run a codec operation on the blocking pool.
    async fn run_codec<T, F>(&self, op: F) -> Result<T, AdapterError>
    where
        T: Send + 'static,
        F: FnOnce(&dyn FormatAdapter) -> Result<T, AdapterError> + Send + 'static,
    {
        let adapter = Arc::clone(&self.adapter);
        tokio::task::spawn_blocking(move || op(adapter.as_ref()))
            .await
            .map_err(|e| {
                error!("codec task panicked: {e}");
                AdapterError::Failed("internal processing error".into())
            })?
    }

    /// Report a terminal failure: log it, end the session, and hand
    /// the chat one plain-language message.
    fn fail(session: &mut ChatSession, user_message: &str, detail: &dyn std::fmt::Display) -> Vec<Reply> {
        warn!("workflow failed: {detail}");
        session.end();
        vec![Reply::Text(user_message.to_string())]
    }
}

enum DocumentRoute {
    MergeInput,
    ImageInput,
    Unowned,
}

enum TextRoute {
    MergeDone,
    ImagesDone,
    OutputName,
    TargetSize,
    TargetDimensions,
    Hint,
    Ignore,
}

fn help_text() -> String {
    "This bot can perform various operations with PDF files and images.\n\n\
     <b>PDF Operations:</b>\n\
     /mergepdf - Merge multiple PDF files into a single PDF.\n\n\
     /splitpdf - Split a PDF file into individual pages.\n    \
     Reply to a PDF file with the '/splitpdf' command.\n\n\
     /pdf2image - Convert PDF pages to images.\n    \
     Reply to a PDF file with the '/pdf2image' command.\n\n\
     <b>Image Operations:</b>\n\
     /resizeimage - Resize an image.\n    \
     Reply to an image with the '/resizeimage' command.\n\n\
     <b>Image to PDF:</b>\n\
     /image2pdf - Convert images to PDF.\n\n\
     <b>Archive Operations:</b>\n\
     /unarchive - Unarchive a compressed file (zip, rar, 7z).\n"
        .to_string()
}
