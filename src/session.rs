//! Per-chat session store.
//!
//! Each chat owns at most one active workflow at a time. The store
//! maps chat ids to a per-chat mutex so events for one chat apply
//! strictly in receipt order while different chats proceed in
//! parallel. "No active workflow" is a first-class [`Workflow::Idle`]
//! state, never the absence of a map key, so ending a session is a
//! plain state write and the old payload (with its scratch files)
//! drops on the spot.

use crate::tempfs::ScopedDir;
use image::DynamicImage;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};

/// Chat identity. Telegram chat ids are signed 64-bit integers; the
/// engine never interprets them beyond equality.
pub type ChatKey = i64;

/// Opaque handle used to retrieve file bytes from the transport.
pub type FileRef = String;

/// One file accepted into a batch, not yet downloaded. Order within
/// the batch is the vector position.
#[derive(Debug, Clone)]
pub struct PendingFile {
    /// Transport handle for fetching the bytes later.
    pub file_ref: FileRef,
    /// Size declared by the transport, in bytes.
    pub size: u64,
}

/// Accumulated state of a merge batch.
#[derive(Debug, Default)]
pub struct MergeState {
    /// Accepted files in receipt order.
    pub pending: Vec<PendingFile>,
}

impl MergeState {
    /// Sum of the declared sizes of all accepted files.
    #[must_use]
    pub fn total_bytes(&self) -> u64 {
        self.pending.iter().map(|f| f.size).sum()
    }
}

/// Where the image-to-PDF conversation currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageToPdfStage {
    /// Accepting images.
    Collecting,
    /// Waiting for the output file name (or `/skip`).
    AwaitingName,
}

/// Accumulated state of an image-to-PDF session.
#[derive(Debug)]
pub struct ImageToPdfState {
    /// Scratch directory holding the collected images.
    pub dir: ScopedDir,
    /// Collected image paths in receipt order.
    pub images: Vec<PathBuf>,
    /// Conversation stage.
    pub stage: ImageToPdfStage,
}

/// Where the resize conversation currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResizeStage {
    /// Waiting for the size-vs-dimensions button press.
    AwaitingChoice,
    /// Waiting for a target size in kilobytes.
    AwaitingSize,
    /// Waiting for target width and height in pixels.
    AwaitingDimensions,
}

/// Accumulated state of a resize session.
pub struct ResizeState {
    /// The decoded source image.
    pub image: DynamicImage,
    /// Conversation stage.
    pub stage: ResizeStage,
}

impl std::fmt::Debug for ResizeState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResizeState")
            .field("width", &self.image.width())
            .field("height", &self.image.height())
            .field("stage", &self.stage)
            .finish()
    }
}

/// The workflow a chat is currently in, with its variant-specific
/// payload. Exactly the payload fields of the active variant exist.
#[derive(Debug, Default)]
pub enum Workflow {
    /// No active workflow.
    #[default]
    Idle,
    /// Collecting PDFs for a merge.
    Merging(MergeState),
    /// Collecting images, then a name, for an image-to-PDF build.
    ImageToPdf(ImageToPdfState),
    /// Walking a replied-to photo through resize options.
    Resizing(ResizeState),
}

/// Mutable per-chat record.
#[derive(Debug, Default)]
pub struct ChatSession {
    /// Active workflow and payload.
    pub workflow: Workflow,
}

impl ChatSession {
    /// Replace any active workflow with a fresh one. The previous
    /// payload drops here, releasing its scratch files.
    pub fn begin(&mut self, workflow: Workflow) {
        self.workflow = workflow;
    }

    /// Terminate the active workflow, releasing its resources.
    pub fn end(&mut self) {
        self.workflow = Workflow::Idle;
    }
}

/// Keyed store of chat sessions.
///
/// Lock discipline: `lock` hands out an owned guard on the chat's
/// entry; holders are serialised per chat, so no two events for the
/// same chat ever interleave, while distinct chats run concurrently.
#[derive(Default)]
pub struct SessionStore {
    inner: RwLock<HashMap<ChatKey, Arc<Mutex<ChatSession>>>>,
}

impl SessionStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Lock the session for `chat`, creating an idle entry if the chat
    /// has never been seen.
    pub async fn lock(&self, chat: ChatKey) -> OwnedMutexGuard<ChatSession> {
        let slot = {
            let read = self.inner.read().await;
            read.get(&chat).cloned()
        };
        let slot = match slot {
            Some(slot) => slot,
            None => {
                let mut write = self.inner.write().await;
                write
                    .entry(chat)
                    .or_insert_with(|| Arc::new(Mutex::new(ChatSession::default())))
                    .clone()
            }
        };
        slot.lock_owned().await
    }
}
