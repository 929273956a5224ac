//! Merge workflow: collect PDFs, then combine them on `done`.
//!
//! Quotas are enforced the moment a file is offered, before anything
//! is downloaded, so a rejection never leaves a scratch file behind.
//! The batch total is checked again at `done` time; a violation there
//! rejects the merge in full and keeps the batch intact so the user
//! can retry after the limits change server-side.

use super::{DocumentMeta, Engine, Reply};
use crate::quota;
use crate::session::{ChatKey, ChatSession, MergeState, PendingFile, Workflow};
use crate::tempfs::ScopedDir;
use tracing::info;

impl Engine {
    /// `/mergepdf`: start (or restart) a merge batch for the chat.
    pub(super) fn merge_begin(&self, chat: ChatKey, session: &mut ChatSession) -> Vec<Reply> {
        info!(chat, "merge batch opened");
        session.begin(Workflow::Merging(MergeState::default()));
        vec![Reply::Text(
            "Please send the PDFs one by one. Send 'done' when finished.".into(),
        )]
    }

    /// A PDF document offered while collecting.
    pub(super) fn merge_accept(&self, session: &mut ChatSession, meta: &DocumentMeta) -> Vec<Reply> {
        let Workflow::Merging(state) = &mut session.workflow else {
            return Vec::new();
        };

        if let Err(reason) = quota::check_file_size(meta.size, self.limits.merge_file_bytes)
            .and_then(|()| {
                quota::check_batch_count(state.pending.len(), self.limits.merge_batch_count)
            })
            .and_then(|()| {
                quota::check_batch_total(
                    state.total_bytes(),
                    meta.size,
                    self.limits.merge_batch_bytes,
                )
            })
        {
            return vec![Reply::Text(reason.to_string())];
        }

        state.pending.push(PendingFile {
            file_ref: meta.file_ref.clone(),
            size: meta.size,
        });
        let count = state.pending.len();
        vec![Reply::Text(format!(
            "{count} PDFs received so far. Please send 'done' when finished."
        ))]
    }

    /// `done`: materialise the batch, merge, emit, tear down.
    pub(super) async fn merge_finish(&self, session: &mut ChatSession) -> Vec<Reply> {
        let Workflow::Merging(state) = &session.workflow else {
            return Vec::new();
        };

        if state.pending.is_empty() {
            session.end();
            return vec![Reply::Text("No PDFs received. Send the PDFs first.".into())];
        }

        // Re-checked at close so the policy holds even if limits
        // changed while the batch was open. The batch survives a
        // rejection here.
        if state.total_bytes() > self.limits.merge_batch_bytes {
            return vec![Reply::Text(
                quota::QuotaViolation::BatchTotalExceeded {
                    limit_mb: self.limits.merge_batch_bytes / crate::config::MB,
                }
                .to_string(),
            )];
        }

        let pending = state.pending.clone();
        let scratch = match ScopedDir::create_under(&self.work_root) {
            Ok(dir) => dir,
            Err(e) => return Self::fail(session, "Failed to merge the PDFs.", &e),
        };

        let mut replies = vec![Reply::Text("Merging in progress...".into())];
        let mut inputs = Vec::with_capacity(pending.len());
        for (index, file) in pending.iter().enumerate() {
            let bytes = match self.fetch(&file.file_ref).await {
                Ok(bytes) => bytes,
                Err(e) => {
                    return Self::fail(session, "Failed to download one of the PDFs.", &e);
                }
            };
            let path = match scratch.write_file(&format!("file_{index}.pdf"), &bytes) {
                Ok(path) => path,
                Err(e) => return Self::fail(session, "Failed to merge the PDFs.", &e),
            };
            inputs.push(path);
        }

        // Scratch-unique output path; the chat-facing name is fixed.
        let output = scratch.unique_file("pdf");
        let merge_inputs = inputs.clone();
        let merge_output = output.clone();
        let merged = self
            .run_codec(move |adapter| adapter.merge(&merge_inputs, &merge_output))
            .await;
        match merged {
            Ok(_pages) => {
                let count = pending.len();
                let bytes = match std::fs::read(&output) {
                    Ok(bytes) => bytes,
                    Err(e) => return Self::fail(session, "Failed to send the merged PDF.", &e),
                };
                info!(files = count, "merge completed");
                session.end();
                replies.push(Reply::File {
                    filename: "merged.pdf".into(),
                    bytes,
                });
                replies.push(Reply::Text(format!(
                    "Merging completed. {count} PDFs merged."
                )));
                // Inputs and output vanish with `scratch`.
                replies
            }
            Err(e) => Self::fail(session, "Failed to merge the PDFs.", &e),
        }
    }
}
