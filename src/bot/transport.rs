//! Telegram-backed [`FileFetcher`].

use crate::engine::{FileFetcher, TransportError};
use crate::session::FileRef;
use async_trait::async_trait;
use std::time::Duration;
use teloxide::net::Download;
use teloxide::prelude::*;
use teloxide::types::FileId;
use tokio_retry::strategy::{jitter, ExponentialBackoff};
use tokio_retry::Retry;
use tracing::warn;

const INITIAL_BACKOFF_MS: u64 = 500;
const MAX_BACKOFF_MS: u64 = 4_000;
const MAX_RETRIES: usize = 3;

/// Downloads file bytes through the Bot API, with backoff on
/// transient network failures.
#[derive(Clone)]
pub struct TelegramFetcher {
    bot: Bot,
}

impl TelegramFetcher {
    /// Wrap a bot handle.
    #[must_use]
    pub const fn new(bot: Bot) -> Self {
        Self { bot }
    }

    async fn download_once(&self, file_ref: &FileRef) -> Result<Vec<u8>, teloxide::RequestError> {
        let file = self.bot.get_file(FileId(file_ref.clone())).await?;
        let mut buf = Vec::new();
        self.bot.download_file(&file.path, &mut buf).await?;
        Ok(buf)
    }
}

#[async_trait]
impl FileFetcher for TelegramFetcher {
    async fn fetch(&self, file_ref: &FileRef) -> Result<Vec<u8>, TransportError> {
        let strategy = ExponentialBackoff::from_millis(INITIAL_BACKOFF_MS)
            .max_delay(Duration::from_millis(MAX_BACKOFF_MS))
            .map(jitter)
            .take(MAX_RETRIES);

        Retry::spawn(strategy, || self.download_once(file_ref))
            .await
            .map_err(|e| {
                warn!("file download failed after {MAX_RETRIES} attempts: {e}");
                TransportError::Download(e.to_string())
            })
    }
}
