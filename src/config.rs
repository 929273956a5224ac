//! Configuration and settings management
//!
//! Loads settings from environment variables and holds the fixed
//! resource limits the workflows enforce.

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

/// One megabyte, in bytes.
pub const MB: u64 = 1024 * 1024;

/// File extensions accepted as images by the image-to-PDF workflow.
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "gif", "tiff"];

/// Application settings loaded from environment variables
#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    /// Telegram Bot API token
    pub telegram_token: String,

    /// Root directory for scratch files. Defaults to the system temp dir.
    pub work_dir: Option<String>,
}

impl Settings {
    /// Create new settings by loading from environment and files
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if loading fails or `TELEGRAM_TOKEN` is
    /// missing.
    pub fn new() -> Result<Self, ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(File::with_name("config/local").required(false))
            .add_source(Environment::with_prefix("APP").separator("__"))
            // Environment::default() auto-converts UPPER_SNAKE_CASE to
            // snake_case; ignore_empty treats empty env vars as unset.
            .add_source(Environment::default().ignore_empty(true))
            .build()?;

        s.try_deserialize()
    }

    /// Resolved scratch root.
    #[must_use]
    pub fn work_root(&self) -> std::path::PathBuf {
        self.work_dir
            .as_ref()
            .map_or_else(std::env::temp_dir, std::path::PathBuf::from)
    }
}

/// Size and count limits enforced before accepting user input.
///
/// Defaults match production; tests shrink them to drive rejections
/// with small payloads.
#[derive(Debug, Clone, Copy)]
pub struct Limits {
    /// Largest single PDF accepted into a merge batch, bytes.
    pub merge_file_bytes: u64,
    /// Largest running total of a merge batch, bytes.
    pub merge_batch_bytes: u64,
    /// Most files accepted into a merge batch.
    pub merge_batch_count: usize,
    /// Largest PDF accepted for splitting or rendering, bytes.
    pub split_file_bytes: u64,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            merge_file_bytes: 5 * MB,
            merge_batch_bytes: 15 * MB,
            merge_batch_count: 5,
            split_file_bytes: 20 * MB,
        }
    }
}

/// True when `name` carries one of the supported image extensions.
#[must_use]
pub fn has_image_extension(name: &str) -> bool {
    name.rsplit('.')
        .next()
        .is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
}
