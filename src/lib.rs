//! Paperbot - a Telegram bot for everyday document chores.
//!
//! Merges and splits PDFs, converts images to PDF, resizes images,
//! renders PDF pages to images, and unpacks archives. The interesting
//! part lives in [`engine`]: a per-chat workflow state machine layer
//! that tracks multi-step conversations and guarantees scratch-file
//! cleanup on every exit path.

/// Archive extraction (zip, rar, 7z)
pub mod archive;
/// Telegram glue: command parsing, update handlers, file transport
pub mod bot;
/// Configuration and size limits
pub mod config;
/// Workflow state machines and event dispatch
pub mod engine;
/// Image decoding, resizing, and the target-size quality search
pub mod imaging;
/// PDF merge, split, and image-to-PDF assembly
pub mod pdf;
/// Quota policy checks
pub mod quota;
/// PDF page rasterisation via pdfium
pub mod render;
/// Per-chat session store
pub mod session;
/// Scratch directories with guaranteed cleanup
pub mod tempfs;
/// In-memory stubs for exercising the engine without Telegram or codecs
pub mod testing;
