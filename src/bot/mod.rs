/// Message and callback handlers
pub mod handlers;
/// Telegram-backed file transport
pub mod transport;
