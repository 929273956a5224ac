//! Telegram message handlers: translate updates into engine events and
//! send the resulting replies back to the chat.

use crate::engine::{Command, DocumentMeta, Engine, Event, PhotoMeta, Reply};
use anyhow::Result;
use std::sync::Arc;
use teloxide::prelude::*;
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup, InputFile, ParseMode};
use teloxide::utils::command::BotCommands;
use tracing::debug;

/// The bot's command surface, as shown in the Telegram command menu.
#[derive(BotCommands, Clone, Copy, Debug)]
#[command(rename_rule = "lowercase")]
pub enum BotCmd {
    /// Show what this bot can do.
    Help,
    /// Merge multiple PDF files into one.
    MergePdf,
    /// Split a PDF into individual pages (reply to a PDF).
    SplitPdf,
    /// Convert images into a single PDF.
    Image2Pdf,
    /// Resize an image (reply to an image).
    ResizeImage,
    /// Convert PDF pages to images (reply to a PDF).
    Pdf2Image,
    /// Extract a zip, rar, or 7z archive.
    Unarchive,
    /// Use the default name for the generated PDF.
    Skip,
}

fn document_meta(doc: &teloxide::types::Document) -> DocumentMeta {
    DocumentMeta {
        file_ref: doc.file.id.0.clone(),
        name: doc.file_name.clone(),
        size: u64::from(doc.file.size),
        mime: doc.mime_type.as_ref().map(ToString::to_string),
    }
}

fn photo_meta(photo: &teloxide::types::PhotoSize) -> PhotoMeta {
    PhotoMeta {
        file_ref: photo.file.id.0.clone(),
        size: u64::from(photo.file.size),
    }
}

fn replied_document(msg: &Message) -> Option<DocumentMeta> {
    msg.reply_to_message()
        .and_then(Message::document)
        .map(document_meta)
}

fn replied_photo(msg: &Message) -> Option<PhotoMeta> {
    msg.reply_to_message()
        .and_then(|replied| replied.photo())
        .and_then(<[teloxide::types::PhotoSize]>::last)
        .map(photo_meta)
}

fn to_engine_command(cmd: BotCmd, msg: &Message) -> Command {
    match cmd {
        BotCmd::Help => Command::Help,
        BotCmd::MergePdf => Command::MergePdf,
        BotCmd::SplitPdf => Command::SplitPdf {
            replied: replied_document(msg),
        },
        BotCmd::Image2Pdf => Command::Image2Pdf,
        BotCmd::ResizeImage => Command::ResizeImage {
            replied: replied_photo(msg),
        },
        BotCmd::Pdf2Image => Command::Pdf2Image {
            replied: replied_document(msg),
        },
        BotCmd::Unarchive => Command::Unarchive,
        BotCmd::Skip => Command::Skip,
    }
}

/// Dispatch a recognised command to the engine.
///
/// # Errors
///
/// Returns an error when sending a reply to Telegram fails.
pub async fn handle_command(
    bot: Bot,
    msg: Message,
    cmd: BotCmd,
    engine: Arc<Engine>,
) -> Result<()> {
    let command = to_engine_command(cmd, &msg);
    let replies = engine.handle(msg.chat.id.0, Event::Command(command)).await;
    send_replies(&bot, msg.chat.id, replies).await
}

/// Dispatch a document upload to the engine.
///
/// # Errors
///
/// Returns an error when sending a reply to Telegram fails.
pub async fn handle_document(bot: Bot, msg: Message, engine: Arc<Engine>) -> Result<()> {
    let Some(doc) = msg.document() else {
        return Ok(());
    };
    let replies = engine
        .handle(msg.chat.id.0, Event::Document(document_meta(doc)))
        .await;
    send_replies(&bot, msg.chat.id, replies).await
}

/// Dispatch a photo upload to the engine. Telegram sends several
/// resolutions of the same photo; the largest one is used.
///
/// # Errors
///
/// Returns an error when sending a reply to Telegram fails.
pub async fn handle_photo(bot: Bot, msg: Message, engine: Arc<Engine>) -> Result<()> {
    let Some(photo) = msg.photo().and_then(<[teloxide::types::PhotoSize]>::last) else {
        return Ok(());
    };
    let replies = engine
        .handle(msg.chat.id.0, Event::Photo(photo_meta(photo)))
        .await;
    send_replies(&bot, msg.chat.id, replies).await
}

/// Dispatch free text to the engine.
///
/// # Errors
///
/// Returns an error when sending a reply to Telegram fails.
pub async fn handle_text(bot: Bot, msg: Message, engine: Arc<Engine>) -> Result<()> {
    let Some(text) = msg.text() else {
        return Ok(());
    };
    let replies = engine
        .handle(msg.chat.id.0, Event::Text(text.to_string()))
        .await;
    send_replies(&bot, msg.chat.id, replies).await
}

/// Dispatch an inline-keyboard press to the engine.
///
/// # Errors
///
/// Returns an error when answering the callback or sending a reply
/// fails.
pub async fn handle_callback(bot: Bot, q: CallbackQuery, engine: Arc<Engine>) -> Result<()> {
    // Stop the client-side spinner whatever happens next.
    bot.answer_callback_query(q.id.clone()).await?;
    let (Some(data), Some(message)) = (q.data, q.message) else {
        return Ok(());
    };
    let chat = message.chat().id;
    let replies = engine.handle(chat.0, Event::Button(data)).await;
    send_replies(&bot, chat, replies).await
}

async fn send_replies(bot: &Bot, chat: ChatId, replies: Vec<Reply>) -> Result<()> {
    debug!(chat = chat.0, count = replies.len(), "sending replies");
    for reply in replies {
        match reply {
            Reply::Text(text) => {
                bot.send_message(chat, text).await?;
            }
            Reply::Html(text) => {
                bot.send_message(chat, text)
                    .parse_mode(ParseMode::Html)
                    .await?;
            }
            Reply::File { filename, bytes } => {
                bot.send_document(chat, InputFile::memory(bytes).file_name(filename))
                    .await?;
            }
            Reply::Photo { bytes } => {
                bot.send_photo(chat, InputFile::memory(bytes)).await?;
            }
            Reply::Keyboard { text, buttons } => {
                let rows = buttons
                    .into_iter()
                    .map(|(label, data)| vec![InlineKeyboardButton::callback(label, data)]);
                bot.send_message(chat, text)
                    .reply_markup(InlineKeyboardMarkup::new(rows))
                    .await?;
            }
        }
    }
    Ok(())
}
