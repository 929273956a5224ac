//! Resize workflow: one replied-to photo, two mutually exclusive
//! options.
//!
//! The target-size path runs the quality search; the dimensions path
//! fits the image into the requested bounding box. Either way, the
//! first answer finishes the session: an unparseable answer reports
//! the error and tears the session down rather than re-prompting,
//! which is the behaviour users of the original bot know.

use super::{Engine, PhotoMeta, Reply};
use crate::imaging;
use crate::session::{ChatSession, ResizeStage, ResizeState, Workflow};
use tracing::info;

/// Callback data for the target-file-size button.
pub const CHOICE_FILE_SIZE: &str = "resize_file_size";
/// Callback data for the target-dimensions button.
pub const CHOICE_DIMENSIONS: &str = "resize_dimensions";

impl Engine {
    /// `/resizeimage` as a reply to a photo: decode it and offer the
    /// two options.
    pub(super) async fn resize_begin(
        &self,
        session: &mut ChatSession,
        replied: Option<PhotoMeta>,
    ) -> Vec<Reply> {
        let Some(photo) = replied else {
            return vec![Reply::Text(
                "Please reply to an image with the /resizeimage command.".into(),
            )];
        };

        let bytes = match self.fetch(&photo.file_ref).await {
            Ok(bytes) => bytes,
            Err(e) => return Self::fail(session, "Failed to download the image.", &e),
        };
        let image = match imaging::decode(&bytes) {
            Ok(image) => image,
            Err(e) => return Self::fail(session, "That image could not be read.", &e),
        };

        let details = format!(
            "Image Details:\n\n\
             File Size: {:.2} MB ({:.2} KB)\n\
             Image Width: {}px\n\
             Image Height: {}px\n",
            bytes.len() as f64 / (1024.0 * 1024.0),
            bytes.len() as f64 / 1024.0,
            image.width(),
            image.height(),
        );

        session.begin(Workflow::Resizing(ResizeState {
            image,
            stage: ResizeStage::AwaitingChoice,
        }));

        vec![Reply::Keyboard {
            text: format!("{details}\nPlease choose the modification option:"),
            buttons: vec![
                ("Modify File Size".into(), CHOICE_FILE_SIZE.into()),
                ("Modify File Dimensions".into(), CHOICE_DIMENSIONS.into()),
            ],
        }]
    }

    /// A button press while the choice is pending.
    pub(super) fn resize_choice(&self, state: &mut ResizeState, data: &str) -> Vec<Reply> {
        match data {
            CHOICE_FILE_SIZE => {
                state.stage = ResizeStage::AwaitingSize;
                vec![Reply::Text(
                    "Please enter the desired file size in kilobytes (KB):".into(),
                )]
            }
            CHOICE_DIMENSIONS => {
                state.stage = ResizeStage::AwaitingDimensions;
                vec![Reply::Text(
                    "Please enter the desired width and height in pixels (separated by a space):"
                        .into(),
                )]
            }
            _ => Vec::new(),
        }
    }

    /// Text answer on the target-size path.
    pub(super) async fn resize_by_size(&self, session: &mut ChatSession, text: &str) -> Vec<Reply> {
        let Workflow::Resizing(state) = &session.workflow else {
            return Vec::new();
        };

        let Ok(target_kb) = text.parse::<f64>() else {
            return Self::fail(
                session,
                "Invalid file size. Please enter a valid size in kilobytes (KB).",
                &format!("unparseable size input: {text:?}"),
            );
        };

        let image = state.image.clone();
        let searched = tokio::task::spawn_blocking(move || {
            imaging::shrink_to_target(&image, target_kb)
        })
        .await;
        let result = match searched {
            Ok(result) => result,
            Err(e) => return Self::fail(session, "Failed to resize the image.", &e),
        };
        match result {
            Ok(encoded) => {
                info!(
                    quality = encoded.quality,
                    bytes = encoded.bytes.len(),
                    "resize by target size completed"
                );
                session.end();
                let details = resized_details(encoded.bytes.len(), encoded.width, encoded.height);
                vec![Reply::Photo {
                    bytes: encoded.bytes,
                }, Reply::Text(details)]
            }
            Err(e @ imaging::ImagingError::InvalidTarget(_)) => Self::fail(
                session,
                "Invalid file size. Please enter a valid size in kilobytes (KB).",
                &e,
            ),
            Err(e) => Self::fail(session, "Failed to resize the image.", &e),
        }
    }

    /// Text answer on the dimensions path.
    pub(super) async fn resize_by_dimensions(
        &self,
        session: &mut ChatSession,
        text: &str,
    ) -> Vec<Reply> {
        let Workflow::Resizing(state) = &session.workflow else {
            return Vec::new();
        };

        let Some((width, height)) = parse_dimensions(text) else {
            return Self::fail(
                session,
                "Invalid dimensions. Please enter valid width and height values.",
                &format!("unparseable dimensions input: {text:?}"),
            );
        };

        let image = state.image.clone();
        let resized = tokio::task::spawn_blocking(move || {
            let fitted = imaging::fit_within(&image, width, height);
            imaging::encode_jpeg(&fitted, 90).map(|bytes| (bytes, fitted.width(), fitted.height()))
        })
        .await;
        let result = match resized {
            Ok(result) => result,
            Err(e) => return Self::fail(session, "Failed to resize the image.", &e),
        };
        match result {
            Ok((bytes, out_width, out_height)) => {
                info!(out_width, out_height, "resize by dimensions completed");
                session.end();
                let details = resized_details(bytes.len(), out_width, out_height);
                vec![Reply::Photo { bytes }, Reply::Text(details)]
            }
            Err(e) => Self::fail(session, "Failed to resize the image.", &e),
        }
    }
}

/// Parse "width height" as two positive integers.
fn parse_dimensions(text: &str) -> Option<(u32, u32)> {
    let mut parts = text.split_whitespace();
    let width: u32 = parts.next()?.parse().ok()?;
    let height: u32 = parts.next()?.parse().ok()?;
    if parts.next().is_some() || width == 0 || height == 0 {
        return None;
    }
    Some((width, height))
}

fn resized_details(size_bytes: usize, width: u32, height: u32) -> String {
    format!(
        "Resized Image Details:\n\n\
         File Size: {:.2} KB\n\
         Image Width: {width}px\n\
         Image Height: {height}px\n",
        size_bytes as f64 / 1024.0,
    )
}

#[cfg(test)]
mod tests {
    use super::parse_dimensions;

    #[test]
    fn dimensions_require_two_positive_integers() {
        assert_eq!(parse_dimensions("100 50"), Some((100, 50)));
        assert_eq!(parse_dimensions("  640   480 "), Some((640, 480)));
        assert_eq!(parse_dimensions("100"), None);
        assert_eq!(parse_dimensions("100 0"), None);
        assert_eq!(parse_dimensions("100 50 25"), None);
        assert_eq!(parse_dimensions("wide tall"), None);
    }
}
