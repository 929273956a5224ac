//! Resize workflow behaviour. The imaging path is real; only the
//! transport is stubbed.

mod common;

use common::{harness, has_text, photo, texts};
use image::{DynamicImage, RgbImage};
use paperbot::config::Limits;
use paperbot::engine::{Command, Event, Reply, WorkflowSnapshot, CHOICE_DIMENSIONS, CHOICE_FILE_SIZE};
use paperbot::session::ResizeStage;
use std::io::Cursor;

const CHAT: i64 = 300;

fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8])
    }));
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, image::ImageFormat::Png)
        .expect("encode png");
    buf.into_inner()
}

#[tokio::test]
async fn command_without_a_reply_asks_for_one() {
    let h = harness(vec![], Limits::default());
    let replies = h
        .engine
        .handle(
            CHAT,
            Event::Command(Command::ResizeImage { replied: None }),
        )
        .await;
    assert_eq!(
        texts(&replies),
        vec!["Please reply to an image with the /resizeimage command."]
    );
    assert_eq!(h.engine.snapshot(CHAT).await, WorkflowSnapshot::Idle);
}

#[tokio::test]
async fn target_size_path_returns_a_photo() {
    let bytes = png_bytes(64, 64);
    let size = bytes.len() as u64;
    let h = harness(vec![("pic", bytes)], Limits::default());

    let replies = h
        .engine
        .handle(
            CHAT,
            Event::Command(Command::ResizeImage {
                replied: Some(photo("pic", size)),
            }),
        )
        .await;
    match &replies[..] {
        [Reply::Keyboard { text, buttons }] => {
            assert!(text.contains("Image Width: 64px"));
            assert_eq!(buttons.len(), 2);
            assert_eq!(buttons[0].1, CHOICE_FILE_SIZE);
            assert_eq!(buttons[1].1, CHOICE_DIMENSIONS);
        }
        other => panic!("expected a keyboard, got {other:?}"),
    }

    let replies = h
        .engine
        .handle(CHAT, Event::Button(CHOICE_FILE_SIZE.into()))
        .await;
    assert!(has_text(&replies, "desired file size in kilobytes"));
    assert_eq!(
        h.engine.snapshot(CHAT).await,
        WorkflowSnapshot::Resizing {
            stage: ResizeStage::AwaitingSize
        }
    );

    // Generous target, satisfiable at the starting quality.
    let replies = h.engine.handle(CHAT, Event::Text("5000".into())).await;
    assert!(replies.iter().any(|r| matches!(r, Reply::Photo { .. })));
    assert!(has_text(&replies, "Resized Image Details:"));
    assert_eq!(h.engine.snapshot(CHAT).await, WorkflowSnapshot::Idle);
}

#[tokio::test]
async fn dimensions_path_fits_the_bounding_box() {
    let bytes = png_bytes(64, 64);
    let size = bytes.len() as u64;
    let h = harness(vec![("pic", bytes)], Limits::default());

    h.engine
        .handle(
            CHAT,
            Event::Command(Command::ResizeImage {
                replied: Some(photo("pic", size)),
            }),
        )
        .await;
    h.engine
        .handle(CHAT, Event::Button(CHOICE_DIMENSIONS.into()))
        .await;

    let replies = h.engine.handle(CHAT, Event::Text("32 16".into())).await;
    assert!(replies.iter().any(|r| matches!(r, Reply::Photo { .. })));
    // 64x64 into a 32x16 box keeps the aspect ratio: 16x16.
    assert!(has_text(&replies, "Image Width: 16px"));
    assert!(has_text(&replies, "Image Height: 16px"));
    assert_eq!(h.engine.snapshot(CHAT).await, WorkflowSnapshot::Idle);
}

#[tokio::test]
async fn invalid_size_input_ends_the_session_with_one_message() {
    let bytes = png_bytes(32, 32);
    let size = bytes.len() as u64;
    let h = harness(vec![("pic", bytes)], Limits::default());

    h.engine
        .handle(
            CHAT,
            Event::Command(Command::ResizeImage {
                replied: Some(photo("pic", size)),
            }),
        )
        .await;
    h.engine
        .handle(CHAT, Event::Button(CHOICE_FILE_SIZE.into()))
        .await;

    let replies = h.engine.handle(CHAT, Event::Text("tiny".into())).await;
    assert_eq!(
        texts(&replies),
        vec!["Invalid file size. Please enter a valid size in kilobytes (KB)."]
    );
    assert_eq!(h.engine.snapshot(CHAT).await, WorkflowSnapshot::Idle);
}

#[tokio::test]
async fn invalid_dimensions_input_ends_the_session_with_one_message() {
    let bytes = png_bytes(32, 32);
    let size = bytes.len() as u64;
    let h = harness(vec![("pic", bytes)], Limits::default());

    h.engine
        .handle(
            CHAT,
            Event::Command(Command::ResizeImage {
                replied: Some(photo("pic", size)),
            }),
        )
        .await;
    h.engine
        .handle(CHAT, Event::Button(CHOICE_DIMENSIONS.into()))
        .await;

    let replies = h.engine.handle(CHAT, Event::Text("640".into())).await;
    assert_eq!(
        texts(&replies),
        vec!["Invalid dimensions. Please enter valid width and height values."]
    );
    assert_eq!(h.engine.snapshot(CHAT).await, WorkflowSnapshot::Idle);
}

#[tokio::test]
async fn unknown_button_data_is_ignored() {
    let bytes = png_bytes(32, 32);
    let size = bytes.len() as u64;
    let h = harness(vec![("pic", bytes)], Limits::default());

    h.engine
        .handle(
            CHAT,
            Event::Command(Command::ResizeImage {
                replied: Some(photo("pic", size)),
            }),
        )
        .await;
    let replies = h.engine.handle(CHAT, Event::Button("bogus".into())).await;
    assert!(replies.is_empty());
    assert_eq!(
        h.engine.snapshot(CHAT).await,
        WorkflowSnapshot::Resizing {
            stage: ResizeStage::AwaitingChoice
        }
    );
}
