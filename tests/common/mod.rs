//! Shared harness for driving the engine with in-memory collaborators.
#![allow(dead_code)] // not every test binary uses every helper

use paperbot::config::Limits;
use paperbot::engine::{DocumentMeta, Engine, PhotoMeta, Reply};
use paperbot::session::FileRef;
use paperbot::testing::{MapFetcher, StubAdapter};
use std::sync::Arc;

pub struct Harness {
    pub engine: Engine,
    pub adapter: Arc<StubAdapter>,
    _work: tempfile::TempDir,
}

/// Build an engine over stub collaborators serving the given files.
pub fn harness(files: Vec<(&str, Vec<u8>)>, limits: Limits) -> Harness {
    let adapter = Arc::new(StubAdapter::default());
    let fetcher = Arc::new(MapFetcher::new(
        files
            .into_iter()
            .map(|(file_ref, bytes)| (FileRef::from(file_ref), bytes)),
    ));
    let work = tempfile::tempdir().expect("work dir");
    let engine = Engine::new(
        adapter.clone(),
        fetcher,
        limits,
        work.path().to_path_buf(),
    );
    Harness {
        engine,
        adapter,
        _work: work,
    }
}

/// A PDF document message with a declared size.
pub fn pdf_doc(file_ref: &str, size: u64) -> DocumentMeta {
    DocumentMeta {
        file_ref: file_ref.to_string(),
        name: Some(format!("{file_ref}.pdf")),
        size,
        mime: Some("application/pdf".to_string()),
    }
}

/// A document message with an arbitrary name and MIME type.
pub fn named_doc(file_ref: &str, name: &str, size: u64, mime: &str) -> DocumentMeta {
    DocumentMeta {
        file_ref: file_ref.to_string(),
        name: Some(name.to_string()),
        size,
        mime: Some(mime.to_string()),
    }
}

/// A photo message.
pub fn photo(file_ref: &str, size: u64) -> PhotoMeta {
    PhotoMeta {
        file_ref: file_ref.to_string(),
        size,
    }
}

/// The plain-text replies, in order.
pub fn texts(replies: &[Reply]) -> Vec<&str> {
    replies
        .iter()
        .filter_map(|r| match r {
            Reply::Text(t) => Some(t.as_str()),
            _ => None,
        })
        .collect()
}

/// The file replies as (filename, bytes), in order.
pub fn files(replies: &[Reply]) -> Vec<(&str, &[u8])> {
    replies
        .iter()
        .filter_map(|r| match r {
            Reply::File { filename, bytes } => Some((filename.as_str(), bytes.as_slice())),
            _ => None,
        })
        .collect()
}

/// True when some text reply contains `needle`.
pub fn has_text(replies: &[Reply], needle: &str) -> bool {
    texts(replies).iter().any(|t| t.contains(needle))
}
