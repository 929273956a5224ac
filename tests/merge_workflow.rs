//! End-to-end merge workflow behaviour against stub collaborators.

mod common;

use common::{files, harness, has_text, pdf_doc, texts};
use paperbot::config::{Limits, MB};
use paperbot::engine::{Command, Event, WorkflowSnapshot};
use paperbot::session::{MergeState, PendingFile, Workflow};

const CHAT: i64 = 100;

#[tokio::test]
async fn merge_happy_path_produces_one_document() {
    let h = harness(
        vec![("a", b"aaaa".to_vec()), ("b", b"bbbb".to_vec())],
        Limits::default(),
    );

    let replies = h.engine.handle(CHAT, Event::Command(Command::MergePdf)).await;
    assert!(has_text(&replies, "Send 'done' when finished."));

    let replies = h.engine.handle(CHAT, Event::Document(pdf_doc("a", 4))).await;
    assert!(has_text(&replies, "1 PDFs received so far."));
    let replies = h.engine.handle(CHAT, Event::Document(pdf_doc("b", 4))).await;
    assert!(has_text(&replies, "2 PDFs received so far."));

    let replies = h.engine.handle(CHAT, Event::Text("done".into())).await;
    assert!(has_text(&replies, "Merging in progress..."));
    assert_eq!(files(&replies), vec![("merged.pdf", b"aaaabbbb".as_slice())]);
    assert!(has_text(&replies, "Merging completed. 2 PDFs merged."));
    assert_eq!(h.engine.snapshot(CHAT).await, WorkflowSnapshot::Idle);
}

#[tokio::test]
async fn oversized_file_is_rejected_without_joining_the_batch() {
    let limits = Limits {
        merge_file_bytes: 1024,
        ..Limits::default()
    };
    let h = harness(vec![], limits);

    h.engine.handle(CHAT, Event::Command(Command::MergePdf)).await;
    let replies = h
        .engine
        .handle(CHAT, Event::Document(pdf_doc("big", 2048)))
        .await;
    assert!(has_text(&replies, "File size exceeds the limit of"));
    assert_eq!(
        h.engine.snapshot(CHAT).await,
        WorkflowSnapshot::Merging {
            files: 0,
            total_bytes: 0
        }
    );
}

#[tokio::test]
async fn batch_stops_accepting_at_the_file_count_limit() {
    let limits = Limits {
        merge_batch_count: 2,
        ..Limits::default()
    };
    let h = harness(vec![], limits);

    h.engine.handle(CHAT, Event::Command(Command::MergePdf)).await;
    h.engine.handle(CHAT, Event::Document(pdf_doc("a", 10))).await;
    h.engine.handle(CHAT, Event::Document(pdf_doc("b", 10))).await;
    let replies = h.engine.handle(CHAT, Event::Document(pdf_doc("c", 10))).await;
    assert!(has_text(&replies, "Maximum file limit of 2 reached."));
    assert_eq!(
        h.engine.snapshot(CHAT).await,
        WorkflowSnapshot::Merging {
            files: 2,
            total_bytes: 20
        }
    );
}

#[tokio::test]
async fn batch_total_limit_rejects_the_offending_file_only() {
    let limits = Limits {
        merge_batch_bytes: 100,
        ..Limits::default()
    };
    let h = harness(vec![], limits);

    h.engine.handle(CHAT, Event::Command(Command::MergePdf)).await;
    h.engine.handle(CHAT, Event::Document(pdf_doc("a", 80))).await;
    let replies = h.engine.handle(CHAT, Event::Document(pdf_doc("b", 30))).await;
    assert!(has_text(&replies, "Total file size exceeds the limit of"));
    assert_eq!(
        h.engine.snapshot(CHAT).await,
        WorkflowSnapshot::Merging {
            files: 1,
            total_bytes: 80
        }
    );
}

#[tokio::test]
async fn done_over_the_total_limit_rejects_the_merge_but_keeps_the_batch() {
    // A batch can sit over the total limit if the limit changed while
    // it was open; seed that state directly.
    let limits = Limits {
        merge_batch_bytes: MB,
        ..Limits::default()
    };
    let h = harness(vec![], limits);
    let pending = vec![
        PendingFile {
            file_ref: "a".into(),
            size: 800_000,
        },
        PendingFile {
            file_ref: "b".into(),
            size: 800_000,
        },
    ];
    h.engine
        .set_workflow(CHAT, Workflow::Merging(MergeState { pending }))
        .await;

    let replies = h.engine.handle(CHAT, Event::Text("done".into())).await;
    assert!(has_text(&replies, "Total file size exceeds the limit of 1 MB."));
    assert!(files(&replies).is_empty());
    assert_eq!(
        h.engine.snapshot(CHAT).await,
        WorkflowSnapshot::Merging {
            files: 2,
            total_bytes: 1_600_000
        }
    );
}

#[tokio::test]
async fn done_with_no_files_ends_the_session() {
    let h = harness(vec![], Limits::default());

    h.engine.handle(CHAT, Event::Command(Command::MergePdf)).await;
    let replies = h.engine.handle(CHAT, Event::Text("done".into())).await;
    assert_eq!(texts(&replies), vec!["No PDFs received. Send the PDFs first."]);
    assert_eq!(h.engine.snapshot(CHAT).await, WorkflowSnapshot::Idle);
}

#[tokio::test]
async fn codec_failure_tears_the_session_down_with_one_message() {
    let h = harness(vec![("a", b"aaaa".to_vec())], Limits::default());

    h.engine.handle(CHAT, Event::Command(Command::MergePdf)).await;
    h.engine.handle(CHAT, Event::Document(pdf_doc("a", 4))).await;
    h.adapter.fail_everything();

    let replies = h.engine.handle(CHAT, Event::Text("done".into())).await;
    assert_eq!(texts(&replies), vec!["Failed to merge the PDFs."]);
    assert!(files(&replies).is_empty());
    assert_eq!(h.engine.snapshot(CHAT).await, WorkflowSnapshot::Idle);
}

#[tokio::test]
async fn failed_download_of_a_batch_member_is_terminal() {
    // "missing" was accepted by declared size but is not fetchable.
    let h = harness(vec![], Limits::default());

    h.engine.handle(CHAT, Event::Command(Command::MergePdf)).await;
    h.engine
        .handle(CHAT, Event::Document(pdf_doc("missing", 4)))
        .await;
    let replies = h.engine.handle(CHAT, Event::Text("done".into())).await;
    assert_eq!(
        texts(&replies),
        vec!["Failed to download one of the PDFs."]
    );
    assert_eq!(h.engine.snapshot(CHAT).await, WorkflowSnapshot::Idle);
}

#[tokio::test]
async fn done_is_case_insensitive() {
    let h = harness(vec![("a", b"aaaa".to_vec())], Limits::default());

    h.engine.handle(CHAT, Event::Command(Command::MergePdf)).await;
    h.engine.handle(CHAT, Event::Document(pdf_doc("a", 4))).await;
    let replies = h.engine.handle(CHAT, Event::Text("DONE".into())).await;
    assert!(has_text(&replies, "Merging completed. 1 PDFs merged."));
}
