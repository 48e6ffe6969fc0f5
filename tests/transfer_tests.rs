mod support;

use s3_deploy::transfer::{Transfer, transfer};
use s3_deploy::{Bucket, DeployError, FileEntry, ObjectStore, SourceOp, UploadOutcome};
use std::path::PathBuf;
use support::{Event, MemoryStore, fixture, spec};
use tokio_util::sync::CancellationToken;

#[tokio::test]
async fn dry_run_does_not_open_the_local_file() {
    let mut spec = spec("unused".to_string());
    spec.dry_run = true;
    let entry = FileEntry::new(PathBuf::from("does/not/exist.css"), "assets", "does/");

    let store = MemoryStore::new();
    let bucket = store.bucket("test-bucket");
    let result = transfer(&bucket, &entry, &spec, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(result.outcome, UploadOutcome::Planned);
    assert_eq!(result.entry.target, "assets/not/exist.css");
    assert_eq!(result.entry.content_type, "text/css; charset=utf-8");
    assert!(store.events().is_empty());
}

#[tokio::test]
async fn missing_source_fails_before_any_remote_call() {
    let spec = spec("unused".to_string());
    let entry = FileEntry::new(PathBuf::from("does/not/exist.css"), "", "");

    let store = MemoryStore::new();
    let bucket = store.bucket("test-bucket");
    let err = transfer(&bucket, &entry, &spec, &CancellationToken::new())
        .await
        .unwrap_err();

    match err {
        DeployError::Io { path, op, .. } => {
            assert_eq!(path, PathBuf::from("does/not/exist.css"));
            assert_eq!(op, SourceOp::Open);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(store.events().is_empty());
}

#[tokio::test]
async fn phases_can_be_driven_step_by_step() {
    let dir = fixture(&[("a.txt", "hello")]);
    let spec = spec("unused".to_string());
    let entry = FileEntry::new(dir.path().join("a.txt"), "docs", &format!("{}/", dir.path().display()));

    let store = MemoryStore::new();
    let bucket = store.bucket("test-bucket");
    let committed = Transfer::new(bucket.object(&entry.target), &entry, &spec)
        .write_body(&CancellationToken::new())
        .await
        .unwrap();

    // body is visible before any metadata is applied
    assert_eq!(store.object("docs/a.txt").unwrap().body, b"hello");
    assert_eq!(store.object("docs/a.txt").unwrap().attributes, None);

    let result = committed.apply_metadata().await.unwrap();
    assert_eq!(
        result.outcome,
        UploadOutcome::Uploaded {
            bytes_read: 5,
            bytes_written: 5
        }
    );
    assert_eq!(
        store.events(),
        vec![
            Event::OpenWriter("docs/a.txt".into()),
            Event::Commit("docs/a.txt".into()),
            Event::UpdateAttributes("docs/a.txt".into()),
        ]
    );
}

#[cfg(unix)]
#[tokio::test]
async fn read_failure_after_open_is_reported_as_read() {
    // a directory opens fine on unix but fails on the first read
    let dir = fixture(&[("sub/a.txt", "a")]);
    let entry = FileEntry::new(dir.path().join("sub"), "", "");
    let spec = spec("unused".to_string());

    let store = MemoryStore::new();
    let bucket = store.bucket("test-bucket");
    let err = transfer(&bucket, &entry, &spec, &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, DeployError::Io { op: SourceOp::Read, .. }));
    assert!(err.to_string().starts_with("Could not read source file"));
    assert!(store.keys().is_empty());
}
