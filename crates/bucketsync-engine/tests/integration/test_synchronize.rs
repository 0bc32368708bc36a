//! Synchronization flow tests
//!
//! Covers upload/skip/delete behavior, idempotence, change detection,
//! deletion safety, dry-run, failure injection, and cancellation.

use tempfile::TempDir;

use bucketsync_core::ports::StoreError;
use bucketsync_engine::reconciler::ReconcilerOptions;
use bucketsync_engine::SyncError;

use crate::common::{key_strings, reconciler_for, test_options, write_tree, MemoryObjectStore};

#[tokio::test]
async fn test_uploads_all_files_into_empty_bucket() {
    let dir = TempDir::new().unwrap();
    write_tree(dir.path(), &[("a.txt", "hi"), ("sub/b.txt", "yo")]);
    let store = MemoryObjectStore::new();

    let mut reconciler = reconciler_for(dir.path(), store.clone(), test_options())
        .await
        .unwrap();
    let report = reconciler.synchronize().await.unwrap();

    assert_eq!(report.files_uploaded, 2);
    assert_eq!(report.files_skipped, 0);
    assert_eq!(report.objects_deleted, 0);
    assert_eq!(key_strings(&store.keys()), vec!["a.txt", "sub/b.txt"]);
    assert_eq!(store.object("a.txt").unwrap(), b"hi");
    assert_eq!(store.object("sub/b.txt").unwrap(), b"yo");
}

#[tokio::test]
async fn test_second_run_is_idempotent() {
    let dir = TempDir::new().unwrap();
    write_tree(dir.path(), &[("a.txt", "hi"), ("sub/b.txt", "yo")]);
    let store = MemoryObjectStore::new();

    let mut reconciler = reconciler_for(dir.path(), store.clone(), test_options())
        .await
        .unwrap();
    reconciler.synchronize().await.unwrap();
    store.clear_recordings();

    // Same instance reruns against a fresh listing.
    let report = reconciler.synchronize().await.unwrap();

    assert_eq!(report.files_uploaded, 0);
    assert_eq!(report.files_skipped, 2);
    assert_eq!(report.objects_deleted, 0);
    assert!(store.recorded_uploads().is_empty());
    assert!(store.recorded_deletes().is_empty());
}

#[tokio::test]
async fn test_modified_file_uploads_exactly_that_key() {
    let dir = TempDir::new().unwrap();
    write_tree(dir.path(), &[("a.txt", "hi"), ("sub/b.txt", "yo")]);
    let store = MemoryObjectStore::new();

    let mut reconciler = reconciler_for(dir.path(), store.clone(), test_options())
        .await
        .unwrap();
    reconciler.synchronize().await.unwrap();
    store.clear_recordings();

    // One changed byte must cause exactly one upload and nothing else.
    write_tree(dir.path(), &[("a.txt", "hI")]);
    let report = reconciler.synchronize().await.unwrap();

    assert_eq!(report.files_uploaded, 1);
    assert_eq!(report.files_skipped, 1);
    assert_eq!(report.objects_deleted, 0);
    let uploads = store.recorded_uploads();
    assert_eq!(uploads.len(), 1);
    assert_eq!(uploads[0].as_str(), "a.txt");
    assert!(store.recorded_deletes().is_empty());
    assert_eq!(store.object("a.txt").unwrap(), b"hI");
}

#[tokio::test]
async fn test_removed_local_file_deletes_exactly_that_object() {
    let dir = TempDir::new().unwrap();
    write_tree(dir.path(), &[("a.txt", "hi"), ("sub/b.txt", "yo")]);
    let store = MemoryObjectStore::new();

    let mut reconciler = reconciler_for(dir.path(), store.clone(), test_options())
        .await
        .unwrap();
    reconciler.synchronize().await.unwrap();
    store.clear_recordings();

    std::fs::remove_file(dir.path().join("sub/b.txt")).unwrap();
    let report = reconciler.synchronize().await.unwrap();

    assert_eq!(report.files_uploaded, 0);
    assert_eq!(report.objects_deleted, 1);
    let deletes = store.recorded_deletes();
    assert_eq!(deletes.len(), 1);
    assert_eq!(deletes[0].as_str(), "sub/b.txt");
    assert_eq!(key_strings(&store.keys()), vec!["a.txt"]);
}

#[tokio::test]
async fn test_stale_remote_objects_are_deleted() {
    let dir = TempDir::new().unwrap();
    write_tree(dir.path(), &[("kept.txt", "stay")]);
    let store = MemoryObjectStore::new();
    store.seed("kept.txt", b"stay");
    store.seed("stale/one.txt", b"old");
    store.seed("stale/two.txt", b"older");

    let mut reconciler = reconciler_for(dir.path(), store.clone(), test_options())
        .await
        .unwrap();
    let report = reconciler.synchronize().await.unwrap();

    assert_eq!(report.files_uploaded, 0);
    assert_eq!(report.files_skipped, 1);
    assert_eq!(report.objects_deleted, 2);
    assert_eq!(key_strings(&store.keys()), vec!["kept.txt"]);
}

#[tokio::test]
async fn test_unchanged_file_is_not_reuploaded() {
    let dir = TempDir::new().unwrap();
    write_tree(dir.path(), &[("a.txt", "same content")]);
    let store = MemoryObjectStore::new();
    store.seed("a.txt", b"same content");

    let mut reconciler = reconciler_for(dir.path(), store.clone(), test_options())
        .await
        .unwrap();
    let report = reconciler.synchronize().await.unwrap();

    assert_eq!(report.files_uploaded, 0);
    assert_eq!(report.files_skipped, 1);
    assert!(store.recorded_uploads().is_empty());
}

#[tokio::test]
async fn test_changed_remote_content_is_overwritten() {
    let dir = TempDir::new().unwrap();
    write_tree(dir.path(), &[("a.txt", "local truth")]);
    let store = MemoryObjectStore::new();
    store.seed("a.txt", b"remote drift");

    let mut reconciler = reconciler_for(dir.path(), store.clone(), test_options())
        .await
        .unwrap();
    let report = reconciler.synchronize().await.unwrap();

    assert_eq!(report.files_uploaded, 1);
    assert_eq!(store.object("a.txt").unwrap(), b"local truth");
}

#[tokio::test]
async fn test_dry_run_mutates_nothing() {
    let dir = TempDir::new().unwrap();
    write_tree(dir.path(), &[("new.txt", "new"), ("changed.txt", "after")]);
    let store = MemoryObjectStore::new();
    store.seed("changed.txt", b"before");
    store.seed("stale.txt", b"old");

    let options = ReconcilerOptions {
        dry_run: true,
        ..test_options()
    };
    let mut reconciler = reconciler_for(dir.path(), store.clone(), options)
        .await
        .unwrap();
    let report = reconciler.synchronize().await.unwrap();

    // The report shows what would happen...
    assert_eq!(report.files_uploaded, 2);
    assert_eq!(report.objects_deleted, 1);
    // ...but the bucket is untouched.
    assert!(store.recorded_uploads().is_empty());
    assert!(store.recorded_deletes().is_empty());
    assert_eq!(store.object("changed.txt").unwrap(), b"before");
    assert!(store.object("stale.txt").is_some());
}

#[tokio::test]
async fn test_listing_failure_fails_initialization() {
    let dir = TempDir::new().unwrap();
    write_tree(dir.path(), &[("a.txt", "hi")]);
    let store = MemoryObjectStore::new();
    store.set_fail_listing(true);

    let result = reconciler_for(dir.path(), store, test_options()).await;

    assert!(matches!(
        result,
        Err(SyncError::Store(StoreError::Unavailable(_)))
    ));
}

#[tokio::test]
async fn test_missing_sync_root_fails_initialization() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("never-created");
    let store = MemoryObjectStore::new();

    let result = reconciler_for(&missing, store, test_options()).await;

    assert!(matches!(result, Err(SyncError::PathNotFound(_))));
}

#[tokio::test]
async fn test_file_sync_root_fails_initialization() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("plain.txt");
    std::fs::write(&file, "not a directory").unwrap();
    let store = MemoryObjectStore::new();

    let result = reconciler_for(&file, store, test_options()).await;

    assert!(matches!(result, Err(SyncError::NotADirectory(_))));
}

#[tokio::test]
async fn test_partial_delete_failures_are_surfaced() {
    let dir = TempDir::new().unwrap();
    write_tree(dir.path(), &[("kept.txt", "stay")]);
    let store = MemoryObjectStore::new();
    store.seed("kept.txt", b"stay");
    store.seed("stale/ok.txt", b"old");
    store.seed("stale/stuck.txt", b"old");
    store.deny_deletion("stale/stuck.txt");

    let mut reconciler = reconciler_for(dir.path(), store.clone(), test_options())
        .await
        .unwrap();
    let result = reconciler.synchronize().await;

    match result {
        Err(SyncError::Store(StoreError::PartialDelete(failures))) => {
            assert_eq!(failures.len(), 1);
            assert_eq!(failures[0].key, "stale/stuck.txt");
        }
        other => panic!("expected PartialDelete, got {other:?}"),
    }
    // The rest of the batch still went through.
    assert!(store.object("stale/ok.txt").is_none());
    assert!(store.object("stale/stuck.txt").is_some());
}

#[tokio::test]
async fn test_cancellation_aborts_before_remote_calls() {
    let dir = TempDir::new().unwrap();
    write_tree(dir.path(), &[("a.txt", "hi")]);
    let store = MemoryObjectStore::new();

    let mut reconciler = reconciler_for(dir.path(), store.clone(), test_options())
        .await
        .unwrap();
    reconciler.cancellation_token().cancel();

    let result = reconciler.synchronize().await;

    assert!(matches!(result, Err(SyncError::Cancelled)));
    assert!(store.recorded_uploads().is_empty());
}

#[tokio::test]
async fn test_concurrent_run_matches_sequential_result() {
    let dir = TempDir::new().unwrap();
    write_tree(
        dir.path(),
        &[
            ("a.txt", "one"),
            ("b.txt", "two"),
            ("sub/c.txt", "three"),
            ("sub/deep/d.txt", "four"),
            ("sub/deep/e.txt", "five"),
        ],
    );
    let store = MemoryObjectStore::new();
    store.seed("a.txt", b"one");
    store.seed("stale.txt", b"gone soon");

    let options = ReconcilerOptions {
        concurrency: 4,
        ..test_options()
    };
    let mut reconciler = reconciler_for(dir.path(), store.clone(), options)
        .await
        .unwrap();
    let report = reconciler.synchronize().await.unwrap();

    assert_eq!(report.files_uploaded, 4);
    assert_eq!(report.files_skipped, 1);
    assert_eq!(report.objects_deleted, 1);
    assert_eq!(
        key_strings(&store.keys()),
        vec!["a.txt", "b.txt", "sub/c.txt", "sub/deep/d.txt", "sub/deep/e.txt"]
    );
}

#[tokio::test]
async fn test_empty_directory_empties_the_bucket() {
    let dir = TempDir::new().unwrap();
    let store = MemoryObjectStore::new();
    store.seed("a.txt", b"hi");
    store.seed("sub/b.txt", b"yo");

    let mut reconciler = reconciler_for(dir.path(), store.clone(), test_options())
        .await
        .unwrap();
    let report = reconciler.synchronize().await.unwrap();

    assert_eq!(report.files_uploaded, 0);
    assert_eq!(report.objects_deleted, 2);
    assert!(store.keys().is_empty());
}
