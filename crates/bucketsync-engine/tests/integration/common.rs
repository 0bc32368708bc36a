//! Shared test helpers for engine integration tests
//!
//! Provides an in-memory [`IObjectStore`] double that records every upload
//! and delete, plus helpers for building local directory trees.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use bucketsync_core::domain::{ObjectKey, SyncRoot};
use bucketsync_core::ports::{DeleteFailure, IObjectStore, StoreError};
use bucketsync_engine::reconciler::{Reconciler, ReconcilerOptions};
use bucketsync_engine::SyncError;

/// In-memory bucket with per-operation recording.
///
/// Failure injection: `set_fail_listing` makes listings return
/// `Unavailable`; `deny_deletion` makes a specific key fail inside
/// `delete_many` while the rest of the batch succeeds.
#[derive(Default)]
pub struct MemoryObjectStore {
    objects: Mutex<BTreeMap<ObjectKey, Vec<u8>>>,
    uploads: Mutex<Vec<ObjectKey>>,
    deletes: Mutex<Vec<ObjectKey>>,
    fail_listing: Mutex<bool>,
    denied_deletions: Mutex<BTreeSet<ObjectKey>>,
}

impl MemoryObjectStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Place an object directly into the bucket, bypassing recording.
    pub fn seed(&self, key: &str, data: &[u8]) {
        let key = ObjectKey::new(key.to_string()).unwrap();
        self.objects.lock().unwrap().insert(key, data.to_vec());
    }

    /// Remove an object directly, bypassing recording.
    pub fn remove(&self, key: &str) {
        let key = ObjectKey::new(key.to_string()).unwrap();
        self.objects.lock().unwrap().remove(&key);
    }

    pub fn keys(&self) -> BTreeSet<ObjectKey> {
        self.objects.lock().unwrap().keys().cloned().collect()
    }

    pub fn object(&self, key: &str) -> Option<Vec<u8>> {
        let key = ObjectKey::new(key.to_string()).unwrap();
        self.objects.lock().unwrap().get(&key).cloned()
    }

    pub fn recorded_uploads(&self) -> Vec<ObjectKey> {
        self.uploads.lock().unwrap().clone()
    }

    pub fn recorded_deletes(&self) -> Vec<ObjectKey> {
        self.deletes.lock().unwrap().clone()
    }

    pub fn clear_recordings(&self) {
        self.uploads.lock().unwrap().clear();
        self.deletes.lock().unwrap().clear();
    }

    pub fn set_fail_listing(&self, fail: bool) {
        *self.fail_listing.lock().unwrap() = fail;
    }

    pub fn deny_deletion(&self, key: &str) {
        let key = ObjectKey::new(key.to_string()).unwrap();
        self.denied_deletions.lock().unwrap().insert(key);
    }
}

#[async_trait]
impl IObjectStore for MemoryObjectStore {
    async fn list_all_keys(&self) -> Result<BTreeSet<ObjectKey>, StoreError> {
        if *self.fail_listing.lock().unwrap() {
            return Err(StoreError::Unavailable("listing refused".to_string()));
        }
        Ok(self.keys())
    }

    async fn upload(&self, local_path: &Path, key: &ObjectKey) -> Result<(), StoreError> {
        let data = tokio::fs::read(local_path).await?;
        self.objects.lock().unwrap().insert(key.clone(), data);
        self.uploads.lock().unwrap().push(key.clone());
        Ok(())
    }

    async fn download(&self, key: &ObjectKey, local_path: &Path) -> Result<(), StoreError> {
        let data = match self.objects.lock().unwrap().get(key) {
            Some(data) => data.clone(),
            None => return Err(StoreError::NotFound(key.clone())),
        };
        tokio::fs::write(local_path, &data).await?;
        Ok(())
    }

    async fn delete_many(&self, keys: &BTreeSet<ObjectKey>) -> Result<(), StoreError> {
        let mut failures = Vec::new();
        for key in keys {
            if self.denied_deletions.lock().unwrap().contains(key) {
                failures.push(DeleteFailure {
                    key: key.as_str().to_string(),
                    message: "deletion denied".to_string(),
                });
                continue;
            }
            self.objects.lock().unwrap().remove(key);
            self.deletes.lock().unwrap().push(key.clone());
        }
        if failures.is_empty() {
            Ok(())
        } else {
            Err(StoreError::PartialDelete(failures))
        }
    }
}

/// Write a tree of (relative path, content) files under `root`.
pub fn write_tree(root: &Path, files: &[(&str, &str)]) {
    for (relative, content) in files {
        let path = root.join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(&path, content).unwrap();
    }
}

/// Options for tests: sequential and without retry sleeps.
pub fn test_options() -> ReconcilerOptions {
    ReconcilerOptions {
        concurrency: 1,
        dry_run: false,
        retry_attempts: 0,
    }
}

/// Initialize a reconciler over `root` and the given store.
pub async fn reconciler_for(
    root: &Path,
    store: Arc<MemoryObjectStore>,
    options: ReconcilerOptions,
) -> Result<Reconciler, SyncError> {
    let sync_root = SyncRoot::new(root.to_path_buf()).unwrap();
    Reconciler::initialize(sync_root, store, options).await
}

/// Convenience: the key set as plain strings for assertions.
pub fn key_strings(keys: &BTreeSet<ObjectKey>) -> Vec<String> {
    keys.iter().map(|k| k.as_str().to_string()).collect()
}
