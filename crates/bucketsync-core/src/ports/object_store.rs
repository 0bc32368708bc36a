//! Object store port (driven/secondary port)
//!
//! This module defines the interface for interacting with a remote
//! key-to-content object store. The primary implementation targets
//! S3-compatible endpoints (AWS S3, MinIO, R2), but the trait is
//! provider-agnostic: the reconciliation engine depends only on this
//! contract.
//!
//! ## Design Notes
//!
//! - Methods return a typed [`StoreError`] rather than `anyhow::Error`
//!   because the engine branches on the failure kind (an absent object is
//!   handled very differently from an unreachable endpoint).
//! - Uses `#[async_trait]` for async trait methods.
//! - `upload` and `download` move whole objects through local paths; the
//!   engine stages downloads in scratch files for comparison.

use std::collections::BTreeSet;
use std::path::Path;

use thiserror::Error;

use crate::domain::newtypes::ObjectKey;

/// A single failed deletion within a bulk delete call
#[derive(Debug, Clone)]
pub struct DeleteFailure {
    /// The key whose deletion failed
    pub key: String,
    /// Provider-supplied failure message
    pub message: String,
}

/// Errors surfaced by object store operations
#[derive(Debug, Error)]
pub enum StoreError {
    /// The remote endpoint is unreachable, rejected the credentials, or
    /// returned an unexpected failure
    #[error("object store unavailable: {0}")]
    Unavailable(String),

    /// The requested object does not exist remotely
    #[error("object not found: {0}")]
    NotFound(ObjectKey),

    /// A local file could not be read or written while transferring
    #[error("I/O failure: {0}")]
    Io(#[from] std::io::Error),

    /// A bulk delete partially failed; every failed key is listed
    #[error("{} deletion(s) failed", .0.len())]
    PartialDelete(Vec<DeleteFailure>),
}

/// Port trait for remote object store operations
///
/// The store is treated as a flat key-to-content namespace within one
/// bucket. One instance is constructed per run from explicit configuration;
/// implementations hold no process-wide state.
#[async_trait::async_trait]
pub trait IObjectStore: Send + Sync {
    /// Lists every object key in the bucket
    ///
    /// # Errors
    /// `StoreError::Unavailable` if the listing call fails
    async fn list_all_keys(&self) -> Result<BTreeSet<ObjectKey>, StoreError>;

    /// Uploads a local file to `key`, overwriting any existing object
    ///
    /// # Errors
    /// `StoreError::Io` if the local file is unreadable,
    /// `StoreError::Unavailable` if the remote call fails
    async fn upload(&self, local_path: &Path, key: &ObjectKey) -> Result<(), StoreError>;

    /// Downloads the object at `key` to a local path, overwriting it
    ///
    /// # Errors
    /// `StoreError::NotFound` if the object is absent,
    /// `StoreError::Io` if the local path is unwritable,
    /// `StoreError::Unavailable` if the remote call fails
    async fn download(&self, key: &ObjectKey, local_path: &Path) -> Result<(), StoreError>;

    /// Deletes every listed key in bulk; a no-op on an empty set
    ///
    /// # Errors
    /// `StoreError::PartialDelete` listing each key whose deletion failed,
    /// `StoreError::Unavailable` if a delete call fails outright
    async fn delete_many(&self, keys: &BTreeSet<ObjectKey>) -> Result<(), StoreError>;
}
