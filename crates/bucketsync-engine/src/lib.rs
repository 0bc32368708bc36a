//! bucketsync Engine - Directory-to-bucket reconciliation
//!
//! Provides:
//! - One-way synchronization of a local directory tree into a bucket
//! - Checksum-based change detection (content, never metadata)
//! - Deletion bookkeeping via an explicit claim ledger
//! - A read-only verification pass
//!
//! ## Modules
//!
//! - [`reconciler`] - The sync engine orchestrating walk, compare, upload,
//!   and delete phases
//! - [`ledger`] - The owned remote key set with claim semantics
//! - [`digest`] - Streaming content digest helper

pub mod digest;
pub mod ledger;
pub mod reconciler;

use std::path::PathBuf;

use thiserror::Error;

use bucketsync_core::domain::errors::DomainError;
use bucketsync_core::domain::ObjectKey;
use bucketsync_core::ports::StoreError;

/// Errors that can occur during synchronization operations
#[derive(Debug, Error)]
pub enum SyncError {
    /// The specified sync root does not exist
    #[error("Path not found: {0}")]
    PathNotFound(PathBuf),

    /// The specified sync root is not a directory
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    /// Two distinct local files map to the same object key
    #[error("Duplicate object key '{key}': {first} and {second}")]
    DuplicateKey {
        /// The contested key
        key: ObjectKey,
        /// The file that claimed the key first
        first: PathBuf,
        /// The file that collided with it
        second: PathBuf,
    },

    /// The run was cancelled before completing
    #[error("Synchronization cancelled")]
    Cancelled,

    /// An object store operation failed
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// An I/O error occurred during local file operations
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A domain-level error propagated from bucketsync-core
    #[error("Domain error: {0}")]
    Domain(#[from] DomainError),
}
