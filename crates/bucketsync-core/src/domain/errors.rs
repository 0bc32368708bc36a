//! Domain error types
//!
//! This module defines error types for domain-level validation failures:
//! invalid sync roots, malformed object keys, and malformed digests.

use thiserror::Error;

/// Errors that can occur when constructing domain values
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Sync root is not an absolute, normalizable directory path
    #[error("Invalid sync root: {0}")]
    InvalidSyncRoot(String),

    /// Object key violates the key convention (relative, forward slashes,
    /// no leading slash, no traversal)
    #[error("Invalid object key: {0}")]
    InvalidKey(String),

    /// Digest string is not a valid lowercase hex digest of the expected width
    #[error("Invalid content digest: {0}")]
    InvalidDigest(String),

    /// Path is not within the configured sync root
    #[error("Path not within sync root: {0}")]
    PathNotInSyncRoot(String),
}
