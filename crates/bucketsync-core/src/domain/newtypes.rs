//! Domain newtypes with validation
//!
//! This module provides strongly-typed wrappers for the values the sync
//! algorithm reasons about. Each newtype ensures data validity at
//! construction time, so the engine never handles a malformed key or an
//! un-normalized root path.

use std::fmt::{self, Display, Formatter};
use std::path::{Component, Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::errors::DomainError;

// ============================================================================
// SyncRoot
// ============================================================================

/// A validated absolute path to the local directory being mirrored
///
/// SyncRoot ensures the path is:
/// - Absolute (starts with /)
/// - Normalized (no . or .. components)
///
/// It is immutable for the duration of a run and is the reference point
/// for deriving every [`ObjectKey`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "PathBuf", into = "PathBuf")]
pub struct SyncRoot(PathBuf);

impl SyncRoot {
    /// Create a new SyncRoot, validating it is absolute
    ///
    /// # Errors
    /// Returns `DomainError::InvalidSyncRoot` if the path is not absolute
    /// or escapes the root via `..`
    pub fn new(path: PathBuf) -> Result<Self, DomainError> {
        if !path.is_absolute() {
            return Err(DomainError::InvalidSyncRoot(format!(
                "Path must be absolute: {}",
                path.display()
            )));
        }

        // Normalize without touching the filesystem; the directory is
        // stat-ed by the caller, not here.
        let normalized = Self::normalize_path(&path)?;
        Ok(Self(normalized))
    }

    /// Get the inner path reference
    #[must_use]
    pub fn as_path(&self) -> &Path {
        &self.0
    }

    /// Derive the object key for a file located under this root
    ///
    /// # Errors
    /// Returns `DomainError::PathNotInSyncRoot` if `path` is not within the
    /// root, or `DomainError::InvalidKey` if the relative path cannot form
    /// a valid key
    pub fn key_for(&self, path: &Path) -> Result<ObjectKey, DomainError> {
        let relative = path.strip_prefix(&self.0).map_err(|_| {
            DomainError::PathNotInSyncRoot(format!(
                "{} is not within {}",
                path.display(),
                self.0.display()
            ))
        })?;
        ObjectKey::from_relative(relative)
    }

    /// Normalize a path by resolving . and .. components
    fn normalize_path(path: &Path) -> Result<PathBuf, DomainError> {
        let mut normalized = PathBuf::new();

        for component in path.components() {
            match component {
                Component::Prefix(p) => normalized.push(p.as_os_str()),
                Component::RootDir => normalized.push("/"),
                Component::CurDir => {}
                Component::ParentDir => {
                    if !normalized.pop() {
                        return Err(DomainError::InvalidSyncRoot(
                            "Path escapes root via ..".to_string(),
                        ));
                    }
                }
                Component::Normal(c) => normalized.push(c),
            }
        }

        Ok(normalized)
    }
}

impl Display for SyncRoot {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

impl TryFrom<PathBuf> for SyncRoot {
    type Error = DomainError;

    fn try_from(path: PathBuf) -> Result<Self, Self::Error> {
        Self::new(path)
    }
}

impl From<SyncRoot> for PathBuf {
    fn from(root: SyncRoot) -> Self {
        root.0
    }
}

impl AsRef<Path> for SyncRoot {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

// ============================================================================
// ObjectKey
// ============================================================================

/// The remote name of a mirrored file
///
/// Keys follow the bucket convention: the file's path relative to the sync
/// root, forward-slash separated, no leading slash. The derivation is
/// deterministic and platform-stable, so a key computed on any machine
/// matches the one used when the object was originally uploaded.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ObjectKey(String);

impl ObjectKey {
    /// Create a new ObjectKey
    ///
    /// # Errors
    /// Returns `DomainError::InvalidKey` if the key is empty, starts or ends
    /// with a slash, contains empty or traversal components, or contains
    /// backslashes
    pub fn new(key: String) -> Result<Self, DomainError> {
        if key.is_empty() {
            return Err(DomainError::InvalidKey("key cannot be empty".to_string()));
        }

        if key.starts_with('/') {
            return Err(DomainError::InvalidKey(format!(
                "key must not start with '/': {key}"
            )));
        }

        if key.ends_with('/') {
            return Err(DomainError::InvalidKey(format!(
                "key must not end with '/': {key}"
            )));
        }

        if key.contains('\\') {
            return Err(DomainError::InvalidKey(format!(
                "key must use forward slashes: {key}"
            )));
        }

        for segment in key.split('/') {
            if segment.is_empty() {
                return Err(DomainError::InvalidKey(format!(
                    "key contains empty segment: {key}"
                )));
            }
            if segment == "." || segment == ".." {
                return Err(DomainError::InvalidKey(format!(
                    "key contains traversal segment: {key}"
                )));
            }
        }

        Ok(Self(key))
    }

    /// Derive a key from a path relative to the sync root
    ///
    /// Components are joined with forward slashes regardless of the platform
    /// separator, so the result is stable across operating systems.
    ///
    /// # Errors
    /// Returns `DomainError::InvalidKey` if the path is empty, absolute,
    /// non-UTF-8, or contains `.`/`..` components
    pub fn from_relative(path: &Path) -> Result<Self, DomainError> {
        let mut segments = Vec::new();

        for component in path.components() {
            match component {
                Component::Normal(c) => {
                    let segment = c.to_str().ok_or_else(|| {
                        DomainError::InvalidKey(format!(
                            "path is not valid UTF-8: {}",
                            path.display()
                        ))
                    })?;
                    segments.push(segment);
                }
                _ => {
                    return Err(DomainError::InvalidKey(format!(
                        "path must be plainly relative: {}",
                        path.display()
                    )));
                }
            }
        }

        Self::new(segments.join("/"))
    }

    /// Get the inner string reference
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for ObjectKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ObjectKey {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s.to_string())
    }
}

impl TryFrom<String> for ObjectKey {
    type Error = DomainError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<ObjectKey> for String {
    fn from(key: ObjectKey) -> Self {
        key.0
    }
}

// ============================================================================
// ContentDigest
// ============================================================================

/// A 128-bit content digest rendered as lowercase hex
///
/// Used only to decide whether a local file and its remote counterpart hold
/// the same bytes; it is never persisted and carries no integrity guarantee
/// beyond change detection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ContentDigest(String);

impl ContentDigest {
    /// Digest width in bytes (128 bits)
    pub const WIDTH_BYTES: usize = 16;

    /// Create a ContentDigest from its hex rendering
    ///
    /// # Errors
    /// Returns `DomainError::InvalidDigest` if the string is not exactly
    /// 32 lowercase hex characters
    pub fn new(digest: String) -> Result<Self, DomainError> {
        if digest.len() != Self::WIDTH_BYTES * 2 {
            return Err(DomainError::InvalidDigest(format!(
                "expected {} hex characters, got {}",
                Self::WIDTH_BYTES * 2,
                digest.len()
            )));
        }

        if !digest
            .chars()
            .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c))
        {
            return Err(DomainError::InvalidDigest(format!(
                "not lowercase hex: {digest}"
            )));
        }

        Ok(Self(digest))
    }

    /// Create a ContentDigest from raw digest bytes
    #[must_use]
    pub fn from_bytes(bytes: [u8; Self::WIDTH_BYTES]) -> Self {
        Self(hex::encode(bytes))
    }

    /// Get the inner string reference
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for ContentDigest {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ContentDigest {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s.to_string())
    }
}

impl TryFrom<String> for ContentDigest {
    type Error = DomainError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<ContentDigest> for String {
    fn from(digest: ContentDigest) -> Self {
        digest.0
    }
}

// ============================================================================
// Tests
// ============================================================================
