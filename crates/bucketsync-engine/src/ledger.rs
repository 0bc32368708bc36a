//! Remote key ledger with claim semantics
//!
//! The ledger owns the set of remote keys captured at the start of a run.
//! As the local walk visits files, each file claims its key; whatever is
//! left unclaimed at the end is exactly the set of stale remote objects to
//! delete. This replaces the remove-from-list-while-iterating pattern with
//! an explicit operation on an owned set.

use std::collections::BTreeSet;

use bucketsync_core::domain::ObjectKey;

/// The set of remote keys still pending removal.
///
/// Owned exclusively by the reconciler for the lifetime of one run; never
/// shared across concurrent runs.
#[derive(Debug, Clone, Default)]
pub struct KeyLedger {
    pending: BTreeSet<ObjectKey>,
}

impl KeyLedger {
    /// Create a ledger from the full remote listing.
    #[must_use]
    pub fn new(keys: BTreeSet<ObjectKey>) -> Self {
        Self { pending: keys }
    }

    /// Claim a key because a local file still maps to it.
    ///
    /// Returns `true` if the key was present (and is now withheld from
    /// deletion); `false` if it was never listed or already claimed.
    pub fn claim(&mut self, key: &ObjectKey) -> bool {
        self.pending.remove(key)
    }

    /// Whether a key is still pending removal.
    #[must_use]
    pub fn contains(&self, key: &ObjectKey) -> bool {
        self.pending.contains(key)
    }

    /// Number of keys still pending removal.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Whether no keys are pending removal.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Consume the ledger, yielding exactly the keys to delete.
    #[must_use]
    pub fn into_pending(self) -> BTreeSet<ObjectKey> {
        self.pending
    }
}
