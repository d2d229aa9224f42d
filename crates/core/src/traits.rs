//! Traits connecting storage, transactions, and extensions
//!
//! `StoreReader` is the read seam: snapshots implement it, and it is what
//! extensions receive both at registration time (to repopulate from existing
//! data) and on every commit (to look up current records while applying a
//! change set).
//!
//! `Extension` is the unit of registration: views, filtered views, secondary
//! indexes, full-text search, and search-results views all implement it.

use crate::changeset::ChangeSet;
use crate::error::Result;
use crate::key::ItemKey;
use crate::record::VersionedRecord;

/// Read access to stored records at a consistent point in time
pub trait StoreReader: Send + Sync {
    /// Get the record stored under a key, if any
    fn get(&self, key: &ItemKey) -> Option<VersionedRecord>;

    /// All records in a collection, sorted by key
    fn scan_collection(&self, collection: &str) -> Vec<(ItemKey, VersionedRecord)>;

    /// Names of all non-empty collections, sorted
    fn collections(&self) -> Vec<String>;

    /// Total number of live records
    fn len(&self) -> usize;

    /// Whether the store holds no live records
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A named extension maintaining derived state from committed changes
///
/// Extensions are registered with a database under a unique name. On
/// registration the engine calls `repopulate` with a snapshot of existing
/// data; afterwards `apply` runs synchronously for every commit, in commit
/// order, while the writer lock is held. Extensions therefore never observe
/// two commits out of order and never race a repopulate.
pub trait Extension: Send + Sync {
    /// Name the extension is registered under
    fn name(&self) -> &str;

    /// Rebuild derived state from a full scan of existing data
    ///
    /// Called once at registration, and again if the engine needs to rebuild
    /// the extension from scratch.
    fn repopulate(&self, reader: &dyn StoreReader) -> Result<()>;

    /// Fold one committed change set into the derived state
    fn apply(&self, changes: &ChangeSet, reader: &dyn StoreReader) -> Result<()>;
}
