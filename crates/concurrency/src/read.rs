//! Read transactions
//!
//! A read transaction is a thin wrapper over a store snapshot: O(1) to
//! begin, never blocks writers, and every read inside it observes the same
//! commit version.

use tessera_core::{ItemKey, StoreReader, Value, VersionedRecord};
use tessera_storage::StoreSnapshot;

/// A consistent read-only view of the database
pub struct ReadTransaction {
    snapshot: StoreSnapshot,
}

impl ReadTransaction {
    /// Begin a read transaction over a snapshot
    pub fn new(snapshot: StoreSnapshot) -> Self {
        ReadTransaction { snapshot }
    }

    /// The commit version this transaction reads at
    pub fn version(&self) -> u64 {
        self.snapshot.version()
    }

    /// Get the record stored under a key
    pub fn get(&self, key: &ItemKey) -> Option<VersionedRecord> {
        self.snapshot.get(key)
    }

    /// Get just the value stored under a key
    pub fn get_value(&self, key: &ItemKey) -> Option<Value> {
        self.snapshot.get(key).map(|vr| vr.record.value)
    }

    /// Get just the metadata stored under a key
    pub fn get_metadata(&self, key: &ItemKey) -> Option<Value> {
        self.snapshot.get(key).and_then(|vr| vr.record.metadata)
    }

    /// Whether a key exists
    pub fn contains(&self, key: &ItemKey) -> bool {
        self.snapshot.contains(key)
    }

    /// All records in a collection, sorted by key
    pub fn scan_collection(&self, collection: &str) -> Vec<(ItemKey, VersionedRecord)> {
        self.snapshot.scan_collection(collection)
    }

    /// Names of all non-empty collections
    pub fn collections(&self) -> Vec<String> {
        self.snapshot.collections()
    }

    /// Number of records visible to this transaction
    pub fn len(&self) -> usize {
        self.snapshot.len()
    }

    /// Whether this transaction sees an empty database
    pub fn is_empty(&self) -> bool {
        self.snapshot.is_empty()
    }

    /// The underlying snapshot, for handing to extensions
    pub fn snapshot(&self) -> &StoreSnapshot {
        &self.snapshot
    }
}

impl std::fmt::Debug for ReadTransaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReadTransaction")
            .field("version", &self.version())
            .finish()
    }
}
