//! Write transactions
//!
//! A write transaction buffers its operations in memory; nothing touches the
//! store or the WAL until commit. The engine serializes write transactions
//! with a writer lock, so a write transaction never observes a concurrent
//! commit.
//!
//! Reads inside a write transaction are read-your-writes: the buffered
//! operations shadow the snapshot the transaction began with.

use rustc_hash::{FxHashMap, FxHashSet};
use std::collections::BTreeMap;
use tessera_core::{
    key::validate_item_key_with_limits, Change, Error, ItemKey, Limits, Record, Result,
    StoreReader, Value, VersionedRecord,
};
use tessera_storage::StoreSnapshot;

/// A buffered read-write transaction
pub struct WriteTransaction {
    snapshot: StoreSnapshot,
    limits: Limits,
    /// Operations in issue order, replayed verbatim into the change set
    ops: Vec<Change>,
    /// Net effect per key, for read-your-writes (None = removed)
    overlay: FxHashMap<ItemKey, Option<Record>>,
    /// Collections cleared by remove_collection, shadowing the snapshot
    cleared_collections: FxHashSet<String>,
    /// Whether remove_all was issued
    cleared_all: bool,
}

impl WriteTransaction {
    /// Begin a write transaction over a snapshot
    pub fn new(snapshot: StoreSnapshot, limits: Limits) -> Self {
        WriteTransaction {
            snapshot,
            limits,
            ops: Vec::new(),
            overlay: FxHashMap::default(),
            cleared_collections: FxHashSet::default(),
            cleared_all: false,
        }
    }

    // ------------------------------------------------------------------
    // Writes
    // ------------------------------------------------------------------

    /// Write a record (value + optional metadata) under a key
    ///
    /// Rejects the write if the key fails validation or the serialized
    /// record exceeds `Limits::max_value_bytes`; a rejected put leaves the
    /// transaction untouched.
    pub fn put(&mut self, key: ItemKey, value: Value, metadata: Option<Value>) -> Result<()> {
        validate_item_key_with_limits(&key, &self.limits)?;
        let record = Record::new(value, metadata);
        // Same encoding the WAL frames use, so the limit bounds what a
        // single record costs on disk.
        let size = bincode::serialized_size(&record)? as usize;
        if size > self.limits.max_value_bytes {
            return Err(Error::ValueTooLarge {
                actual: size,
                max: self.limits.max_value_bytes,
            });
        }
        self.overlay.insert(key.clone(), Some(record.clone()));
        self.ops.push(Change::Put { key, record });
        Ok(())
    }

    /// Write a value with no metadata
    pub fn put_value(&mut self, key: ItemKey, value: Value) -> Result<()> {
        self.put(key, value, None)
    }

    /// Remove the record under a key
    ///
    /// Removing an absent key is a no-op that still validates the key.
    pub fn remove(&mut self, key: ItemKey) -> Result<()> {
        validate_item_key_with_limits(&key, &self.limits)?;
        self.overlay.insert(key.clone(), None);
        self.ops.push(Change::Remove { key });
        Ok(())
    }

    /// Remove every record in a collection
    pub fn remove_collection(&mut self, collection: impl Into<String>) {
        let collection = collection.into();
        self.overlay.retain(|k, _| k.collection != collection);
        self.cleared_collections.insert(collection.clone());
        self.ops.push(Change::RemoveCollection { collection });
    }

    /// Remove every record in the database
    pub fn remove_all(&mut self) {
        self.overlay.clear();
        self.cleared_collections.clear();
        self.cleared_all = true;
        self.ops.push(Change::RemoveAll);
    }

    // ------------------------------------------------------------------
    // Reads (read-your-writes)
    // ------------------------------------------------------------------

    /// Get the record under a key, seeing this transaction's own writes
    ///
    /// Records written by this transaction are returned with the snapshot
    /// version; they have no commit version until the transaction commits.
    pub fn get(&self, key: &ItemKey) -> Option<VersionedRecord> {
        if let Some(buffered) = self.overlay.get(key) {
            return buffered.as_ref().map(|r| {
                VersionedRecord::new(r.clone(), self.snapshot.version(), Default::default())
            });
        }
        if self.is_shadowed(&key.collection) {
            return None;
        }
        self.snapshot.get(key)
    }

    /// Get just the value under a key
    pub fn get_value(&self, key: &ItemKey) -> Option<Value> {
        self.get(key).map(|vr| vr.record.value)
    }

    /// Get just the metadata under a key
    pub fn get_metadata(&self, key: &ItemKey) -> Option<Value> {
        self.get(key).and_then(|vr| vr.record.metadata)
    }

    /// Whether a key is visible to this transaction
    pub fn contains(&self, key: &ItemKey) -> bool {
        self.get(key).is_some()
    }

    /// All records in a collection as this transaction sees them
    pub fn scan_collection(&self, collection: &str) -> Vec<(ItemKey, VersionedRecord)> {
        let mut merged: BTreeMap<ItemKey, VersionedRecord> = BTreeMap::new();

        if !self.is_shadowed(collection) {
            for (key, vr) in self.snapshot.scan_collection(collection) {
                merged.insert(key, vr);
            }
        }
        for (key, buffered) in &self.overlay {
            if key.collection != collection {
                continue;
            }
            match buffered {
                Some(record) => {
                    merged.insert(
                        key.clone(),
                        VersionedRecord::new(
                            record.clone(),
                            self.snapshot.version(),
                            Default::default(),
                        ),
                    );
                }
                None => {
                    merged.remove(key);
                }
            }
        }

        merged.into_iter().collect()
    }

    /// Names of collections visible to this transaction
    pub fn collections(&self) -> Vec<String> {
        let mut names: FxHashSet<String> = FxHashSet::default();
        if !self.cleared_all {
            for name in self.snapshot.collections() {
                if !self.cleared_collections.contains(&name) {
                    names.insert(name);
                }
            }
        }
        for (key, buffered) in &self.overlay {
            match buffered {
                Some(_) => {
                    names.insert(key.collection.clone());
                }
                None => {
                    // A buffered remove can empty a snapshot collection;
                    // verify before keeping the name.
                    if names.contains(&key.collection)
                        && self.scan_collection(&key.collection).is_empty()
                    {
                        names.remove(&key.collection);
                    }
                }
            }
        }
        let mut sorted: Vec<String> = names.into_iter().collect();
        sorted.sort();
        sorted
    }

    // ------------------------------------------------------------------
    // Commit plumbing
    // ------------------------------------------------------------------

    /// Whether the transaction has buffered any operations
    pub fn is_dirty(&self) -> bool {
        !self.ops.is_empty()
    }

    /// Number of buffered operations
    pub fn op_count(&self) -> usize {
        self.ops.len()
    }

    /// Consume the transaction, yielding its ordered operations
    pub fn into_ops(self) -> Vec<Change> {
        self.ops
    }

    fn is_shadowed(&self, collection: &str) -> bool {
        self.cleared_all || self.cleared_collections.contains(collection)
    }
}

impl std::fmt::Debug for WriteTransaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WriteTransaction")
            .field("snapshot_version", &self.snapshot.version())
            .field("buffered_ops", &self.ops.len())
            .finish()
    }
}
