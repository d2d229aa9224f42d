//! Sharded MVCC store
//!
//! Storage is a DashMap keyed by collection name; each collection is a shard
//! holding an FxHashMap from key to version chain. Reads of the latest state
//! are lock-free via DashMap; writes only lock the target collection's shard.
//!
//! # MVCC
//!
//! Every committed transaction applies all of its operations at a single
//! commit version. Removals push tombstones instead of deleting chains, so a
//! snapshot taken at version V keeps reading the records that were live at V
//! regardless of later commits. `gc` trims chain history once no snapshot can
//! reach it.

use dashmap::DashMap;
use rustc_hash::FxHashMap;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tessera_core::{Change, ChangeSet, ItemKey, StoreReader, Timestamp, VersionedRecord};

use crate::stored_entry::StoredEntry;

/// Version chain for one key, newest first
///
/// VecDeque gives O(1) push_front for new versions, which matters for keys
/// that are updated repeatedly.
#[derive(Debug, Clone)]
pub struct VersionChain {
    versions: VecDeque<StoredEntry>,
}

impl VersionChain {
    /// Create a chain with a single entry
    pub fn new(entry: StoredEntry) -> Self {
        let mut versions = VecDeque::with_capacity(4);
        versions.push_front(entry);
        VersionChain { versions }
    }

    /// Add a new entry (must be newer than existing entries)
    #[inline]
    pub fn push(&mut self, entry: StoredEntry) {
        debug_assert!(
            self.versions
                .front()
                .map(|e| e.version() <= entry.version())
                .unwrap_or(true),
            "version chain must grow monotonically"
        );
        self.versions.push_front(entry);
    }

    /// The entry visible at or before `max_version`
    pub fn get_at_version(&self, max_version: u64) -> Option<&StoredEntry> {
        self.versions.iter().find(|e| e.version() <= max_version)
    }

    /// The newest entry
    #[inline]
    pub fn latest(&self) -> Option<&StoredEntry> {
        self.versions.front()
    }

    /// Drop entries no snapshot at or after `min_version` can read
    ///
    /// Always keeps the newest entry. Returns true if the chain is dead
    /// afterwards: a single tombstone older than `min_version`.
    pub fn gc(&mut self, min_version: u64) -> bool {
        while self.versions.len() > 1 {
            // The entry *before* the oldest is the one a reader at
            // min_version would fall through to; the oldest can go once the
            // next-newer entry is already at or below min_version.
            let second_oldest = self.versions[self.versions.len() - 2].version();
            if second_oldest <= min_version {
                self.versions.pop_back();
            } else {
                break;
            }
        }

        self.versions.len() == 1
            && self.versions[0].is_tombstone()
            && self.versions[0].version() <= min_version
    }

    /// Number of entries in the chain
    pub fn version_count(&self) -> usize {
        self.versions.len()
    }
}

/// Per-collection shard
#[derive(Debug, Default)]
pub struct Shard {
    pub(crate) data: FxHashMap<String, VersionChain>,
}

impl Shard {
    /// Number of keys in this shard (live or tombstoned)
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the shard holds no chains at all
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Number of keys whose latest entry is live
    fn live_len(&self) -> usize {
        self.data
            .values()
            .filter(|c| c.latest().map(|e| !e.is_tombstone()).unwrap_or(false))
            .count()
    }
}

/// Sharded MVCC store: DashMap by collection, FxHashMap within
pub struct ShardedStore {
    shards: DashMap<String, Shard>,
    /// Global commit version
    version: AtomicU64,
}

impl ShardedStore {
    /// Create an empty store
    pub fn new() -> Self {
        ShardedStore {
            shards: DashMap::new(),
            version: AtomicU64::new(0),
        }
    }

    /// Current global commit version
    #[inline]
    pub fn version(&self) -> u64 {
        self.version.load(Ordering::Acquire)
    }

    /// Set the global version (used by recovery)
    pub fn set_version(&self, version: u64) {
        self.version.store(version, Ordering::Release);
    }

    /// Allocate the next commit version
    #[inline]
    pub fn next_version(&self) -> u64 {
        self.version.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Latest live record for a key
    pub fn get(&self, key: &ItemKey) -> Option<VersionedRecord> {
        self.shards.get(&key.collection).and_then(|shard| {
            shard
                .data
                .get(&key.key)
                .and_then(|chain| chain.latest())
                .and_then(|entry| entry.versioned())
        })
    }

    /// Record visible at or before `max_version`, tombstones read as absent
    pub fn get_at_version(&self, key: &ItemKey, max_version: u64) -> Option<VersionedRecord> {
        self.shards.get(&key.collection).and_then(|shard| {
            shard
                .data
                .get(&key.key)
                .and_then(|chain| chain.get_at_version(max_version))
                .and_then(|entry| entry.versioned())
        })
    }

    /// Apply one committed change set atomically at its version
    ///
    /// All writes share one timestamp, captured once per batch. Collection
    /// clears and full clears write tombstones for every live key so open
    /// snapshots are unaffected.
    pub fn apply_changeset(&self, changes: &ChangeSet) {
        let timestamp = Timestamp::now();
        let version = changes.version;

        for change in &changes.changes {
            match change {
                Change::Put { key, record } => {
                    let entry = StoredEntry::put(record.clone(), version, timestamp);
                    let mut shard = self.shards.entry(key.collection.clone()).or_default();
                    match shard.data.get_mut(&key.key) {
                        Some(chain) => chain.push(entry),
                        None => {
                            shard.data.insert(key.key.clone(), VersionChain::new(entry));
                        }
                    }
                }
                Change::Remove { key } => {
                    if let Some(mut shard) = self.shards.get_mut(&key.collection) {
                        if let Some(chain) = shard.data.get_mut(&key.key) {
                            if chain.latest().map(|e| !e.is_tombstone()).unwrap_or(false) {
                                chain.push(StoredEntry::tombstone(version, timestamp));
                            }
                        }
                    }
                }
                Change::RemoveCollection { collection } => {
                    if let Some(mut shard) = self.shards.get_mut(collection) {
                        Self::tombstone_shard(&mut shard, version, timestamp);
                    }
                }
                Change::RemoveAll => {
                    for mut shard in self.shards.iter_mut() {
                        Self::tombstone_shard(&mut shard, version, timestamp);
                    }
                }
            }
        }

        self.version.fetch_max(version, Ordering::AcqRel);
    }

    fn tombstone_shard(shard: &mut Shard, version: u64, timestamp: Timestamp) {
        for chain in shard.data.values_mut() {
            if chain.latest().map(|e| !e.is_tombstone()).unwrap_or(false) {
                chain.push(StoredEntry::tombstone(version, timestamp));
            }
        }
    }

    /// Latest live records in a collection, sorted by key
    pub fn scan_collection(&self, collection: &str) -> Vec<(ItemKey, VersionedRecord)> {
        self.scan_collection_at_version(collection, u64::MAX)
    }

    /// Records in a collection visible at `max_version`, sorted by key
    pub fn scan_collection_at_version(
        &self,
        collection: &str,
        max_version: u64,
    ) -> Vec<(ItemKey, VersionedRecord)> {
        self.shards
            .get(collection)
            .map(|shard| {
                let mut results: Vec<_> = shard
                    .data
                    .iter()
                    .filter_map(|(k, chain)| {
                        chain
                            .get_at_version(max_version)
                            .and_then(|entry| entry.versioned())
                            .map(|vr| (ItemKey::new(collection, k.clone()), vr))
                    })
                    .collect();
                results.sort_by(|(a, _), (b, _)| a.cmp(b));
                results
            })
            .unwrap_or_default()
    }

    /// Names of collections with at least one record visible at `max_version`
    pub fn collections_at_version(&self, max_version: u64) -> Vec<String> {
        let mut names: Vec<String> = self
            .shards
            .iter()
            .filter(|entry| {
                entry.value().data.values().any(|chain| {
                    chain
                        .get_at_version(max_version)
                        .map(|e| !e.is_tombstone())
                        .unwrap_or(false)
                })
            })
            .map(|entry| entry.key().clone())
            .collect();
        names.sort();
        names
    }

    /// Number of records visible at `max_version`
    pub fn len_at_version(&self, max_version: u64) -> usize {
        self.shards
            .iter()
            .map(|entry| {
                entry
                    .value()
                    .data
                    .values()
                    .filter(|chain| {
                        chain
                            .get_at_version(max_version)
                            .map(|e| !e.is_tombstone())
                            .unwrap_or(false)
                    })
                    .count()
            })
            .sum()
    }

    /// Number of live records
    pub fn len(&self) -> usize {
        self.shards.iter().map(|entry| entry.value().live_len()).sum()
    }

    /// Whether the store has no live records
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Trim version chains no snapshot at or after `min_version` can read
    ///
    /// Removes chains that collapse to a dead tombstone, and shards that
    /// become empty.
    pub fn gc(&self, min_version: u64) {
        let mut empty_shards = Vec::new();
        for mut entry in self.shards.iter_mut() {
            let shard = entry.value_mut();
            shard.data.retain(|_, chain| !chain.gc(min_version));
            if shard.is_empty() {
                empty_shards.push(entry.key().clone());
            }
        }
        for name in empty_shards {
            // Re-check under the entry lock: a concurrent writer may have
            // repopulated the shard.
            self.shards
                .remove_if(&name, |_, shard| shard.is_empty());
        }
    }

    /// O(1) snapshot at the current version
    #[inline]
    pub fn snapshot(self: &Arc<Self>) -> StoreSnapshot {
        StoreSnapshot {
            version: self.version.load(Ordering::Acquire),
            store: Arc::clone(self),
        }
    }
}

impl Default for ShardedStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ShardedStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShardedStore")
            .field("collections", &self.shards.len())
            .field("version", &self.version())
            .finish()
    }
}

/// Snapshot of the store at a point in time
///
/// Acquisition is an Arc clone plus one atomic load. Reads are filtered to
/// entries with `version <= snapshot.version`; tombstones read as absent.
#[derive(Clone)]
pub struct StoreSnapshot {
    version: u64,
    store: Arc<ShardedStore>,
}

impl StoreSnapshot {
    /// The version this snapshot reads at
    #[inline]
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Whether a key is visible in this snapshot
    pub fn contains(&self, key: &ItemKey) -> bool {
        self.get(key).is_some()
    }
}

impl StoreReader for StoreSnapshot {
    fn get(&self, key: &ItemKey) -> Option<VersionedRecord> {
        self.store.get_at_version(key, self.version)
    }

    fn scan_collection(&self, collection: &str) -> Vec<(ItemKey, VersionedRecord)> {
        self.store.scan_collection_at_version(collection, self.version)
    }

    fn collections(&self) -> Vec<String> {
        self.store.collections_at_version(self.version)
    }

    fn len(&self) -> usize {
        self.store.len_at_version(self.version)
    }
}

impl std::fmt::Debug for StoreSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreSnapshot")
            .field("version", &self.version)
            .finish()
    }
}
