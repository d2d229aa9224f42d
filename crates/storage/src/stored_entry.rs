//! Chain entries for MVCC storage
//!
//! Each key maps to a chain of `StoredEntry` values, newest first. An entry
//! is either a record written at some commit version or a tombstone marking
//! the key removed at that version. Tombstones keep removed records readable
//! through snapshots taken before the removal.

use tessera_core::{Record, Timestamp, VersionedRecord};

/// One link in a key's version chain
#[derive(Debug, Clone, PartialEq)]
pub struct StoredEntry {
    version: u64,
    updated_at: Timestamp,
    /// The record, or None for a tombstone
    body: Option<Record>,
}

impl StoredEntry {
    /// Entry for a written record
    pub fn put(record: Record, version: u64, updated_at: Timestamp) -> Self {
        StoredEntry {
            version,
            updated_at,
            body: Some(record),
        }
    }

    /// Tombstone marking the key removed at this version
    pub fn tombstone(version: u64, updated_at: Timestamp) -> Self {
        StoredEntry {
            version,
            updated_at,
            body: None,
        }
    }

    /// Commit version of this entry
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Whether this entry marks a removal
    pub fn is_tombstone(&self) -> bool {
        self.body.is_none()
    }

    /// The record, unless this is a tombstone
    pub fn record(&self) -> Option<&Record> {
        self.body.as_ref()
    }

    /// Contract type for readers, None for tombstones
    pub fn versioned(&self) -> Option<VersionedRecord> {
        self.body
            .as_ref()
            .map(|r| VersionedRecord::new(r.clone(), self.version, self.updated_at))
    }
}
