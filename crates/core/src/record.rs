//! Records and versioned records
//!
//! A `Record` pairs a document body with its optional metadata; the two are
//! always read and written together. `VersionedRecord` is the contract type
//! returned by reads: the record plus the commit version and timestamp it
//! was written at.

use crate::value::Value;
use serde::{Deserialize, Serialize};

/// A stored document: value plus optional metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// The document body
    pub value: Value,
    /// Optional metadata stored alongside the value
    pub metadata: Option<Value>,
}

impl Record {
    /// Create a record with value and metadata
    pub fn new(value: Value, metadata: Option<Value>) -> Self {
        Record { value, metadata }
    }

    /// Create a record with no metadata
    pub fn value_only(value: Value) -> Self {
        Record {
            value,
            metadata: None,
        }
    }
}

/// A record together with the commit version and timestamp that wrote it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionedRecord {
    /// The stored record
    pub record: Record,
    /// Commit version that wrote this record
    pub version: u64,
    /// Time the record was written
    pub updated_at: Timestamp,
}

impl VersionedRecord {
    /// Create a versioned record
    pub fn new(record: Record, version: u64, updated_at: Timestamp) -> Self {
        VersionedRecord {
            record,
            version,
            updated_at,
        }
    }

    /// The document body
    pub fn value(&self) -> &Value {
        &self.record.value
    }

    /// The document metadata, if any
    pub fn metadata(&self) -> Option<&Value> {
        self.record.metadata.as_ref()
    }
}

/// Microseconds since the Unix epoch
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub struct Timestamp(pub u64);

impl Timestamp {
    /// Current time
    pub fn now() -> Self {
        Timestamp(chrono::Utc::now().timestamp_micros().max(0) as u64)
    }

    /// Construct from raw microseconds
    pub fn from_micros(micros: u64) -> Self {
        Timestamp(micros)
    }

    /// Microseconds since epoch
    pub fn as_micros(&self) -> u64 {
        self.0
    }
}
