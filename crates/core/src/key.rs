//! Document identity and key validation
//!
//! Every stored document is addressed by an `ItemKey`: a collection name plus
//! a key within that collection. The empty collection is valid and acts as
//! the default collection.
//!
//! Validation rules, enforced by every write path:
//! - Keys must be valid UTF-8 (guaranteed by `String`)
//! - Keys must not be empty
//! - Keys and collections must not contain NUL bytes (\0)
//! - Keys must not exceed `Limits::max_key_bytes`
//! - Collections must not exceed `Limits::max_collection_bytes`

use crate::limits::Limits;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Identity of a stored document: collection + key
///
/// Ordered by collection first, then key, so collection scans come out in a
/// stable order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ItemKey {
    /// Collection the document lives in (may be empty: the default collection)
    pub collection: String,
    /// Key within the collection
    pub key: String,
}

impl ItemKey {
    /// Create a new item key
    pub fn new(collection: impl Into<String>, key: impl Into<String>) -> Self {
        ItemKey {
            collection: collection.into(),
            key: key.into(),
        }
    }

    /// Create a key in the default (empty) collection
    pub fn in_default_collection(key: impl Into<String>) -> Self {
        ItemKey::new("", key)
    }
}

impl fmt::Display for ItemKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.collection, self.key)
    }
}

/// Key validation errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum KeyError {
    /// Key is empty (length 0)
    #[error("Key cannot be empty")]
    Empty,

    /// Key or collection contains a NUL byte (\0)
    #[error("Key cannot contain NUL bytes")]
    ContainsNul,

    /// Key exceeds maximum length
    #[error("Key too long: {actual} bytes exceeds maximum {max}")]
    KeyTooLong {
        /// Actual key length in bytes
        actual: usize,
        /// Maximum allowed length
        max: usize,
    },

    /// Collection name exceeds maximum length
    #[error("Collection too long: {actual} bytes exceeds maximum {max}")]
    CollectionTooLong {
        /// Actual collection length in bytes
        actual: usize,
        /// Maximum allowed length
        max: usize,
    },
}

/// Validate an item key using default limits
pub fn validate_item_key(item: &ItemKey) -> Result<(), KeyError> {
    validate_item_key_with_limits(item, &Limits::default())
}

/// Validate an item key with custom limits
pub fn validate_item_key_with_limits(item: &ItemKey, limits: &Limits) -> Result<(), KeyError> {
    if item.key.is_empty() {
        return Err(KeyError::Empty);
    }

    if item.key.contains('\x00') || item.collection.contains('\x00') {
        return Err(KeyError::ContainsNul);
    }

    let key_len = item.key.len();
    if key_len > limits.max_key_bytes {
        return Err(KeyError::KeyTooLong {
            actual: key_len,
            max: limits.max_key_bytes,
        });
    }

    let coll_len = item.collection.len();
    if coll_len > limits.max_collection_bytes {
        return Err(KeyError::CollectionTooLong {
            actual: coll_len,
            max: limits.max_collection_bytes,
        });
    }

    Ok(())
}
