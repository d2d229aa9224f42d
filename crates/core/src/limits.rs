//! Size limits enforced at the API boundary

/// Size limits for keys, collections, and values
///
/// Enforced by key validation and by `WriteTransaction::put`. A database can
/// be opened with custom limits; the defaults are generous for a document
/// store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Limits {
    /// Maximum key length in bytes
    pub max_key_bytes: usize,
    /// Maximum collection name length in bytes
    pub max_collection_bytes: usize,
    /// Maximum serialized record size (value plus metadata) in bytes
    pub max_value_bytes: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Limits {
            max_key_bytes: 1024,
            max_collection_bytes: 256,
            max_value_bytes: 16 * 1024 * 1024,
        }
    }
}
