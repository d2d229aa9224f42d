//! Read access to materialized views
//!
//! `ViewHandle` is what mappings, filtered views, and search-results views
//! consume: an ordered, grouped list of keys, independent of how the list is
//! maintained. Methods return owned data because implementations hold their
//! state behind a lock.

use tessera_core::ItemKey;

/// Ordered, grouped key list exposed by a view-like extension
pub trait ViewHandle: Send + Sync {
    /// Name the view is registered under
    fn view_name(&self) -> &str;

    /// All non-empty group names, sorted
    fn groups(&self) -> Vec<String>;

    /// Number of non-empty groups
    fn group_count(&self) -> usize;

    /// Number of keys in a group; zero for an unknown group
    fn len_of_group(&self, group: &str) -> usize;

    /// Total number of keys across all groups
    fn len(&self) -> usize;

    /// Whether the view holds no keys
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The key at a position within a group
    fn key_at(&self, group: &str, index: usize) -> Option<ItemKey>;

    /// All keys in a group, in view order
    fn keys_in_group(&self, group: &str) -> Vec<ItemKey>;

    /// A slice of a group's keys, for paging; out-of-bounds is clamped
    fn keys_in_range(&self, group: &str, range: std::ops::Range<usize>) -> Vec<ItemKey> {
        let keys = self.keys_in_group(group);
        let start = range.start.min(keys.len());
        let end = range.end.min(keys.len());
        keys[start..end].to_vec()
    }

    /// Locate a key: the group it sits in and its position there
    fn index_of(&self, key: &ItemKey) -> Option<(String, usize)>;
}
