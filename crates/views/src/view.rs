//! Materialized grouped-and-sorted views
//!
//! A view maintains, per group, a list of keys kept sorted by a user
//! comparator. The whole structure is derived state: it is rebuilt from a
//! full scan at registration and folded forward incrementally on every
//! commit. Lookups never touch record bodies; only maintenance does.
//!
//! ## Maintenance
//!
//! On a put, the key's old row (if any) is removed first, then the grouping
//! closure decides whether and where the new record lands. Sorted insertion
//! binary-searches the group using the comparator against current records
//! fetched through the commit's reader. Comparator ties always break on key
//! order, so row positions are deterministic.

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use std::collections::{BTreeMap, HashSet};
use tessera_core::{Change, ChangeSet, Extension, ItemKey, Record, Result, StoreReader};
use tracing::warn;

use crate::grouping::{Grouping, Sorting};
use crate::handle::ViewHandle;

#[derive(Default)]
pub(crate) struct ViewState {
    /// Group name to keys in sort order
    pub(crate) groups: BTreeMap<String, Vec<ItemKey>>,
    /// Reverse map: which group each key currently sits in
    pub(crate) placement: FxHashMap<ItemKey, String>,
}

impl ViewState {
    pub(crate) fn clear(&mut self) {
        self.groups.clear();
        self.placement.clear();
    }

    /// Remove a key's row, dropping its group if that empties it
    pub(crate) fn remove_key(&mut self, key: &ItemKey) {
        let Some(group) = self.placement.remove(key) else {
            return;
        };
        if let Some(rows) = self.groups.get_mut(&group) {
            rows.retain(|k| k != key);
            if rows.is_empty() {
                self.groups.remove(&group);
            }
        }
    }

    /// Remove every key belonging to a collection
    pub(crate) fn remove_collection(&mut self, collection: &str) {
        let doomed: Vec<ItemKey> = self
            .placement
            .keys()
            .filter(|k| k.collection == collection)
            .cloned()
            .collect();
        for key in doomed {
            self.remove_key(&key);
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.placement.len()
    }
}

/// A registered view: records grouped and sorted by user closures
///
/// Records whose grouping closure returns `None` are absent from the view.
/// An optional collection allowlist restricts which collections the view
/// even consults.
pub struct View {
    name: String,
    grouping: Grouping,
    sorting: Sorting,
    collections: Option<HashSet<String>>,
    state: RwLock<ViewState>,
}

impl View {
    pub fn new(name: impl Into<String>, grouping: Grouping, sorting: Sorting) -> Self {
        View {
            name: name.into(),
            grouping,
            sorting,
            collections: None,
            state: RwLock::new(ViewState::default()),
        }
    }

    /// Restrict the view to records in the given collections
    pub fn with_collections<I, S>(mut self, collections: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.collections = Some(collections.into_iter().map(Into::into).collect());
        self
    }

    fn collection_allowed(&self, collection: &str) -> bool {
        match &self.collections {
            Some(allowed) => allowed.contains(collection),
            None => true,
        }
    }

    /// Place one record, replacing any existing row for the key
    fn place(&self, state: &mut ViewState, key: &ItemKey, record: &Record, reader: &dyn StoreReader) {
        state.remove_key(key);
        let Some(group) = self.grouping.group(key, record) else {
            return;
        };
        let rows = state.groups.entry(group.clone()).or_default();
        let pos = sorted_position(rows, key, record, &self.sorting, reader);
        rows.insert(pos, key.clone());
        state.placement.insert(key.clone(), group);
    }
}

/// Binary search for the insertion point of `key` in a sorted row list
///
/// Neighbor records are fetched through the reader; a row whose record has
/// vanished mid-maintenance sorts first, which keeps the search monotone.
fn sorted_position(
    rows: &[ItemKey],
    key: &ItemKey,
    record: &Record,
    sorting: &Sorting,
    reader: &dyn StoreReader,
) -> usize {
    rows.partition_point(|existing| match reader.get(existing) {
        Some(vr) => sorting
            .compare(existing, &vr.record, key, record)
            .is_lt(),
        None => {
            warn!(key = %existing, "view row has no backing record during placement");
            true
        }
    })
}

impl Extension for View {
    fn name(&self) -> &str {
        &self.name
    }

    fn repopulate(&self, reader: &dyn StoreReader) -> Result<()> {
        let mut state = self.state.write();
        state.clear();
        for collection in reader.collections() {
            if !self.collection_allowed(&collection) {
                continue;
            }
            for (key, vr) in reader.scan_collection(&collection) {
                self.place(&mut state, &key, &vr.record, reader);
            }
        }
        Ok(())
    }

    fn apply(&self, changes: &ChangeSet, reader: &dyn StoreReader) -> Result<()> {
        let mut state = self.state.write();
        for change in &changes.changes {
            match change {
                Change::Put { key, record } => {
                    if self.collection_allowed(&key.collection) {
                        self.place(&mut state, key, record, reader);
                    }
                }
                Change::Remove { key } => {
                    state.remove_key(key);
                }
                Change::RemoveCollection { collection } => {
                    state.remove_collection(collection);
                }
                Change::RemoveAll => {
                    state.clear();
                }
            }
        }
        Ok(())
    }
}

impl ViewHandle for View {
    fn view_name(&self) -> &str {
        &self.name
    }

    fn groups(&self) -> Vec<String> {
        self.state.read().groups.keys().cloned().collect()
    }

    fn group_count(&self) -> usize {
        self.state.read().groups.len()
    }

    fn len_of_group(&self, group: &str) -> usize {
        self.state.read().groups.get(group).map_or(0, Vec::len)
    }

    fn len(&self) -> usize {
        self.state.read().len()
    }

    fn key_at(&self, group: &str, index: usize) -> Option<ItemKey> {
        self.state
            .read()
            .groups
            .get(group)
            .and_then(|rows| rows.get(index))
            .cloned()
    }

    fn keys_in_group(&self, group: &str) -> Vec<ItemKey> {
        self.state
            .read()
            .groups
            .get(group)
            .cloned()
            .unwrap_or_default()
    }

    fn index_of(&self, key: &ItemKey) -> Option<(String, usize)> {
        let state = self.state.read();
        let group = state.placement.get(key)?;
        let pos = state.groups.get(group)?.iter().position(|k| k == key)?;
        Some((group.clone(), pos))
    }
}

impl std::fmt::Debug for View {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("View")
            .field("name", &self.name)
            .field("len", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tessera_core::{Record, Value};
    use tessera_storage::ShardedStore;

    fn person(name: &str, age: i64) -> Value {
        let mut obj = std::collections::HashMap::new();
        obj.insert("name".to_string(), Value::from(name));
        obj.insert("age".to_string(), Value::Int(age));
        Value::Object(obj)
    }

    fn age_of(v: &Value) -> i64 {
        v.get("age").and_then(Value::as_int).unwrap_or(0)
    }

    fn by_age_view(name: &str) -> View {
        View::new(
            name,
            Grouping::single_group("all"),
            Sorting::by_value(|a, b| age_of(a).cmp(&age_of(b))),
        )
    }

    fn commit(store: &Arc<ShardedStore>, view: &View, changes: Vec<Change>) {
        let cs = ChangeSet::new(store.version() + 1, changes);
        store.apply_changeset(&cs);
        let snapshot = store.snapshot();
        view.apply(&cs, &snapshot).unwrap();
    }

    fn put(key: &str, age: i64) -> Change {
        Change::Put {
            key: ItemKey::new("people", key),
            record: Record::value_only(person(key, age)),
        }
    }

    #[test]
    fn test_put_inserts_in_sort_order() {
        let store = Arc::new(ShardedStore::new());
        let view = by_age_view("by_age");

        commit(&store, &view, vec![put("carol", 30), put("alice", 25), put("bob", 40)]);

        let keys: Vec<_> = view
            .keys_in_group("all")
            .into_iter()
            .map(|k| k.key)
            .collect();
        assert_eq!(keys, vec!["alice", "carol", "bob"]);
    }

    #[test]
    fn test_update_relocates_row() {
        let store = Arc::new(ShardedStore::new());
        let view = by_age_view("by_age");

        commit(&store, &view, vec![put("alice", 25), put("bob", 40)]);
        commit(&store, &view, vec![put("alice", 50)]);

        let keys: Vec<_> = view
            .keys_in_group("all")
            .into_iter()
            .map(|k| k.key)
            .collect();
        assert_eq!(keys, vec!["bob", "alice"]);
        assert_eq!(view.len(), 2);
    }

    #[test]
    fn test_grouping_none_excludes_and_drops_existing_row() {
        let store = Arc::new(ShardedStore::new());
        let view = View::new(
            "adults",
            Grouping::by_value(|_, v| if age_of(v) >= 18 { Some("adults".into()) } else { None }),
            Sorting::key_order(),
        );

        commit(&store, &view, vec![put("alice", 25)]);
        assert_eq!(view.len(), 1);

        // Update moves the record below the threshold
        commit(&store, &view, vec![put("alice", 12)]);
        assert_eq!(view.len(), 0);
        assert!(view.groups().is_empty());
    }

    #[test]
    fn test_remove_drops_row_and_empty_group() {
        let store = Arc::new(ShardedStore::new());
        let view = by_age_view("by_age");

        commit(&store, &view, vec![put("alice", 25)]);
        commit(
            &store,
            &view,
            vec![Change::Remove { key: ItemKey::new("people", "alice") }],
        );

        assert!(view.is_empty());
        assert_eq!(view.group_count(), 0);
        assert_eq!(view.index_of(&ItemKey::new("people", "alice")), None);
    }

    #[test]
    fn test_index_of_and_key_at_agree() {
        let store = Arc::new(ShardedStore::new());
        let view = by_age_view("by_age");

        commit(&store, &view, vec![put("alice", 25), put("bob", 40), put("carol", 30)]);

        let (group, idx) = view.index_of(&ItemKey::new("people", "carol")).unwrap();
        assert_eq!(group, "all");
        assert_eq!(view.key_at(&group, idx), Some(ItemKey::new("people", "carol")));
    }

    #[test]
    fn test_collection_allowlist() {
        let store = Arc::new(ShardedStore::new());
        let view = View::new(
            "people_only",
            Grouping::single_group("all"),
            Sorting::key_order(),
        )
        .with_collections(["people"]);

        commit(
            &store,
            &view,
            vec![
                put("alice", 25),
                Change::Put {
                    key: ItemKey::new("cities", "sf"),
                    record: Record::value_only(Value::from("San Francisco")),
                },
            ],
        );

        assert_eq!(view.len(), 1);
        assert!(view.index_of(&ItemKey::new("cities", "sf")).is_none());
    }

    #[test]
    fn test_remove_collection_and_remove_all() {
        let store = Arc::new(ShardedStore::new());
        let view = View::new("all", Grouping::by_collection(), Sorting::key_order());

        commit(
            &store,
            &view,
            vec![
                put("alice", 25),
                Change::Put {
                    key: ItemKey::new("cities", "sf"),
                    record: Record::value_only(Value::from("SF")),
                },
            ],
        );
        assert_eq!(view.groups(), vec!["cities", "people"]);

        commit(
            &store,
            &view,
            vec![Change::RemoveCollection { collection: "people".into() }],
        );
        assert_eq!(view.groups(), vec!["cities"]);

        commit(&store, &view, vec![Change::RemoveAll]);
        assert!(view.is_empty());
    }

    #[test]
    fn test_repopulate_matches_incremental() {
        let store = Arc::new(ShardedStore::new());
        let incremental = by_age_view("inc");

        commit(&store, &incremental, vec![put("carol", 30), put("alice", 25)]);
        commit(&store, &incremental, vec![put("bob", 40), put("alice", 35)]);

        let rebuilt = by_age_view("rebuilt");
        rebuilt.repopulate(&store.snapshot()).unwrap();

        assert_eq!(rebuilt.keys_in_group("all"), incremental.keys_in_group("all"));
    }

    #[test]
    fn test_keys_in_range_clamps_bounds() {
        let store = Arc::new(ShardedStore::new());
        let view = by_age_view("by_age");

        commit(&store, &view, vec![put("carol", 30), put("alice", 25), put("bob", 40)]);

        let page: Vec<_> = view
            .keys_in_range("all", 1..3)
            .into_iter()
            .map(|k| k.key)
            .collect();
        assert_eq!(page, vec!["carol", "bob"]);
        assert_eq!(view.keys_in_range("all", 2..10).len(), 1);
        assert!(view.keys_in_range("all", 5..9).is_empty());
        assert!(view.keys_in_range("missing", 0..1).is_empty());
    }

    #[test]
    fn test_equal_sort_keys_order_by_item_key() {
        let store = Arc::new(ShardedStore::new());
        let view = by_age_view("by_age");

        commit(&store, &view, vec![put("zed", 30), put("amy", 30), put("mia", 30)]);

        let keys: Vec<_> = view
            .keys_in_group("all")
            .into_iter()
            .map(|k| k.key)
            .collect();
        assert_eq!(keys, vec!["amy", "mia", "zed"]);
    }
}
