//! The secondary index extension
//!
//! Per column, the index keeps a `BTreeMap` from cell value to the set of
//! keys holding that value, plus a reverse map from key to its full index
//! row for cheap removal. Maintenance mirrors views: rebuild on repopulate,
//! fold change sets forward on apply.
//!
//! A handler that misbehaves (unknown column, wrong type, NaN) costs only
//! that record its index row; the commit itself never fails on account of
//! an index.

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::ops::Bound;
use tessera_core::{
    Change, ChangeSet, Error, Extension, ItemKey, Record, Result, StoreReader,
};
use tracing::warn;

use crate::column::{IndexValue, IndexedType};
use crate::query::{IndexQuery, Predicate};
use crate::setup::{IndexRow, IndexSetup, Indexer};

type ColumnTree = BTreeMap<IndexValue, BTreeSet<ItemKey>>;

#[derive(Default)]
struct IndexState {
    columns: FxHashMap<String, ColumnTree>,
    rows: FxHashMap<ItemKey, IndexRow>,
}

impl IndexState {
    fn remove_key(&mut self, key: &ItemKey) {
        let Some(row) = self.rows.remove(key) else {
            return;
        };
        for (column, cell) in row {
            if let Some(tree) = self.columns.get_mut(&column) {
                if let Some(keys) = tree.get_mut(&cell) {
                    keys.remove(key);
                    if keys.is_empty() {
                        tree.remove(&cell);
                    }
                }
            }
        }
    }

    fn remove_collection(&mut self, collection: &str) {
        let doomed: Vec<ItemKey> = self
            .rows
            .keys()
            .filter(|k| k.collection == collection)
            .cloned()
            .collect();
        for key in doomed {
            self.remove_key(&key);
        }
    }

    fn clear(&mut self) {
        self.columns.clear();
        self.rows.clear();
    }
}

/// A registered secondary index over typed columns
pub struct SecondaryIndex {
    name: String,
    setup: IndexSetup,
    indexer: Indexer,
    collections: Option<HashSet<String>>,
    state: RwLock<IndexState>,
}

impl SecondaryIndex {
    pub fn new(name: impl Into<String>, setup: IndexSetup, indexer: Indexer) -> Self {
        SecondaryIndex {
            name: name.into(),
            setup,
            indexer,
            collections: None,
            state: RwLock::new(IndexState::default()),
        }
    }

    /// Restrict the index to records in the given collections
    pub fn with_collections<I, S>(mut self, collections: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.collections = Some(collections.into_iter().map(Into::into).collect());
        self
    }

    pub fn setup(&self) -> &IndexSetup {
        &self.setup
    }

    /// Number of indexed records
    pub fn len(&self) -> usize {
        self.state.read().rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn collection_allowed(&self, collection: &str) -> bool {
        match &self.collections {
            Some(allowed) => allowed.contains(collection),
            None => true,
        }
    }

    /// Index one record, replacing any previous row for the key
    fn place(&self, state: &mut IndexState, key: &ItemKey, record: &Record) {
        state.remove_key(key);
        let Some(row) = self.indexer.extract(key, record) else {
            return;
        };
        if !self.row_is_valid(key, &row) {
            return;
        }
        for (column, cell) in &row {
            state
                .columns
                .entry(column.clone())
                .or_default()
                .entry(cell.clone())
                .or_default()
                .insert(key.clone());
        }
        state.rows.insert(key.clone(), row);
    }

    /// A row is dropped whole if any cell is off-schema or unstorable
    fn row_is_valid(&self, key: &ItemKey, row: &IndexRow) -> bool {
        for (column, cell) in row {
            let Some(ty) = self.setup.column_type(column) else {
                warn!(index = %self.name, key = %key, column = %column, "row names undeclared column, skipping record");
                return false;
            };
            if !cell.matches_type(ty) {
                warn!(index = %self.name, key = %key, column = %column, "cell type does not match column, skipping record");
                return false;
            }
            if !cell.is_storable() {
                warn!(index = %self.name, key = %key, column = %column, "NaN cell, skipping record");
                return false;
            }
        }
        true
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// Keys matching every clause of a query, sorted
    pub fn find(&self, query: &IndexQuery) -> Result<Vec<ItemKey>> {
        if query.is_empty() {
            return Err(Error::InvalidOperation(
                "index query has no clauses".to_string(),
            ));
        }

        let state = self.state.read();
        let mut result: Option<BTreeSet<ItemKey>> = None;
        for (column, predicate) in query.clauses() {
            let matched = self.evaluate_clause(&state, column, predicate)?;
            result = Some(match result {
                None => matched,
                Some(prev) => prev.intersection(&matched).cloned().collect(),
            });
            if result.as_ref().is_some_and(BTreeSet::is_empty) {
                break;
            }
        }

        Ok(result.unwrap_or_default().into_iter().collect())
    }

    /// Number of keys matching a query
    pub fn count(&self, query: &IndexQuery) -> Result<usize> {
        self.find(query).map(|keys| keys.len())
    }

    fn evaluate_clause(
        &self,
        state: &IndexState,
        column: &str,
        predicate: &Predicate,
    ) -> Result<BTreeSet<ItemKey>> {
        let ty = self.setup.column_type(column).ok_or_else(|| {
            Error::InvalidOperation(format!(
                "index '{}' has no column '{column}'",
                self.name
            ))
        })?;
        self.check_predicate_type(column, ty, predicate)?;

        let Some(tree) = state.columns.get(column) else {
            return Ok(BTreeSet::new());
        };

        let mut matched = BTreeSet::new();
        match predicate {
            Predicate::Equals(value) => {
                if let Some(keys) = tree.get(value) {
                    matched.extend(keys.iter().cloned());
                }
            }
            Predicate::Range { lower, upper } => {
                if !range_is_empty(lower, upper) {
                    for (_, keys) in tree.range((lower.clone(), upper.clone())) {
                        matched.extend(keys.iter().cloned());
                    }
                }
            }
            Predicate::Prefix(prefix) => {
                let start = Bound::Included(IndexValue::Text(prefix.clone()));
                for (cell, keys) in tree.range((start, Bound::Unbounded)) {
                    match cell {
                        IndexValue::Text(text) if text.starts_with(prefix.as_str()) => {
                            matched.extend(keys.iter().cloned());
                        }
                        _ => break,
                    }
                }
            }
        }
        Ok(matched)
    }

    fn check_predicate_type(
        &self,
        column: &str,
        ty: IndexedType,
        predicate: &Predicate,
    ) -> Result<()> {
        let mismatch = |what: &str| {
            Err(Error::InvalidOperation(format!(
                "{what} does not match type of column '{column}' in index '{}'",
                self.name
            )))
        };
        match predicate {
            Predicate::Equals(value) => {
                if !value.matches_type(ty) {
                    return mismatch("equality value");
                }
            }
            Predicate::Range { lower, upper } => {
                for bound in [lower, upper] {
                    if let Bound::Included(v) | Bound::Excluded(v) = bound {
                        if !v.matches_type(ty) {
                            return mismatch("range bound");
                        }
                    }
                }
            }
            Predicate::Prefix(_) => {
                if ty != IndexedType::Text {
                    return mismatch("prefix predicate");
                }
            }
        }
        Ok(())
    }
}

/// Inverted or degenerate bounds would panic `BTreeMap::range`
fn range_is_empty(lower: &Bound<IndexValue>, upper: &Bound<IndexValue>) -> bool {
    use Bound::{Excluded, Included};
    match (lower, upper) {
        (Included(lo), Included(hi)) => lo > hi,
        (Included(lo), Excluded(hi)) | (Excluded(lo), Included(hi)) | (Excluded(lo), Excluded(hi)) => {
            lo >= hi
        }
        _ => false,
    }
}

impl Extension for SecondaryIndex {
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
                self.place(&mut state, &key, &vr.record);
            }
        }
        Ok(())
    }

    fn apply(&self, changes: &ChangeSet, _reader: &dyn StoreReader) -> Result<()> {
        let mut state = self.state.write();
        for change in &changes.changes {
            match change {
                Change::Put { key, record } => {
                    if self.collection_allowed(&key.collection) {
                        self.place(&mut state, key, record);
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

impl std::fmt::Debug for SecondaryIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecondaryIndex")
            .field("name", &self.name)
            .field("columns", &self.setup.columns().len())
            .field("rows", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tessera_core::Value;
    use tessera_storage::ShardedStore;

    fn person(name: &str, age: i64, department: &str) -> Record {
        let mut obj = std::collections::HashMap::new();
        obj.insert("name".to_string(), Value::from(name));
        obj.insert("age".to_string(), Value::Int(age));
        obj.insert("department".to_string(), Value::from(department));
        Record::value_only(Value::Object(obj))
    }

    fn people_index() -> SecondaryIndex {
        let setup = IndexSetup::new()
            .column("name", IndexedType::Text)
            .unwrap()
            .column("age", IndexedType::Integer)
            .unwrap()
            .column("department", IndexedType::Text)
            .unwrap();
        let indexer = Indexer::by_value(|_, v| {
            let mut row = IndexRow::new();
            row.insert("name".into(), IndexValue::text(v.get("name")?.as_str()?));
            row.insert("age".into(), IndexValue::Integer(v.get("age")?.as_int()?));
            row.insert(
                "department".into(),
                IndexValue::text(v.get("department")?.as_str()?),
            );
            Some(row)
        });
        SecondaryIndex::new("people_idx", setup, indexer).with_collections(["people"])
    }

    fn commit(store: &Arc<ShardedStore>, index: &SecondaryIndex, changes: Vec<Change>) {
        let cs = ChangeSet::new(store.version() + 1, changes);
        store.apply_changeset(&cs);
        index.apply(&cs, &store.snapshot()).unwrap();
    }

    fn put(key: &str, age: i64, department: &str) -> Change {
        Change::Put {
            key: ItemKey::new("people", key),
            record: person(key, age, department),
        }
    }

    #[test]
    fn test_equals_query() {
        let store = Arc::new(ShardedStore::new());
        let index = people_index();
        commit(
            &store,
            &index,
            vec![put("alice", 30, "ops"), put("bob", 45, "eng"), put("carol", 30, "eng")],
        );

        let keys = index.find(&IndexQuery::new().equals("age", 30i64)).unwrap();
        let names: Vec<_> = keys.iter().map(|k| k.key.as_str()).collect();
        assert_eq!(names, vec!["alice", "carol"]);
    }

    #[test]
    fn test_conjunction_intersects() {
        let store = Arc::new(ShardedStore::new());
        let index = people_index();
        commit(
            &store,
            &index,
            vec![put("alice", 30, "ops"), put("bob", 45, "eng"), put("carol", 30, "eng")],
        );

        let query = IndexQuery::new().equals("age", 30i64).equals("department", "eng");
        let keys = index.find(&query).unwrap();
        assert_eq!(keys, vec![ItemKey::new("people", "carol")]);
    }

    #[test]
    fn test_range_and_count() {
        let store = Arc::new(ShardedStore::new());
        let index = people_index();
        commit(
            &store,
            &index,
            vec![put("alice", 30, "ops"), put("bob", 45, "eng"), put("carol", 62, "eng")],
        );

        assert_eq!(index.count(&IndexQuery::new().between("age", 30i64, 50i64)).unwrap(), 2);
        assert_eq!(index.count(&IndexQuery::new().at_least("age", 46i64)).unwrap(), 1);
    }

    #[test]
    fn test_prefix_query() {
        let store = Arc::new(ShardedStore::new());
        let index = people_index();
        commit(
            &store,
            &index,
            vec![put("alice", 30, "ops"), put("albert", 45, "eng"), put("bob", 30, "eng")],
        );

        let keys = index.find(&IndexQuery::new().prefix("name", "al")).unwrap();
        assert_eq!(keys.len(), 2);
    }

    #[test]
    fn test_update_reindexes() {
        let store = Arc::new(ShardedStore::new());
        let index = people_index();
        commit(&store, &index, vec![put("alice", 30, "ops")]);
        commit(&store, &index, vec![put("alice", 31, "ops")]);

        assert_eq!(index.count(&IndexQuery::new().equals("age", 30i64)).unwrap(), 0);
        assert_eq!(index.count(&IndexQuery::new().equals("age", 31i64)).unwrap(), 1);
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn test_remove_unindexes() {
        let store = Arc::new(ShardedStore::new());
        let index = people_index();
        commit(&store, &index, vec![put("alice", 30, "ops")]);
        commit(
            &store,
            &index,
            vec![Change::Remove { key: ItemKey::new("people", "alice") }],
        );

        assert!(index.is_empty());
        assert_eq!(index.count(&IndexQuery::new().equals("age", 30i64)).unwrap(), 0);
    }

    #[test]
    fn test_unqueryable_column_is_error() {
        let index = people_index();
        let err = index.find(&IndexQuery::new().equals("salary", 1i64)).unwrap_err();
        assert!(matches!(err, Error::InvalidOperation(_)));

        let err = index.find(&IndexQuery::new().equals("age", "thirty")).unwrap_err();
        assert!(matches!(err, Error::InvalidOperation(_)));

        let err = index.find(&IndexQuery::new().prefix("age", "3")).unwrap_err();
        assert!(matches!(err, Error::InvalidOperation(_)));
    }

    #[test]
    fn test_empty_query_is_error() {
        let index = people_index();
        assert!(index.find(&IndexQuery::new()).is_err());
    }

    #[test]
    fn test_bad_row_skips_record_not_commit() {
        let setup = IndexSetup::new().column("age", IndexedType::Integer).unwrap();
        // Misdeclared handler: produces a text cell for an integer column
        let indexer = Indexer::by_value(|_, v| {
            let mut row = IndexRow::new();
            row.insert("age".into(), IndexValue::text(format!("{v:?}")));
            Some(row)
        });
        let index = SecondaryIndex::new("bad", setup, indexer);

        let store = Arc::new(ShardedStore::new());
        let cs = ChangeSet::new(
            1,
            vec![Change::Put {
                key: ItemKey::new("people", "a"),
                record: Record::value_only(Value::Int(1)),
            }],
        );
        store.apply_changeset(&cs);
        index.apply(&cs, &store.snapshot()).unwrap();

        assert!(index.is_empty());
    }

    #[test]
    fn test_handler_none_excludes_record() {
        let setup = IndexSetup::new().column("age", IndexedType::Integer).unwrap();
        let indexer = Indexer::by_value(|_, v| {
            let age = v.get("age")?.as_int()?;
            let mut row = IndexRow::new();
            row.insert("age".into(), IndexValue::Integer(age));
            Some(row)
        });
        let index = SecondaryIndex::new("ages", setup, indexer);

        let store = Arc::new(ShardedStore::new());
        let cs = ChangeSet::new(
            1,
            vec![Change::Put {
                key: ItemKey::new("people", "no_age"),
                record: Record::value_only(Value::Null),
            }],
        );
        store.apply_changeset(&cs);
        index.apply(&cs, &store.snapshot()).unwrap();

        assert!(index.is_empty());
    }

    #[test]
    fn test_repopulate_matches_incremental() {
        let store = Arc::new(ShardedStore::new());
        let incremental = people_index();
        commit(&store, &incremental, vec![put("alice", 30, "ops"), put("bob", 45, "eng")]);
        commit(&store, &incremental, vec![put("alice", 31, "ops")]);

        let rebuilt = people_index();
        rebuilt.repopulate(&store.snapshot()).unwrap();

        let query = IndexQuery::new().at_least("age", 0i64);
        assert_eq!(rebuilt.find(&query).unwrap(), incremental.find(&query).unwrap());
    }
}
