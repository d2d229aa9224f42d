//! Search-results views
//!
//! A `SearchResultsView` intersects a full-text search with a parent view:
//! it holds exactly the parent's rows that match the current query, in the
//! parent's groups and order. `perform_search` swaps the query; between
//! searches the view stays live, re-evaluating membership as commits land.
//!
//! Register the parent view and the full-text search before this extension
//! so both have already absorbed a commit by the time this view
//! re-materializes from them.

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tessera_core::{ChangeSet, Extension, ItemKey, Result, StoreReader};
use tessera_views::ViewHandle;

use crate::fts::{FullTextSearch, SearchMatch};
use crate::query::SearchQuery;

#[derive(Default)]
struct ResultState {
    groups: BTreeMap<String, Vec<ItemKey>>,
    placement: FxHashMap<ItemKey, String>,
}

/// Parent-view rows matching the current search query
pub struct SearchResultsView {
    name: String,
    fts: Arc<FullTextSearch>,
    parent: Arc<dyn ViewHandle>,
    query: RwLock<Option<SearchQuery>>,
    state: RwLock<ResultState>,
}

impl SearchResultsView {
    pub fn new(
        name: impl Into<String>,
        fts: Arc<FullTextSearch>,
        parent: Arc<dyn ViewHandle>,
    ) -> Self {
        SearchResultsView {
            name: name.into(),
            fts,
            parent,
            query: RwLock::new(None),
            state: RwLock::new(ResultState::default()),
        }
    }

    /// Run a new query and re-materialize; returns the raw scored matches
    ///
    /// The returned matches are score-ordered and unfiltered by the parent;
    /// the view itself keeps only keys the parent holds, in parent order.
    pub fn perform_search(&self, input: &str) -> Vec<SearchMatch> {
        let query = SearchQuery::parse(input);
        let matches = self.fts.execute(&query);
        *self.query.write() = Some(query);
        self.materialize(&matches);
        matches
    }

    /// The active query, if a search has been performed
    pub fn current_query(&self) -> Option<String> {
        self.query.read().as_ref().map(|q| q.to_string())
    }

    /// Drop the query and empty the view
    pub fn clear_search(&self) {
        *self.query.write() = None;
        let mut state = self.state.write();
        state.groups.clear();
        state.placement.clear();
    }

    fn materialize(&self, matches: &[SearchMatch]) {
        let matched: BTreeSet<&ItemKey> = matches.iter().map(|m| &m.key).collect();
        let mut state = self.state.write();
        state.groups.clear();
        state.placement.clear();
        for group in self.parent.groups() {
            let rows: Vec<ItemKey> = self
                .parent
                .keys_in_group(&group)
                .into_iter()
                .filter(|key| matched.contains(key))
                .collect();
            if rows.is_empty() {
                continue;
            }
            for key in &rows {
                state.placement.insert(key.clone(), group.clone());
            }
            state.groups.insert(group, rows);
        }
    }

    /// Re-run the active query against current data
    fn refresh(&self) {
        let matches = {
            let query = self.query.read();
            match query.as_ref() {
                Some(query) => self.fts.execute(query),
                None => return,
            }
        };
        self.materialize(&matches);
    }
}

impl Extension for SearchResultsView {
    fn name(&self) -> &str {
        &self.name
    }

    fn repopulate(&self, _reader: &dyn StoreReader) -> Result<()> {
        self.refresh();
        Ok(())
    }

    fn apply(&self, _changes: &ChangeSet, _reader: &dyn StoreReader) -> Result<()> {
        self.refresh();
        Ok(())
    }
}

impl ViewHandle for SearchResultsView {
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
        self.state.read().placement.len()
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

impl std::fmt::Debug for SearchResultsView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchResultsView")
            .field("name", &self.name)
            .field("query", &self.current_query())
            .field("len", &self.len())
            .finish()
    }
}
