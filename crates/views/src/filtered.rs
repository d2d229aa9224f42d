//! Filtered views
//!
//! A filtered view exposes the subset of a parent view's rows that pass a
//! filtering closure, preserving the parent's groups and row order. The
//! parent is any `ViewHandle`, so filtered views stack: a filtered view can
//! itself be the parent of another.
//!
//! The parent must be registered before the filtered view and is applied
//! first on every commit (the engine applies extensions in registration
//! order), so maintenance here can always trust the parent's current rows.
//!
//! The filter can be swapped at runtime with `set_filtering`, which
//! re-materializes the whole view against the new closure.

use parking_lot::RwLock;
use std::collections::HashSet;
use std::sync::Arc;
use tessera_core::{Change, ChangeSet, Extension, ItemKey, Result, StoreReader};
use tracing::warn;

use crate::grouping::Filtering;
use crate::handle::ViewHandle;
use crate::view::ViewState;

/// Subset of a parent view's rows, in parent order
pub struct FilteredView {
    name: String,
    parent: Arc<dyn ViewHandle>,
    filtering: RwLock<Filtering>,
    state: RwLock<ViewState>,
}

impl FilteredView {
    pub fn new(name: impl Into<String>, parent: Arc<dyn ViewHandle>, filtering: Filtering) -> Self {
        FilteredView {
            name: name.into(),
            parent,
            filtering: RwLock::new(filtering),
            state: RwLock::new(ViewState::default()),
        }
    }

    /// Name of the parent view
    pub fn parent_name(&self) -> &str {
        self.parent.view_name()
    }

    /// Replace the filter and re-materialize against current records
    pub fn set_filtering(&self, filtering: Filtering, reader: &dyn StoreReader) {
        *self.filtering.write() = filtering;
        let mut state = self.state.write();
        self.rebuild_all(&mut state, reader);
    }

    fn rebuild_all(&self, state: &mut ViewState, reader: &dyn StoreReader) {
        state.clear();
        for group in self.parent.groups() {
            self.rebuild_group(state, &group, reader);
        }
    }

    /// Re-derive one group's rows from the parent's current rows
    fn rebuild_group(&self, state: &mut ViewState, group: &str, reader: &dyn StoreReader) {
        if let Some(rows) = state.groups.remove(group) {
            for key in rows {
                state.placement.remove(&key);
            }
        }

        let filtering = self.filtering.read();
        let mut kept = Vec::new();
        for key in self.parent.keys_in_group(group) {
            match reader.get(&key) {
                Some(vr) => {
                    if filtering.includes(&key, &vr.record) {
                        kept.push(key);
                    }
                }
                None => {
                    warn!(key = %key, view = %self.name, "parent row has no backing record");
                }
            }
        }

        if !kept.is_empty() {
            for key in &kept {
                state.placement.insert(key.clone(), group.to_string());
            }
            state.groups.insert(group.to_string(), kept);
        }
    }
}

impl Extension for FilteredView {
    fn name(&self) -> &str {
        &self.name
    }

    fn repopulate(&self, reader: &dyn StoreReader) -> Result<()> {
        let mut state = self.state.write();
        self.rebuild_all(&mut state, reader);
        Ok(())
    }

    fn apply(&self, changes: &ChangeSet, reader: &dyn StoreReader) -> Result<()> {
        let mut state = self.state.write();

        // Collect the groups a key-level change can touch: where the key sat
        // in this view before, and where the parent has it now.
        let mut affected: HashSet<String> = HashSet::new();
        let mut full_rebuild = false;
        for change in &changes.changes {
            let key = match change {
                Change::Put { key, .. } => key,
                Change::Remove { key } => key,
                Change::RemoveCollection { .. } | Change::RemoveAll => {
                    full_rebuild = true;
                    break;
                }
            };
            if let Some(old_group) = state.placement.get(key) {
                affected.insert(old_group.clone());
            }
            if let Some((new_group, _)) = self.parent.index_of(key) {
                affected.insert(new_group);
            }
        }

        if full_rebuild {
            self.rebuild_all(&mut state, reader);
        } else {
            for group in affected {
                self.rebuild_group(&mut state, &group, reader);
            }
        }
        Ok(())
    }
}

impl ViewHandle for FilteredView {
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

impl std::fmt::Debug for FilteredView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FilteredView")
            .field("name", &self.name)
            .field("parent", &self.parent.view_name())
            .field("len", &self.len())
            .finish()
    }
}
