//! Mappings: a stable section/row projection of a view
//!
//! A view's group set changes under it as commits land. `Mappings` freezes
//! that shape for a consumer (typically list UI): `update` snapshots section
//! names and row counts from a view, and the accessors answer against that
//! snapshot until the next `update`.
//!
//! Two flavors:
//! - fixed: an explicit ordered group list; sections persist even when the
//!   underlying group is empty or absent
//! - dynamic: sections are the view's non-empty groups, passed through a
//!   group filter and ordered by a group comparator (case-insensitive name
//!   order by default)

use std::cmp::Ordering;
use std::sync::Arc;

use crate::handle::ViewHandle;

type GroupFilter = dyn Fn(&str) -> bool + Send + Sync;
type GroupSort = dyn Fn(&str, &str) -> Ordering + Send + Sync;

enum Layout {
    Fixed(Vec<String>),
    Dynamic {
        filter: Arc<GroupFilter>,
        sort: Arc<GroupSort>,
    },
}

/// Snapshot of a view's sections and row counts
pub struct Mappings {
    layout: Layout,
    sections: Vec<(String, usize)>,
}

impl Mappings {
    /// Fixed sections in the given order, kept even when empty
    pub fn fixed<I, S>(groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Mappings {
            layout: Layout::Fixed(groups.into_iter().map(Into::into).collect()),
            sections: Vec::new(),
        }
    }

    /// Dynamic sections: every non-empty group, case-insensitive name order
    pub fn dynamic() -> Self {
        Mappings::dynamic_with(
            |_| true,
            |a, b| a.to_lowercase().cmp(&b.to_lowercase()),
        )
    }

    /// Dynamic sections with a custom group filter and order
    pub fn dynamic_with<F, S>(filter: F, sort: S) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
        S: Fn(&str, &str) -> Ordering + Send + Sync + 'static,
    {
        Mappings {
            layout: Layout::Dynamic {
                filter: Arc::new(filter),
                sort: Arc::new(sort),
            },
            sections: Vec::new(),
        }
    }

    /// Refresh the snapshot from the view's current state
    pub fn update(&mut self, view: &dyn ViewHandle) {
        self.sections = match &self.layout {
            Layout::Fixed(groups) => groups
                .iter()
                .map(|g| (g.clone(), view.len_of_group(g)))
                .collect(),
            Layout::Dynamic { filter, sort } => {
                let mut groups: Vec<String> =
                    view.groups().into_iter().filter(|g| filter(g)).collect();
                groups.sort_by(|a, b| sort(a, b));
                groups
                    .into_iter()
                    .map(|g| {
                        let count = view.len_of_group(&g);
                        (g, count)
                    })
                    .collect()
            }
        };
    }

    pub fn section_count(&self) -> usize {
        self.sections.len()
    }

    /// Group name backing a section
    pub fn group_for_section(&self, section: usize) -> Option<&str> {
        self.sections.get(section).map(|(g, _)| g.as_str())
    }

    /// Section index for a group, if mapped
    pub fn section_for_group(&self, group: &str) -> Option<usize> {
        self.sections.iter().position(|(g, _)| g == group)
    }

    /// Row count of a section as of the last update
    pub fn rows_in_section(&self, section: usize) -> usize {
        self.sections.get(section).map_or(0, |(_, n)| *n)
    }

    /// Total rows across all sections as of the last update
    pub fn total_rows(&self) -> usize {
        self.sections.iter().map(|(_, n)| n).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total_rows() == 0
    }

    /// Translate a (section, row) pair into the backing (group, index)
    pub fn group_and_index(&self, section: usize, row: usize) -> Option<(&str, usize)> {
        let (group, count) = self.sections.get(section)?;
        if row < *count {
            Some((group.as_str(), row))
        } else {
            None
        }
    }

    /// The key at a (section, row) position, resolved through the view
    pub fn key_at(
        &self,
        view: &dyn ViewHandle,
        section: usize,
        row: usize,
    ) -> Option<tessera_core::ItemKey> {
        let (group, index) = self.group_and_index(section, row)?;
        view.key_at(group, index)
    }
}

impl std::fmt::Debug for Mappings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mappings")
            .field("sections", &self.sections)
            .finish()
    }
}
