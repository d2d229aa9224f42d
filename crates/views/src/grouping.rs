//! Grouping, sorting, and filtering closures
//!
//! These are the user-supplied blocks that define a view: how a record maps
//! to a group (or is excluded), how records are ordered within a group, and
//! which rows a filtered view keeps. Each comes in four flavors depending on
//! what the closure needs to see: the key alone, the value, the metadata, or
//! the whole record.

use std::cmp::Ordering;
use std::sync::Arc;
use tessera_core::{ItemKey, Record, Value};

type GroupFn = dyn Fn(&ItemKey, &Record) -> Option<String> + Send + Sync;
type SortFn = dyn Fn(&ItemKey, &Record, &ItemKey, &Record) -> Ordering + Send + Sync;
type FilterFn = dyn Fn(&ItemKey, &Record) -> bool + Send + Sync;

/// Maps each record to the group it belongs to
///
/// Returning `None` excludes the record from the view entirely.
#[derive(Clone)]
pub struct Grouping {
    f: Arc<GroupFn>,
}

impl Grouping {
    /// Group by key alone
    pub fn by_key<F>(f: F) -> Self
    where
        F: Fn(&ItemKey) -> Option<String> + Send + Sync + 'static,
    {
        Grouping {
            f: Arc::new(move |key, _| f(key)),
        }
    }

    /// Group by the record's value
    pub fn by_value<F>(f: F) -> Self
    where
        F: Fn(&ItemKey, &Value) -> Option<String> + Send + Sync + 'static,
    {
        Grouping {
            f: Arc::new(move |key, record| f(key, &record.value)),
        }
    }

    /// Group by the record's metadata
    pub fn by_metadata<F>(f: F) -> Self
    where
        F: Fn(&ItemKey, Option<&Value>) -> Option<String> + Send + Sync + 'static,
    {
        Grouping {
            f: Arc::new(move |key, record| f(key, record.metadata.as_ref())),
        }
    }

    /// Group by the whole record
    pub fn by_record<F>(f: F) -> Self
    where
        F: Fn(&ItemKey, &Record) -> Option<String> + Send + Sync + 'static,
    {
        Grouping { f: Arc::new(f) }
    }

    /// Every record in one group
    pub fn single_group(name: impl Into<String>) -> Self {
        let name = name.into();
        Grouping::by_key(move |_| Some(name.clone()))
    }

    /// Group each record by its collection name
    pub fn by_collection() -> Self {
        Grouping::by_key(|key| Some(key.collection.clone()))
    }

    /// Evaluate the grouping
    pub fn group(&self, key: &ItemKey, record: &Record) -> Option<String> {
        (self.f)(key, record)
    }
}

impl std::fmt::Debug for Grouping {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Grouping")
    }
}

/// Orders records within a group
#[derive(Clone)]
pub struct Sorting {
    f: Arc<SortFn>,
}

impl Sorting {
    /// Sort by key alone
    pub fn by_key<F>(f: F) -> Self
    where
        F: Fn(&ItemKey, &ItemKey) -> Ordering + Send + Sync + 'static,
    {
        Sorting {
            f: Arc::new(move |a_key, _, b_key, _| f(a_key, b_key)),
        }
    }

    /// Sort by the records' values
    pub fn by_value<F>(f: F) -> Self
    where
        F: Fn(&Value, &Value) -> Ordering + Send + Sync + 'static,
    {
        Sorting {
            f: Arc::new(move |_, a, _, b| f(&a.value, &b.value)),
        }
    }

    /// Sort by the records' metadata
    pub fn by_metadata<F>(f: F) -> Self
    where
        F: Fn(Option<&Value>, Option<&Value>) -> Ordering + Send + Sync + 'static,
    {
        Sorting {
            f: Arc::new(move |_, a, _, b| f(a.metadata.as_ref(), b.metadata.as_ref())),
        }
    }

    /// Sort by whole records
    pub fn by_record<F>(f: F) -> Self
    where
        F: Fn(&ItemKey, &Record, &ItemKey, &Record) -> Ordering + Send + Sync + 'static,
    {
        Sorting { f: Arc::new(f) }
    }

    /// Lexicographic key order
    pub fn key_order() -> Self {
        Sorting::by_key(|a, b| a.cmp(b))
    }

    /// Compare two rows; ties fall back to key order so positions are stable
    pub fn compare(&self, a_key: &ItemKey, a: &Record, b_key: &ItemKey, b: &Record) -> Ordering {
        (self.f)(a_key, a, b_key, b).then_with(|| a_key.cmp(b_key))
    }
}

impl std::fmt::Debug for Sorting {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Sorting")
    }
}

/// Decides which of a parent view's rows a filtered view keeps
#[derive(Clone)]
pub struct Filtering {
    f: Arc<FilterFn>,
}

impl Filtering {
    /// Filter by key alone
    pub fn by_key<F>(f: F) -> Self
    where
        F: Fn(&ItemKey) -> bool + Send + Sync + 'static,
    {
        Filtering {
            f: Arc::new(move |key, _| f(key)),
        }
    }

    /// Filter by the record's value
    pub fn by_value<F>(f: F) -> Self
    where
        F: Fn(&ItemKey, &Value) -> bool + Send + Sync + 'static,
    {
        Filtering {
            f: Arc::new(move |key, record| f(key, &record.value)),
        }
    }

    /// Filter by the record's metadata
    pub fn by_metadata<F>(f: F) -> Self
    where
        F: Fn(&ItemKey, Option<&Value>) -> bool + Send + Sync + 'static,
    {
        Filtering {
            f: Arc::new(move |key, record| f(key, record.metadata.as_ref())),
        }
    }

    /// Filter by the whole record
    pub fn by_record<F>(f: F) -> Self
    where
        F: Fn(&ItemKey, &Record) -> bool + Send + Sync + 'static,
    {
        Filtering { f: Arc::new(f) }
    }

    /// Keep every row
    pub fn pass_through() -> Self {
        Filtering::by_key(|_| true)
    }

    /// Evaluate the filter
    pub fn includes(&self, key: &ItemKey, record: &Record) -> bool {
        (self.f)(key, record)
    }
}

impl std::fmt::Debug for Filtering {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Filtering")
    }
}
