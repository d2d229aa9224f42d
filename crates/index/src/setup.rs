//! Index declarations and row extractors
//!
//! `IndexSetup` is the schema of a secondary index: an ordered list of named,
//! typed columns. `Indexer` is the closure that turns a stored record into an
//! index row (a map of column name to cell), or `None` when the record should
//! not be indexed at all. Missing columns in a returned row are allowed; the
//! key simply does not appear in those columns' trees.

use std::collections::HashMap;
use std::sync::Arc;
use tessera_core::{Error, ItemKey, Record, Result, Value};

use crate::column::{IndexColumn, IndexValue, IndexedType};

/// Ordered, typed column declaration for a secondary index
#[derive(Debug, Clone, Default)]
pub struct IndexSetup {
    columns: Vec<IndexColumn>,
}

impl IndexSetup {
    pub fn new() -> Self {
        IndexSetup::default()
    }

    /// Append a column; duplicate names are rejected
    pub fn column(mut self, name: impl Into<String>, ty: IndexedType) -> Result<Self> {
        let name = name.into();
        if self.columns.iter().any(|c| c.name == name) {
            return Err(Error::InvalidOperation(format!(
                "duplicate index column '{name}'"
            )));
        }
        self.columns.push(IndexColumn { name, ty });
        Ok(self)
    }

    pub fn columns(&self) -> &[IndexColumn] {
        &self.columns
    }

    pub fn column_type(&self, name: &str) -> Option<IndexedType> {
        self.columns.iter().find(|c| c.name == name).map(|c| c.ty)
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// One record's index cells, keyed by column name
pub type IndexRow = HashMap<String, IndexValue>;

type IndexFn = dyn Fn(&ItemKey, &Record) -> Option<IndexRow> + Send + Sync;

/// Extracts an index row from a record
///
/// Returning `None` leaves the record out of the index entirely.
#[derive(Clone)]
pub struct Indexer {
    f: Arc<IndexFn>,
}

impl Indexer {
    /// Extract from the record's value
    pub fn by_value<F>(f: F) -> Self
    where
        F: Fn(&ItemKey, &Value) -> Option<IndexRow> + Send + Sync + 'static,
    {
        Indexer {
            f: Arc::new(move |key, record| f(key, &record.value)),
        }
    }

    /// Extract from the record's metadata
    pub fn by_metadata<F>(f: F) -> Self
    where
        F: Fn(&ItemKey, Option<&Value>) -> Option<IndexRow> + Send + Sync + 'static,
    {
        Indexer {
            f: Arc::new(move |key, record| f(key, record.metadata.as_ref())),
        }
    }

    /// Extract from the whole record
    pub fn by_record<F>(f: F) -> Self
    where
        F: Fn(&ItemKey, &Record) -> Option<IndexRow> + Send + Sync + 'static,
    {
        Indexer { f: Arc::new(f) }
    }

    pub fn extract(&self, key: &ItemKey, record: &Record) -> Option<IndexRow> {
        (self.f)(key, record)
    }
}

impl std::fmt::Debug for Indexer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Indexer")
    }
}
