//! tesseradb: an embedded document database
//!
//! Records are `(collection, key) -> value + metadata` documents. On top of
//! plain storage sit registered extensions, maintained incrementally on
//! every commit:
//!
//! - views: records grouped and sorted by closures, with filtered views and
//!   section mappings
//! - secondary indexes: typed columns with equality, range, and prefix
//!   queries
//! - full-text search: BM25-scored term queries, plus search-results views
//!   that project matches through a parent view
//!
//! Durable databases write a WAL and recover it on open; ephemeral ones
//! live purely in memory.
//!
//! # Example
//!
//! ```
//! use tesseradb::{Database, ItemKey, Value};
//!
//! let db = Database::ephemeral();
//! db.write(|txn| txn.put_value(ItemKey::new("people", "alice"), Value::Int(34)))?;
//! let age = db.read(|txn| txn.get_value(&ItemKey::new("people", "alice")));
//! assert_eq!(age, Some(Value::Int(34)));
//! # Ok::<(), tesseradb::Error>(())
//! ```

pub mod persist;

pub use tessera_core::{
    Change, ChangeSet, Error, Extension, ItemKey, KeyError, Limits, Record, Result, StoreReader,
    Timestamp, Value, VersionedRecord,
};

pub use tessera_concurrency::{ReadTransaction, WriteTransaction};
pub use tessera_engine::{Database, DatabaseConfig};
pub use tessera_storage::SyncMode;

pub use tessera_views::{Filtering, FilteredView, Grouping, Mappings, Sorting, View, ViewHandle};

pub use tessera_index::{
    IndexColumn, IndexQuery, IndexRow, IndexSetup, IndexValue, IndexedType, Indexer,
    SecondaryIndex,
};

pub use tessera_search::{
    ColumnText, FullTextSearch, SearchMatch, SearchQuery, SearchQueue, SearchResultsView,
    TextHandler,
};

pub use persist::Persistable;
