//! Secondary indexing for tesseradb
//!
//! An index declares typed columns, extracts a row per record through a
//! handler closure, and answers typed conjunction queries (equality, ranges,
//! text prefixes) with sorted key lists.

pub mod column;
pub mod index;
pub mod query;
pub mod setup;

pub use column::{IndexColumn, IndexValue, IndexedType};
pub use index::SecondaryIndex;
pub use query::{IndexQuery, Predicate};
pub use setup::{IndexRow, IndexSetup, Indexer};
