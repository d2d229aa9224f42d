//! Core types for tesseradb
//!
//! This crate defines the shared vocabulary of the engine: values, keys,
//! records, change sets, errors, and the traits that connect the storage
//! layer to registered extensions. It has no knowledge of storage layout,
//! transactions, or any concrete extension.

pub mod changeset;
pub mod error;
pub mod json;
pub mod key;
pub mod limits;
pub mod record;
pub mod traits;
pub mod value;

pub use changeset::{Change, ChangeSet};
pub use error::{Error, Result};
pub use key::{validate_item_key, ItemKey, KeyError};
pub use limits::Limits;
pub use record::{Record, Timestamp, VersionedRecord};
pub use traits::{Extension, StoreReader};
pub use value::Value;
