//! Typed persistence over the document store
//!
//! `Persistable` pins a Rust type to a collection and a key; the free
//! functions shuttle values through serde_json into the store's `Value`
//! representation. Metadata rides alongside untyped.

use serde::de::DeserializeOwned;
use serde::Serialize;
use tessera_concurrency::{ReadTransaction, WriteTransaction};
use tessera_core::{Error, ItemKey, Result, Value};

/// A type with a fixed collection and a derivable key
pub trait Persistable {
    /// Collection all values of this type live in
    fn collection() -> &'static str;

    /// Key of this particular value within the collection
    fn key(&self) -> String;
}

/// Item key a persistable value is stored under
pub fn key_for<T: Persistable>(item: &T) -> ItemKey {
    ItemKey::new(T::collection(), item.key())
}

/// Serialize and store a value
pub fn save<T>(txn: &mut WriteTransaction, item: &T) -> Result<()>
where
    T: Persistable + Serialize,
{
    let value = Value::from(serde_json::to_value(item)?);
    txn.put_value(key_for(item), value)
}

/// Serialize and store a value with metadata
pub fn save_with_metadata<T>(txn: &mut WriteTransaction, item: &T, metadata: Value) -> Result<()>
where
    T: Persistable + Serialize,
{
    let value = Value::from(serde_json::to_value(item)?);
    txn.put(key_for(item), value, Some(metadata))
}

/// Load one value by key; `Ok(None)` when absent
pub fn load<T>(txn: &ReadTransaction, key: &str) -> Result<Option<T>>
where
    T: Persistable + DeserializeOwned,
{
    match txn.get_value(&ItemKey::new(T::collection(), key)) {
        Some(value) => Ok(Some(decode(value)?)),
        None => Ok(None),
    }
}

/// Load every value in the type's collection, in key order
pub fn load_all<T>(txn: &ReadTransaction) -> Result<Vec<T>>
where
    T: Persistable + DeserializeOwned,
{
    txn.scan_collection(T::collection())
        .into_iter()
        .map(|(_, vr)| decode(vr.record.value))
        .collect()
}

/// Remove a value by key
pub fn remove<T: Persistable>(txn: &mut WriteTransaction, key: &str) -> Result<()> {
    txn.remove(ItemKey::new(T::collection(), key))
}

fn decode<T: DeserializeOwned>(value: Value) -> Result<T> {
    serde_json::from_value(serde_json::Value::from(value))
        .map_err(|e| Error::Serialization(e.to_string()))
}
