//! Storage layer for tesseradb
//!
//! An in-memory sharded MVCC store plus the write-ahead log that makes it
//! durable. The engine crate wires the two together: commits append to the
//! WAL first, then apply to the store; recovery replays the WAL on open.

pub mod recovery;
pub mod sharded;
pub mod stored_entry;
pub mod wal;

pub use recovery::{recover, RecoveryReport};
pub use sharded::{ShardedStore, StoreSnapshot, VersionChain};
pub use stored_entry::StoredEntry;
pub use wal::{SyncMode, WalReader, WalRecord, WalWriter};
