//! Transactions for tesseradb
//!
//! The concurrency model is single-writer, many-readers: read transactions
//! are O(1) snapshots that never block, and write transactions are
//! serialized by the engine's writer lock. MVCC version chains in storage
//! keep open read transactions consistent across later commits.

pub mod commit;
pub mod read;
pub mod write;

pub use commit::commit;
pub use read::ReadTransaction;
pub use write::WriteTransaction;
