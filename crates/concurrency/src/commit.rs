//! Commit protocol
//!
//! Commit order, for one transaction at a time (the engine holds the writer
//! lock across the whole sequence):
//!
//! 1. Allocate the commit version: current global version + 1. The global
//!    counter itself is only advanced when the change set is applied, so
//!    snapshots taken mid-commit never read a version with unapplied data.
//! 2. Append Begin, the operations, and Commit to the WAL. The Commit
//!    append is the durability point; a failure here aborts the transaction
//!    with nothing applied.
//! 3. Apply the change set to the store at the commit version.
//!
//! Ephemeral databases have no WAL; step 2 is skipped.

use tessera_core::{Change, ChangeSet, Result};
use tessera_storage::{ShardedStore, WalRecord, WalWriter};
use tracing::trace;

/// Commit buffered operations, returning the applied change set
///
/// `wal` is None for ephemeral databases. The returned change set is what
/// the engine feeds to registered extensions.
pub fn commit(
    ops: Vec<Change>,
    store: &ShardedStore,
    wal: Option<&mut WalWriter>,
    txn_id: u64,
) -> Result<ChangeSet> {
    let version = store.version() + 1;
    let changeset = ChangeSet::new(version, ops);

    if let Some(wal) = wal {
        wal.append(&WalRecord::Begin { txn_id })?;
        for change in &changeset.changes {
            wal.append(&to_wal_record(change))?;
        }
        // Durability point
        wal.append(&WalRecord::Commit { txn_id, version })?;
    }

    store.apply_changeset(&changeset);
    trace!(txn_id, version, ops = changeset.len(), "transaction committed");

    Ok(changeset)
}

fn to_wal_record(change: &Change) -> WalRecord {
    match change {
        Change::Put { key, record } => WalRecord::Put {
            collection: key.collection.clone(),
            key: key.key.clone(),
            record: record.clone(),
        },
        Change::Remove { key } => WalRecord::Remove {
            collection: key.collection.clone(),
            key: key.key.clone(),
        },
        Change::RemoveCollection { collection } => WalRecord::RemoveCollection {
            collection: collection.clone(),
        },
        Change::RemoveAll => WalRecord::RemoveAll,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tessera_core::{ItemKey, Record, Value};
    use tessera_storage::{recover, SyncMode};
    use uuid::Uuid;

    fn put(collection: &str, key: &str, v: i64) -> Change {
        Change::Put {
            key: ItemKey::new(collection, key),
            record: Record::value_only(Value::Int(v)),
        }
    }

    #[test]
    fn test_commit_without_wal() {
        let store = Arc::new(ShardedStore::new());
        let cs = commit(vec![put("c", "k", 1)], &store, None, 1).unwrap();

        assert_eq!(cs.version, 1);
        assert_eq!(store.version(), 1);
        assert_eq!(store.get(&ItemKey::new("c", "k")).unwrap().value(), &Value::Int(1));
    }

    #[test]
    fn test_commit_versions_increase() {
        let store = Arc::new(ShardedStore::new());
        let a = commit(vec![put("c", "k", 1)], &store, None, 1).unwrap();
        let b = commit(vec![put("c", "k", 2)], &store, None, 2).unwrap();
        assert!(b.version > a.version);
    }

    #[test]
    fn test_committed_data_survives_recovery() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db.wal");
        let store = Arc::new(ShardedStore::new());

        {
            let mut wal = WalWriter::create(&path, Uuid::new_v4(), SyncMode::OnCommit).unwrap();
            commit(vec![put("c", "k1", 1)], &store, Some(&mut wal), 1).unwrap();
            commit(
                vec![put("c", "k2", 2), Change::Remove { key: ItemKey::new("c", "k1") }],
                &store,
                Some(&mut wal),
                2,
            )
            .unwrap();
        }

        let recovered = ShardedStore::new();
        let report = recover(&path, &recovered).unwrap();

        assert_eq!(report.committed_txns, 2);
        assert_eq!(recovered.version(), store.version());
        assert!(recovered.get(&ItemKey::new("c", "k1")).is_none());
        assert_eq!(
            recovered.get(&ItemKey::new("c", "k2")).unwrap().value(),
            &Value::Int(2)
        );
    }

    #[test]
    fn test_empty_commit_still_advances_version() {
        let store = Arc::new(ShardedStore::new());
        let cs = commit(vec![], &store, None, 1).unwrap();
        assert_eq!(cs.version, 1);
        assert!(cs.is_empty());
        assert_eq!(store.version(), 1);
    }
}
