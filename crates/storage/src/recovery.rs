//! Recovery: rebuild storage state from the WAL
//!
//! Replays the log, buffering each transaction's operations between its
//! Begin and Commit records. Only committed transactions are applied;
//! operations after the last Commit (a transaction the crash interrupted)
//! are discarded. The store's global version is restored to the highest
//! committed version.

use std::collections::HashMap;
use std::path::Path;
use tessera_core::{Change, ChangeSet, ItemKey, Result};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::sharded::ShardedStore;
use crate::wal::{WalReader, WalRecord};

/// Outcome of a WAL replay
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecoveryReport {
    /// Database id from the WAL header
    pub database_id: Uuid,
    /// Committed transactions applied
    pub committed_txns: usize,
    /// Transactions discarded for missing a Commit record
    pub discarded_txns: usize,
    /// Highest committed version seen
    pub final_version: u64,
    /// Highest transaction id seen (committed or not)
    pub max_txn_id: u64,
}

/// Replay a WAL file into a store
pub fn recover(path: &Path, store: &ShardedStore) -> Result<RecoveryReport> {
    let mut reader = WalReader::open(path)?;
    let database_id = reader.database_id();

    // Operations buffered per open transaction
    let mut pending: HashMap<u64, Vec<Change>> = HashMap::new();
    let mut current_txn: Option<u64> = None;

    let mut committed_txns = 0usize;
    let mut final_version = 0u64;
    let mut max_txn_id = 0u64;

    while let Some(record) = reader.next_record()? {
        match record {
            WalRecord::Begin { txn_id } => {
                max_txn_id = max_txn_id.max(txn_id);
                if let Some(open) = current_txn {
                    // A Begin without a preceding Commit means the earlier
                    // transaction never reached its durability point.
                    warn!(txn_id = open, "unterminated transaction in WAL, discarding");
                    pending.remove(&open);
                }
                pending.insert(txn_id, Vec::new());
                current_txn = Some(txn_id);
            }
            WalRecord::Put {
                collection,
                key,
                record,
            } => {
                if let Some(ops) = current_txn.and_then(|id| pending.get_mut(&id)) {
                    ops.push(Change::Put {
                        key: ItemKey::new(collection, key),
                        record,
                    });
                }
            }
            WalRecord::Remove { collection, key } => {
                if let Some(ops) = current_txn.and_then(|id| pending.get_mut(&id)) {
                    ops.push(Change::Remove {
                        key: ItemKey::new(collection, key),
                    });
                }
            }
            WalRecord::RemoveCollection { collection } => {
                if let Some(ops) = current_txn.and_then(|id| pending.get_mut(&id)) {
                    ops.push(Change::RemoveCollection { collection });
                }
            }
            WalRecord::RemoveAll => {
                if let Some(ops) = current_txn.and_then(|id| pending.get_mut(&id)) {
                    ops.push(Change::RemoveAll);
                }
            }
            WalRecord::Commit { txn_id, version } => {
                max_txn_id = max_txn_id.max(txn_id);
                if let Some(ops) = pending.remove(&txn_id) {
                    store.apply_changeset(&ChangeSet::new(version, ops));
                    committed_txns += 1;
                    final_version = final_version.max(version);
                } else {
                    warn!(txn_id, "Commit without matching Begin, ignoring");
                }
                if current_txn == Some(txn_id) {
                    current_txn = None;
                }
            }
        }
    }

    let discarded_txns = pending.len();
    for txn_id in pending.keys() {
        debug!(txn_id, "discarding uncommitted transaction from WAL tail");
    }

    store.set_version(final_version);

    Ok(RecoveryReport {
        database_id,
        committed_txns,
        discarded_txns,
        final_version,
        max_txn_id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wal::{SyncMode, WalWriter};
    use tessera_core::{Record, Value};

    fn write_txn(writer: &mut WalWriter, txn_id: u64, version: u64, puts: &[(&str, &str, i64)]) {
        writer.append(&WalRecord::Begin { txn_id }).unwrap();
        for (collection, key, v) in puts {
            writer
                .append(&WalRecord::Put {
                    collection: collection.to_string(),
                    key: key.to_string(),
                    record: Record::value_only(Value::Int(*v)),
                })
                .unwrap();
        }
        writer.append(&WalRecord::Commit { txn_id, version }).unwrap();
    }

    #[test]
    fn test_recover_committed_transactions() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db.wal");
        let db_id = Uuid::new_v4();

        {
            let mut writer = WalWriter::create(&path, db_id, SyncMode::Never).unwrap();
            write_txn(&mut writer, 1, 1, &[("people", "alice", 30)]);
            write_txn(&mut writer, 2, 2, &[("people", "bob", 25), ("cities", "rome", 1)]);
        }

        let store = ShardedStore::new();
        let report = recover(&path, &store).unwrap();

        assert_eq!(report.database_id, db_id);
        assert_eq!(report.committed_txns, 2);
        assert_eq!(report.discarded_txns, 0);
        assert_eq!(report.final_version, 2);
        assert_eq!(report.max_txn_id, 2);
        assert_eq!(store.version(), 2);
        assert_eq!(
            store.get(&ItemKey::new("people", "alice")).unwrap().value(),
            &Value::Int(30)
        );
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn test_uncommitted_tail_discarded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db.wal");

        {
            let mut writer = WalWriter::create(&path, Uuid::new_v4(), SyncMode::Never).unwrap();
            write_txn(&mut writer, 1, 1, &[("people", "alice", 30)]);
            // Crash before Commit
            writer.append(&WalRecord::Begin { txn_id: 2 }).unwrap();
            writer
                .append(&WalRecord::Put {
                    collection: "people".to_string(),
                    key: "ghost".to_string(),
                    record: Record::value_only(Value::Int(0)),
                })
                .unwrap();
            writer.flush().unwrap();
        }

        let store = ShardedStore::new();
        let report = recover(&path, &store).unwrap();

        assert_eq!(report.committed_txns, 1);
        assert_eq!(report.discarded_txns, 1);
        assert_eq!(report.final_version, 1);
        assert!(store.get(&ItemKey::new("people", "ghost")).is_none());
        assert!(store.get(&ItemKey::new("people", "alice")).is_some());
    }

    #[test]
    fn test_recover_removes_and_clears() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db.wal");

        {
            let mut writer = WalWriter::create(&path, Uuid::new_v4(), SyncMode::Never).unwrap();
            write_txn(&mut writer, 1, 1, &[("a", "k1", 1), ("a", "k2", 2), ("b", "k3", 3)]);

            writer.append(&WalRecord::Begin { txn_id: 2 }).unwrap();
            writer
                .append(&WalRecord::Remove {
                    collection: "a".to_string(),
                    key: "k1".to_string(),
                })
                .unwrap();
            writer
                .append(&WalRecord::RemoveCollection {
                    collection: "b".to_string(),
                })
                .unwrap();
            writer
                .append(&WalRecord::Commit { txn_id: 2, version: 2 })
                .unwrap();
        }

        let store = ShardedStore::new();
        recover(&path, &store).unwrap();

        assert!(store.get(&ItemKey::new("a", "k1")).is_none());
        assert!(store.get(&ItemKey::new("a", "k2")).is_some());
        assert!(store.get(&ItemKey::new("b", "k3")).is_none());
    }

    #[test]
    fn test_recovery_fails_on_mid_file_corruption() {
        use crate::wal::{FRAME_HEADER_LEN, WAL_HEADER_LEN};

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db.wal");

        {
            let mut writer = WalWriter::create(&path, Uuid::new_v4(), SyncMode::Never).unwrap();
            write_txn(&mut writer, 1, 1, &[("people", "alice", 30)]);
            write_txn(&mut writer, 2, 2, &[("people", "bob", 25)]);
            write_txn(&mut writer, 3, 3, &[("people", "carol", 41)]);
        }

        // Damage the first transaction's Begin record; the committed
        // transactions after it must not be silently dropped.
        let mut bytes = std::fs::read(&path).unwrap();
        bytes[WAL_HEADER_LEN + FRAME_HEADER_LEN] ^= 0xFF;
        std::fs::write(&path, &bytes).unwrap();

        let store = ShardedStore::new();
        let err = recover(&path, &store).unwrap_err();
        assert!(matches!(err, tessera_core::Error::Corruption(_)));
    }

    #[test]
    fn test_recover_empty_wal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db.wal");
        let db_id = Uuid::new_v4();
        WalWriter::create(&path, db_id, SyncMode::Never).unwrap();

        let store = ShardedStore::new();
        let report = recover(&path, &store).unwrap();
        assert_eq!(report.committed_txns, 0);
        assert_eq!(report.final_version, 0);
        assert!(store.is_empty());
    }
}
