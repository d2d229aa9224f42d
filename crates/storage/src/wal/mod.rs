//! Write-ahead log
//!
//! Every disk-backed database appends committed transactions to a single WAL
//! file before applying them to the in-memory store. On open, recovery
//! replays the log to rebuild storage state.
//!
//! ## File layout
//!
//! ```text
//! header:  magic "TSRA" | format version u32 LE | database uuid (16 bytes)
//! records: [ len u32 LE | crc32 u32 LE | bincode payload ] *
//! ```
//!
//! The CRC covers the payload bytes only. A torn record at the tail (from a
//! crash mid-append) terminates replay cleanly; everything before it is kept.
//! A bad record with valid records after it cannot be a torn append and is
//! reported as corruption.

mod reader;
mod writer;

pub use reader::WalReader;
pub use writer::WalWriter;

use serde::{Deserialize, Serialize};
use tessera_core::Record;

/// Magic bytes at the start of every WAL file
pub const WAL_MAGIC: &[u8; 4] = b"TSRA";

/// Current WAL format version
pub const WAL_FORMAT_VERSION: u32 = 1;

/// Size of the fixed file header in bytes
pub const WAL_HEADER_LEN: usize = 4 + 4 + 16;

/// Size of each record frame header (length + crc) in bytes
pub const FRAME_HEADER_LEN: usize = 8;

/// Largest accepted record payload; anything bigger is treated as corruption
pub const MAX_RECORD_LEN: u32 = 64 * 1024 * 1024;

/// When the WAL writer syncs to disk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyncMode {
    /// Never fsync; the OS decides when data hits disk
    Never,
    /// fsync after every Commit record (the durability point)
    #[default]
    OnCommit,
}

/// One logical WAL record
///
/// A transaction appears as `Begin`, its operations, then `Commit`. Recovery
/// only applies operations bracketed by a matching Begin/Commit pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum WalRecord {
    /// Transaction start
    Begin {
        /// Transaction id, unique within one WAL file
        txn_id: u64,
    },
    /// A record write
    Put {
        /// Collection written to
        collection: String,
        /// Key within the collection
        key: String,
        /// The record as written
        record: Record,
    },
    /// A single-key removal
    Remove {
        /// Collection removed from
        collection: String,
        /// Key that was removed
        key: String,
    },
    /// A whole-collection removal
    RemoveCollection {
        /// Collection that was cleared
        collection: String,
    },
    /// Removal of every record in the database
    RemoveAll,
    /// Transaction commit (the durability point)
    Commit {
        /// Transaction id matching the Begin
        txn_id: u64,
        /// Commit version the operations were applied at
        version: u64,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wal::{WalReader, WalWriter};
    use tessera_core::Value;
    use uuid::Uuid;

    #[test]
    fn test_record_roundtrip_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.wal");
        let db_id = Uuid::new_v4();

        let records = vec![
            WalRecord::Begin { txn_id: 1 },
            WalRecord::Put {
                collection: "people".to_string(),
                key: "alice".to_string(),
                record: Record::value_only(Value::Int(30)),
            },
            WalRecord::Remove {
                collection: "people".to_string(),
                key: "bob".to_string(),
            },
            WalRecord::Commit { txn_id: 1, version: 1 },
        ];

        let mut writer = WalWriter::create(&path, db_id, SyncMode::OnCommit).unwrap();
        for r in &records {
            writer.append(r).unwrap();
        }
        drop(writer);

        let mut reader = WalReader::open(&path).unwrap();
        assert_eq!(reader.database_id(), db_id);
        let read = reader.read_all().unwrap();
        assert_eq!(read, records);
    }

    #[test]
    fn test_reopen_for_append() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.wal");
        let db_id = Uuid::new_v4();

        {
            let mut writer = WalWriter::create(&path, db_id, SyncMode::Never).unwrap();
            writer.append(&WalRecord::Begin { txn_id: 1 }).unwrap();
            writer
                .append(&WalRecord::Commit { txn_id: 1, version: 1 })
                .unwrap();
        }
        {
            let mut writer = WalWriter::open_append(&path, SyncMode::Never).unwrap();
            writer.append(&WalRecord::Begin { txn_id: 2 }).unwrap();
            writer
                .append(&WalRecord::Commit { txn_id: 2, version: 2 })
                .unwrap();
        }

        let mut reader = WalReader::open(&path).unwrap();
        let read = reader.read_all().unwrap();
        assert_eq!(read.len(), 4);
        assert_eq!(read[3], WalRecord::Commit { txn_id: 2, version: 2 });
    }

    #[test]
    fn test_torn_tail_is_ignored() {
        use std::io::Write;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.wal");
        let db_id = Uuid::new_v4();

        {
            let mut writer = WalWriter::create(&path, db_id, SyncMode::Never).unwrap();
            writer.append(&WalRecord::Begin { txn_id: 1 }).unwrap();
            writer
                .append(&WalRecord::Commit { txn_id: 1, version: 1 })
                .unwrap();
        }

        // Simulate a crash mid-append: a frame header claiming more bytes
        // than the file holds.
        let mut file = std::fs::OpenOptions::new().append(true).open(&path).unwrap();
        file.write_all(&[0xFF, 0x00, 0x00, 0x00, 0xAA, 0xBB]).unwrap();

        let mut reader = WalReader::open(&path).unwrap();
        let read = reader.read_all().unwrap();
        assert_eq!(read.len(), 2);
    }

    #[test]
    fn test_corrupt_crc_stops_replay() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.wal");
        let db_id = Uuid::new_v4();

        {
            let mut writer = WalWriter::create(&path, db_id, SyncMode::Never).unwrap();
            writer.append(&WalRecord::Begin { txn_id: 1 }).unwrap();
            writer
                .append(&WalRecord::Commit { txn_id: 1, version: 1 })
                .unwrap();
        }

        // Flip a byte inside the last record's payload
        let mut bytes = std::fs::read(&path).unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0xFF;
        std::fs::write(&path, &bytes).unwrap();

        let mut reader = WalReader::open(&path).unwrap();
        let read = reader.read_all().unwrap();
        // Replay keeps everything before the corrupt record
        assert_eq!(read, vec![WalRecord::Begin { txn_id: 1 }]);
    }

    #[test]
    fn test_mid_file_corruption_is_error() {
        use tessera_core::Error;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.wal");
        let db_id = Uuid::new_v4();

        {
            let mut writer = WalWriter::create(&path, db_id, SyncMode::Never).unwrap();
            writer.append(&WalRecord::Begin { txn_id: 1 }).unwrap();
            writer
                .append(&WalRecord::Commit { txn_id: 1, version: 1 })
                .unwrap();
            writer.append(&WalRecord::Begin { txn_id: 2 }).unwrap();
            writer
                .append(&WalRecord::Commit { txn_id: 2, version: 2 })
                .unwrap();
        }

        // Flip a byte inside the first record's payload. Valid records
        // follow, so this is damage in place, not a torn tail.
        let mut bytes = std::fs::read(&path).unwrap();
        bytes[WAL_HEADER_LEN + FRAME_HEADER_LEN] ^= 0xFF;
        std::fs::write(&path, &bytes).unwrap();

        let mut reader = WalReader::open(&path).unwrap();
        let err = reader.read_all().unwrap_err();
        assert!(matches!(err, Error::Corruption(_)));
    }

    #[test]
    fn test_bad_magic_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.wal");
        std::fs::write(&path, b"NOTAWALFILE_____________").unwrap();

        assert!(WalReader::open(&path).is_err());
    }
}
