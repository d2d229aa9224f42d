//! WAL writer
//!
//! Buffered appends with a crc32-framed record format. `SyncMode::OnCommit`
//! flushes and syncs the file whenever a Commit record is written, making
//! that record the transaction's durability point.

use byteorder::{LittleEndian, WriteBytesExt};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;
use tessera_core::{Error, Result};
use uuid::Uuid;

use super::{SyncMode, WalRecord, WAL_FORMAT_VERSION, WAL_MAGIC};

/// Appends records to a WAL file
pub struct WalWriter {
    writer: BufWriter<File>,
    sync_mode: SyncMode,
}

impl WalWriter {
    /// Create a new WAL file, writing the header
    ///
    /// Fails if the file already exists.
    pub fn create(path: &Path, database_id: Uuid, sync_mode: SyncMode) -> Result<Self> {
        let file = OpenOptions::new().write(true).create_new(true).open(path)?;
        let mut writer = BufWriter::new(file);

        writer.write_all(WAL_MAGIC)?;
        writer.write_u32::<LittleEndian>(WAL_FORMAT_VERSION)?;
        writer.write_all(database_id.as_bytes())?;
        writer.flush()?;

        Ok(WalWriter { writer, sync_mode })
    }

    /// Open an existing WAL file for appending
    pub fn open_append(path: &Path, sync_mode: SyncMode) -> Result<Self> {
        let file = OpenOptions::new().append(true).open(path)?;
        Ok(WalWriter {
            writer: BufWriter::new(file),
            sync_mode,
        })
    }

    /// Append one record
    ///
    /// Commit records are flushed (and synced, per the sync mode) before
    /// returning, so a returned `Ok` on a Commit means the transaction is
    /// durable.
    pub fn append(&mut self, record: &WalRecord) -> Result<()> {
        let payload = bincode::serialize(record)?;
        let crc = crc32fast::hash(&payload);

        self.writer.write_u32::<LittleEndian>(payload.len() as u32)?;
        self.writer.write_u32::<LittleEndian>(crc)?;
        self.writer.write_all(&payload)?;

        if matches!(record, WalRecord::Commit { .. }) {
            self.writer.flush()?;
            if self.sync_mode == SyncMode::OnCommit {
                self.writer
                    .get_ref()
                    .sync_data()
                    .map_err(Error::Io)?;
            }
        }

        Ok(())
    }

    /// Flush buffered records without syncing
    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

impl std::fmt::Debug for WalWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WalWriter")
            .field("sync_mode", &self.sync_mode)
            .finish()
    }
}
