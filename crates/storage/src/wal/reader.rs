//! WAL reader
//!
//! Reads the whole file into memory and parses records sequentially,
//! verifying each CRC. A truncated frame or a checksum mismatch on the final
//! record ends iteration with a warning instead of an error: that is the
//! expected shape of a crash mid-append, and everything before it is still
//! good. A bad frame with records after it is not a torn append; that is
//! damage to the log body and reads as `Error::Corruption`.

use byteorder::{ByteOrder, LittleEndian};
use std::fs;
use std::path::Path;
use tessera_core::{Error, Result};
use tracing::warn;
use uuid::Uuid;

use super::{WalRecord, FRAME_HEADER_LEN, MAX_RECORD_LEN, WAL_FORMAT_VERSION, WAL_HEADER_LEN, WAL_MAGIC};

/// Reads records back out of a WAL file
pub struct WalReader {
    buffer: Vec<u8>,
    offset: usize,
    database_id: Uuid,
}

impl WalReader {
    /// Open a WAL file and validate its header
    pub fn open(path: &Path) -> Result<Self> {
        let buffer = fs::read(path)?;

        if buffer.len() < WAL_HEADER_LEN {
            return Err(Error::Corruption(format!(
                "WAL file too short for header: {} bytes",
                buffer.len()
            )));
        }
        if &buffer[0..4] != WAL_MAGIC {
            return Err(Error::Corruption("bad WAL magic".to_string()));
        }
        let format = LittleEndian::read_u32(&buffer[4..8]);
        if format != WAL_FORMAT_VERSION {
            return Err(Error::Corruption(format!(
                "unsupported WAL format version {}",
                format
            )));
        }
        let database_id = Uuid::from_slice(&buffer[8..24])
            .map_err(|e| Error::Corruption(format!("bad database id in WAL header: {}", e)))?;

        Ok(WalReader {
            buffer,
            offset: WAL_HEADER_LEN,
            database_id,
        })
    }

    /// Database id from the file header
    pub fn database_id(&self) -> Uuid {
        self.database_id
    }

    /// Read the next record, or None at end of valid data
    pub fn next_record(&mut self) -> Result<Option<WalRecord>> {
        let remaining = &self.buffer[self.offset..];
        if remaining.is_empty() {
            return Ok(None);
        }

        if remaining.len() < FRAME_HEADER_LEN {
            warn!(
                offset = self.offset,
                trailing = remaining.len(),
                "torn WAL frame header at tail, stopping replay"
            );
            self.offset = self.buffer.len();
            return Ok(None);
        }

        let len = LittleEndian::read_u32(&remaining[0..4]);
        let crc = LittleEndian::read_u32(&remaining[4..8]);

        if len > MAX_RECORD_LEN {
            // The length prefix is laid down before the body, so a torn
            // append leaves a short body rather than a garbled length.
            return Err(Error::Corruption(format!(
                "implausible WAL record length {} at offset {}",
                len, self.offset
            )));
        }

        let body_end = FRAME_HEADER_LEN + len as usize;
        if remaining.len() < body_end {
            warn!(
                offset = self.offset,
                expected = body_end,
                available = remaining.len(),
                "torn WAL record at tail, stopping replay"
            );
            self.offset = self.buffer.len();
            return Ok(None);
        }

        let payload = &remaining[FRAME_HEADER_LEN..body_end];
        if crc32fast::hash(payload) != crc {
            if remaining.len() == body_end {
                // Bad checksum on the very last record: a crash mid-append.
                warn!(
                    offset = self.offset,
                    "checksum mismatch on final WAL record, stopping replay"
                );
                self.offset = self.buffer.len();
                return Ok(None);
            }
            // Records follow this frame, so the log was damaged in place.
            return Err(Error::Corruption(format!(
                "WAL record checksum mismatch at offset {}",
                self.offset
            )));
        }

        let record: WalRecord = bincode::deserialize(payload).map_err(|e| {
            // CRC was valid but the payload does not parse: format mismatch,
            // not a torn write.
            Error::Corruption(format!("undecodable WAL record at {}: {}", self.offset, e))
        })?;

        self.offset += body_end;
        Ok(Some(record))
    }

    /// Read every valid record
    pub fn read_all(&mut self) -> Result<Vec<WalRecord>> {
        let mut records = Vec::new();
        while let Some(record) = self.next_record()? {
            records.push(record);
        }
        Ok(records)
    }
}

impl std::fmt::Debug for WalReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WalReader")
            .field("database_id", &self.database_id)
            .field("offset", &self.offset)
            .field("len", &self.buffer.len())
            .finish()
    }
}
