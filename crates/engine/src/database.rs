//! The database engine
//!
//! `Database` wires the pieces together: the sharded MVCC store, the WAL,
//! the single-writer commit path, and the extension registry. Durable
//! databases replay their WAL before serving; ephemeral ones skip the WAL
//! entirely.
//!
//! ## Locking
//!
//! One writer lock serializes write transactions, extension registration,
//! and commit application. Extension repopulation runs under it so a
//! registration never interleaves with a commit. Readers never take it:
//! `read` works off an O(1) snapshot.

use parking_lot::{Mutex, RwLock};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tessera_concurrency::{commit, ReadTransaction, WriteTransaction};
use tessera_core::{Error, Extension, Limits, Result};
use tessera_storage::{recover, ShardedStore, WalWriter};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::DatabaseConfig;

/// Name of the WAL file inside the database directory
const WAL_FILE: &str = "tessera.wal";

/// State mutated only under the writer lock
struct Writer {
    wal: Option<WalWriter>,
    next_txn_id: u64,
}

/// A document database with registered extensions
pub struct Database {
    store: Arc<ShardedStore>,
    path: Option<PathBuf>,
    limits: Limits,
    writer: Mutex<Writer>,
    extensions: RwLock<Vec<Arc<dyn Extension>>>,
}

impl Database {
    /// Open a database; durable configs replay the WAL first
    pub fn open(config: DatabaseConfig) -> Result<Self> {
        let store = Arc::new(ShardedStore::new());

        let (wal, next_txn_id) = match &config.path {
            Some(dir) => {
                std::fs::create_dir_all(dir)?;
                let wal_path = dir.join(WAL_FILE);
                if wal_path.exists() {
                    let report = recover(&wal_path, &store)?;
                    info!(
                        path = %wal_path.display(),
                        committed_txns = report.committed_txns,
                        discarded_txns = report.discarded_txns,
                        final_version = report.final_version,
                        "recovery complete"
                    );
                    let wal = WalWriter::open_append(&wal_path, config.sync_mode)?;
                    (Some(wal), report.max_txn_id + 1)
                } else {
                    let wal = WalWriter::create(&wal_path, Uuid::new_v4(), config.sync_mode)?;
                    info!(path = %wal_path.display(), "created database");
                    (Some(wal), 1)
                }
            }
            None => (None, 1),
        };

        Ok(Database {
            store,
            path: config.path,
            limits: config.limits,
            writer: Mutex::new(Writer { wal, next_txn_id }),
            extensions: RwLock::new(Vec::new()),
        })
    }

    /// In-memory database with no WAL
    pub fn ephemeral() -> Self {
        Database {
            store: Arc::new(ShardedStore::new()),
            path: None,
            limits: Limits::default(),
            writer: Mutex::new(Writer { wal: None, next_txn_id: 1 }),
            extensions: RwLock::new(Vec::new()),
        }
    }

    /// Directory the database lives in; None for ephemeral databases
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Current committed version
    pub fn version(&self) -> u64 {
        self.store.version()
    }

    /// Number of live records
    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    // ------------------------------------------------------------------
    // Transactions
    // ------------------------------------------------------------------

    /// Run a read transaction against a snapshot of the current state
    pub fn read<R>(&self, f: impl FnOnce(&ReadTransaction) -> R) -> R {
        let txn = ReadTransaction::new(self.store.snapshot());
        f(&txn)
    }

    /// Run a write transaction
    ///
    /// The closure's operations are buffered; returning `Ok` commits them
    /// (WAL first, then the store, then every registered extension in
    /// registration order), returning `Err` discards them.
    pub fn write<R>(&self, f: impl FnOnce(&mut WriteTransaction) -> Result<R>) -> Result<R> {
        let mut writer = self.writer.lock();

        let mut txn = WriteTransaction::new(self.store.snapshot(), self.limits.clone());
        let result = f(&mut txn)?;

        let txn_id = writer.next_txn_id;
        writer.next_txn_id += 1;
        let changeset = commit(txn.into_ops(), &self.store, writer.wal.as_mut(), txn_id)?;

        let reader = self.store.snapshot();
        for extension in self.extensions.read().iter() {
            // Extension state is derived and rebuildable; a failure here
            // must not unwind an already-durable commit.
            if let Err(err) = extension.apply(&changeset, &reader) {
                warn!(extension = extension.name(), %err, "extension apply failed");
            }
        }

        Ok(result)
    }

    // ------------------------------------------------------------------
    // Extension registry
    // ------------------------------------------------------------------

    /// Register an extension under its name and repopulate it
    ///
    /// Holds the writer lock for the whole repopulate, so the extension sees
    /// a stable snapshot and misses no commit afterwards.
    pub fn register(&self, extension: Arc<dyn Extension>) -> Result<()> {
        let _writer = self.writer.lock();
        let mut extensions = self.extensions.write();
        if extensions.iter().any(|e| e.name() == extension.name()) {
            return Err(Error::ExtensionAlreadyRegistered(
                extension.name().to_string(),
            ));
        }
        extension.repopulate(&self.store.snapshot())?;
        debug!(extension = extension.name(), "extension registered");
        extensions.push(extension);
        Ok(())
    }

    /// Remove an extension from the registry
    pub fn unregister(&self, name: &str) -> Result<()> {
        let _writer = self.writer.lock();
        let mut extensions = self.extensions.write();
        let before = extensions.len();
        extensions.retain(|e| e.name() != name);
        if extensions.len() == before {
            return Err(Error::ExtensionNotRegistered(name.to_string()));
        }
        debug!(extension = name, "extension unregistered");
        Ok(())
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.extensions.read().iter().any(|e| e.name() == name)
    }

    /// Registered extension names, in registration order
    pub fn extension_names(&self) -> Vec<String> {
        self.extensions
            .read()
            .iter()
            .map(|e| e.name().to_string())
            .collect()
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("path", &self.path)
            .field("version", &self.version())
            .field("extensions", &self.extension_names())
            .finish()
    }
}
