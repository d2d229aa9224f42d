//! Database configuration

use std::path::PathBuf;
use tessera_core::Limits;
use tessera_storage::SyncMode;

/// How a database is opened
///
/// A config without a path describes an ephemeral database: purely in
/// memory, no WAL, nothing survives the process.
#[derive(Debug, Clone, Default)]
pub struct DatabaseConfig {
    pub path: Option<PathBuf>,
    pub sync_mode: SyncMode,
    pub limits: Limits,
}

impl DatabaseConfig {
    /// Durable database rooted at a directory
    pub fn at(path: impl Into<PathBuf>) -> Self {
        DatabaseConfig {
            path: Some(path.into()),
            ..DatabaseConfig::default()
        }
    }

    /// In-memory database with no WAL
    pub fn ephemeral() -> Self {
        DatabaseConfig::default()
    }

    pub fn sync_mode(mut self, sync_mode: SyncMode) -> Self {
        self.sync_mode = sync_mode;
        self
    }

    pub fn limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }
}
