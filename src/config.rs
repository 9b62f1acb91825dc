//! Configuration for knowsql
//!
//! Centralized configuration with sensible defaults.

use std::path::PathBuf;

use crate::error::{KnowsqlError, Result};

/// Default TCP port
pub const DEFAULT_PORT: u16 = 6379;

/// Main configuration for a knowsql instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Root directory for all data files
    /// Internal structure:
    ///   {data_dir}/
    ///     └── wal.log          (write-ahead log)
    pub data_dir: PathBuf,

    // -------------------------------------------------------------------------
    // WAL Configuration
    // -------------------------------------------------------------------------
    /// Sync strategy: how often to fsync WAL
    pub wal_sync_strategy: WalSyncStrategy,

    /// Minimum number of log records before the WAL is rewritten as a snapshot
    pub compaction_threshold: u64,

    // -------------------------------------------------------------------------
    // Network Configuration
    // -------------------------------------------------------------------------
    /// TCP listen address
    pub listen_addr: String,

    /// Worker threads, i.e. connections served at once
    pub max_connections: usize,

    /// Accepted connections allowed to wait for a free worker
    pub pending_connections: usize,

    /// Connection read timeout (milliseconds, 0 = none)
    pub read_timeout_ms: u64,

    /// Connection write timeout (milliseconds, 0 = none)
    pub write_timeout_ms: u64,

    /// Longest request line accepted, terminator excluded
    pub max_line_length: usize,

    /// How long shutdown waits for in-flight connections (milliseconds)
    pub shutdown_grace_ms: u64,
}

/// WAL sync strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalSyncStrategy {
    /// fsync after every write (safest, slowest)
    EveryWrite,

    /// fsync after N uncommitted entries (balanced durability/performance)
    EveryNEntries { count: usize },
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./knowsql_data"),
            wal_sync_strategy: WalSyncStrategy::EveryWrite,
            compaction_threshold: 10_000,
            listen_addr: format!("0.0.0.0:{}", DEFAULT_PORT),
            max_connections: 128,
            pending_connections: 64,
            read_timeout_ms: 300_000,
            write_timeout_ms: 5000,
            max_line_length: 64 * 1024,
            shutdown_grace_ms: 5000,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Reject settings the server cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.max_connections == 0 {
            return Err(KnowsqlError::Config(
                "max_connections must be at least 1".to_string(),
            ));
        }
        if self.max_line_length == 0 {
            return Err(KnowsqlError::Config(
                "max_line_length must be at least 1".to_string(),
            ));
        }
        if let WalSyncStrategy::EveryNEntries { count: 0 } = self.wal_sync_strategy {
            return Err(KnowsqlError::Config(
                "sync count must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the data directory (root for all storage)
    pub fn data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.data_dir = path.into();
        self
    }

    /// Set the WAL sync strategy
    pub fn wal_sync_strategy(mut self, strategy: WalSyncStrategy) -> Self {
        self.config.wal_sync_strategy = strategy;
        self
    }

    /// Set the number of log records that triggers compaction
    pub fn compaction_threshold(mut self, records: u64) -> Self {
        self.config.compaction_threshold = records;
        self
    }

    /// Set the TCP listen address
    pub fn listen_addr(mut self, addr: impl Into<String>) -> Self {
        self.config.listen_addr = addr.into();
        self
    }

    /// Set the maximum number of concurrent connections
    pub fn max_connections(mut self, count: usize) -> Self {
        self.config.max_connections = count;
        self
    }

    /// Set how many accepted connections may queue for a worker
    pub fn pending_connections(mut self, count: usize) -> Self {
        self.config.pending_connections = count;
        self
    }

    /// Set the read timeout (in milliseconds)
    pub fn read_timeout_ms(mut self, ms: u64) -> Self {
        self.config.read_timeout_ms = ms;
        self
    }

    /// Set the write timeout (in milliseconds)
    pub fn write_timeout_ms(mut self, ms: u64) -> Self {
        self.config.write_timeout_ms = ms;
        self
    }

    /// Set the longest accepted request line (in bytes)
    pub fn max_line_length(mut self, bytes: usize) -> Self {
        self.config.max_line_length = bytes;
        self
    }

    /// Set the shutdown grace period (in milliseconds)
    pub fn shutdown_grace_ms(mut self, ms: u64) -> Self {
        self.config.shutdown_grace_ms = ms;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
