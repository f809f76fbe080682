//! Configuration for kvstore
//!
//! Centralized configuration with sensible defaults.

use std::net::SocketAddr;
use std::path::PathBuf;

use crate::error::{KvError, Result};

/// Default TCP port
pub const DEFAULT_PORT: u16 = 6379;

/// Default WAL file name
pub const DEFAULT_WAL_PATH: &str = "kvstore.wal";

/// Default ceiling on a declared request frame length (1 MiB)
pub const DEFAULT_MAX_FRAME_SIZE: u32 = 1024 * 1024;

/// Main configuration for a kvstore instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Path of the append-only log file
    pub wal_path: PathBuf,

    /// Sync strategy: how hard to push each WAL append to disk
    pub wal_sync_strategy: WalSyncStrategy,

    // -------------------------------------------------------------------------
    // Network Configuration
    // -------------------------------------------------------------------------
    /// TCP listen address
    pub listen_addr: String,

    /// Largest request frame (bytes after the length prefix) a client may declare
    pub max_frame_size: u32,

    /// Upper bound on a single blocking poll (milliseconds)
    pub poll_timeout_ms: u64,

    /// Readiness events drained per poll
    pub max_events: usize,

    /// Bytes requested per non-blocking socket read
    pub read_chunk_size: usize,
}

/// WAL sync strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalSyncStrategy {
    /// flush + fdatasync after every append (durable across power loss)
    EveryWrite,

    /// flush to the OS only; survives a process crash, not a machine crash
    OsBuffered,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            wal_path: PathBuf::from(DEFAULT_WAL_PATH),
            wal_sync_strategy: WalSyncStrategy::EveryWrite,
            listen_addr: format!("0.0.0.0:{}", DEFAULT_PORT),
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
            poll_timeout_ms: 1000,
            max_events: 64,
            read_chunk_size: 4096,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Parse the listen address
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        self.listen_addr.parse().map_err(|e| {
            KvError::Config(format!("invalid listen address '{}': {}", self.listen_addr, e))
        })
    }

    /// Reject settings the server cannot run with
    pub fn validate(&self) -> Result<()> {
        self.socket_addr()?;

        if self.max_frame_size == 0 {
            return Err(KvError::Config("max_frame_size must be non-zero".to_string()));
        }
        if self.max_events == 0 {
            return Err(KvError::Config("max_events must be non-zero".to_string()));
        }
        if self.read_chunk_size == 0 {
            return Err(KvError::Config("read_chunk_size must be non-zero".to_string()));
        }
        if self.wal_path.as_os_str().is_empty() {
            return Err(KvError::Config("wal_path must not be empty".to_string()));
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
    /// Set the WAL file path
    pub fn wal_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.wal_path = path.into();
        self
    }

    /// Set the WAL sync strategy
    pub fn wal_sync_strategy(mut self, strategy: WalSyncStrategy) -> Self {
        self.config.wal_sync_strategy = strategy;
        self
    }

    /// Set the TCP listen address
    pub fn listen_addr(mut self, addr: impl Into<String>) -> Self {
        self.config.listen_addr = addr.into();
        self
    }

    /// Listen on all interfaces at the given port
    pub fn port(mut self, port: u16) -> Self {
        self.config.listen_addr = format!("0.0.0.0:{}", port);
        self
    }

    /// Set the request frame ceiling (in bytes)
    pub fn max_frame_size(mut self, size: u32) -> Self {
        self.config.max_frame_size = size;
        self
    }

    /// Set the poll timeout (in milliseconds)
    pub fn poll_timeout_ms(mut self, ms: u64) -> Self {
        self.config.poll_timeout_ms = ms;
        self
    }

    /// Set the number of events drained per poll
    pub fn max_events(mut self, count: usize) -> Self {
        self.config.max_events = count;
        self
    }

    /// Set the socket read chunk size (in bytes)
    pub fn read_chunk_size(mut self, size: usize) -> Self {
        self.config.read_chunk_size = size;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
