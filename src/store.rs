//! Store Module
//!
//! The in-memory key-value mapping, made durable by the WAL.
//!
//! ## Responsibilities
//! - Rebuild the mapping from the WAL before serving anything
//! - Log every mutation before applying it (log-before-apply)
//! - Route protocol requests to get/set/remove

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::RwLock;

use crate::config::Config;
use crate::error::{KvError, Result};
use crate::protocol::Request;
use crate::wal::{RecoveryResult, WalEntry, WalOp, WalRecovery, WalWriter};

type Mapping = HashMap<Vec<u8>, Vec<u8>>;

/// The durable key-value store
///
/// ## Concurrency Model: Single-Writer / Multiple-Reader
///
/// Two independently guarded resources:
/// - `data`: `RwLock`; `get` takes the shared lock for the lookup only,
///   mutations take the exclusive lock around the map update only
/// - `wal`: internal `Mutex` per append
///
/// A mutation appends to the WAL *before* taking the map lock, so disk
/// latency never blocks readers. Two concurrent mutations of the same key
/// may reach the map in a different order than they reached the log; the
/// live value then follows lock order while a replay follows log order.
pub struct Store {
    /// Live state (authoritative while running)
    data: RwLock<Mapping>,

    /// Write-ahead log (authoritative after a restart)
    wal: WalWriter,
}

impl Store {
    /// Open the store: replay the WAL, trim a torn tail, open for append
    pub fn open(config: &Config) -> Result<Self> {
        let wal_path = config.wal_path.as_path();
        if let Some(parent) = wal_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let (entries, result) = WalRecovery::recover(wal_path)?;
        let data = Self::rebuild(entries);

        tracing::info!(
            keys = data.len(),
            entries = result.entries_recovered,
            "recovery complete"
        );

        let wal = WalWriter::open(wal_path, config.wal_sync_strategy)?;

        Ok(Self {
            data: RwLock::new(data),
            wal,
        })
    }

    /// Open with a WAL path (convenience method)
    ///
    /// Uses default config with the specified WAL file
    pub fn open_path(path: &Path) -> Result<Self> {
        let config = Config::builder().wal_path(path).build();
        Self::open(&config)
    }

    /// Apply entries in file order: SET upserts, DELETE removes
    fn rebuild(entries: impl IntoIterator<Item = WalEntry>) -> Mapping {
        let mut data = Mapping::new();
        for entry in entries {
            match entry.op {
                WalOp::Set => {
                    data.insert(entry.key, entry.value);
                }
                WalOp::Delete => {
                    data.remove(&entry.key);
                }
            }
        }
        data
    }

    /// Rebuild the mapping from the WAL on disk, replacing live state
    ///
    /// Read-only with respect to the file.
    pub fn recover(&self) -> Result<RecoveryResult> {
        let (entries, result) = WalRecovery::replay(self.wal.path())?;
        let rebuilt = Self::rebuild(entries);
        *self.data.write() = rebuilt;
        Ok(result)
    }

    /// Execute a request
    ///
    /// Returns the OK payload; `KeyNotFound` for a GET/DELETE miss.
    pub fn execute(&self, request: Request) -> Result<Vec<u8>> {
        match request {
            Request::Set { key, value } => {
                self.set(key, value)?;
                Ok(b"OK".to_vec())
            }
            Request::Get { key } => self.get(&key).ok_or(KvError::KeyNotFound),
            Request::Delete { key } => {
                if self.remove(&key)? {
                    Ok(b"OK".to_vec())
                } else {
                    Err(KvError::KeyNotFound)
                }
            }
            Request::Ping => Ok(b"PONG".to_vec()),
        }
    }

    /// Get a value by key
    pub fn get(&self, key: &[u8]) -> Option<Vec<u8>> {
        self.data.read().get(key).cloned()
    }

    /// Upsert a key-value pair
    ///
    /// The map is untouched if the WAL append fails.
    pub fn set(&self, key: Vec<u8>, value: Vec<u8>) -> Result<()> {
        if let Err(e) = self.wal.append_set(&key, &value) {
            tracing::warn!("SET not applied, WAL append failed: {}", e);
            return Err(e);
        }

        self.data.write().insert(key, value);
        Ok(())
    }

    /// Remove a key, returning whether it was present
    ///
    /// A DELETE entry is logged even for an absent key; replaying it is a
    /// no-op.
    pub fn remove(&self, key: &[u8]) -> Result<bool> {
        if let Err(e) = self.wal.append_delete(key) {
            tracing::warn!("DELETE not applied, WAL append failed: {}", e);
            return Err(e);
        }

        Ok(self.data.write().remove(key).is_some())
    }

    /// Number of live keys
    pub fn size(&self) -> usize {
        self.data.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }

    /// Drop every key from memory
    ///
    /// Nothing is logged: the next `recover` or restart brings the durable
    /// state back.
    pub fn clear(&self) {
        self.data.write().clear();
    }

    /// Force the WAL to disk
    pub fn sync(&self) -> Result<()> {
        self.wal.sync()
    }

    /// Sync and close the WAL handle
    pub fn close(self) -> Result<()> {
        self.wal.sync()
    }

    pub fn wal_path(&self) -> PathBuf {
        self.wal.path().to_path_buf()
    }

    /// Entries appended since open (for testing and debugging)
    pub fn wal_entries_appended(&self) -> u64 {
        self.wal.entries_appended()
    }
}
