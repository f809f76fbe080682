//! WAL Writer
//!
//! Handles appending entries to the WAL file.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

use crate::config::WalSyncStrategy;
use crate::error::{KvError, Result};
use super::WalEntry;

/// Open append handle plus the length of its last fully written entry
struct WalFile {
    file: File,
    len: u64,
}

/// Writes entries to the WAL file
///
/// All methods take `&self`; appends are serialized by an internal mutex so
/// each entry lands in the file as one contiguous record.
pub struct WalWriter {
    path: PathBuf,
    inner: Mutex<WalFile>,
    sync_strategy: WalSyncStrategy,
    entries_appended: AtomicU64,
}

impl WalWriter {
    /// Open or create a WAL file in append mode
    pub fn open(path: &Path, sync_strategy: WalSyncStrategy) -> Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let len = file.metadata()?.len();

        tracing::debug!(path = %path.display(), len, "opened WAL for append");

        Ok(Self {
            path: path.to_path_buf(),
            inner: Mutex::new(WalFile { file, len }),
            sync_strategy,
            entries_appended: AtomicU64::new(0),
        })
    }

    /// Append an entry and flush it before returning
    ///
    /// On failure the file is cut back to its previous length so a partial
    /// record cannot hide later appends from replay. Nothing is retried.
    pub fn append(&self, entry: &WalEntry) -> Result<()> {
        let record = entry.encode();
        let mut wal = self.inner.lock();

        if let Err(e) = Self::write_record(&mut wal.file, &record, self.sync_strategy) {
            let previous_len = wal.len;
            if let Err(trim_err) = wal.file.set_len(previous_len) {
                tracing::warn!(
                    path = %self.path.display(),
                    "could not trim failed WAL append: {}",
                    trim_err
                );
            }
            return Err(KvError::WalAppend {
                path: self.path.clone(),
                source: e,
            });
        }

        wal.len += record.len() as u64;
        self.entries_appended.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn write_record(file: &mut File, record: &[u8], strategy: WalSyncStrategy) -> std::io::Result<()> {
        file.write_all(record)?;
        file.flush()?;
        if strategy == WalSyncStrategy::EveryWrite {
            file.sync_data()?;
        }
        Ok(())
    }

    /// Log a SET
    pub fn append_set(&self, key: &[u8], value: &[u8]) -> Result<()> {
        self.append(&WalEntry::set(key, value))
    }

    /// Log a DELETE
    pub fn append_delete(&self, key: &[u8]) -> Result<()> {
        self.append(&WalEntry::delete(key))
    }

    /// Force sync to disk
    pub fn sync(&self) -> Result<()> {
        let mut wal = self.inner.lock();
        wal.file.flush()?;
        wal.file.sync_all()?;
        Ok(())
    }

    /// Bytes of complete entries in the file
    pub fn len(&self) -> u64 {
        self.inner.lock().len
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Entries appended through this handle since it was opened
    pub fn entries_appended(&self) -> u64 {
        self.entries_appended.load(Ordering::Relaxed)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
