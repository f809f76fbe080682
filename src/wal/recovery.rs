//! WAL Recovery
//!
//! Handles crash recovery by replaying the WAL.

use std::fs::OpenOptions;
use std::path::Path;

use crate::error::Result;
use super::{WalEntry, WalReader, WalTail};

/// Handles WAL recovery after crash
pub struct WalRecovery;

/// Result of a recovery operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecoveryResult {
    /// Number of entries successfully recovered
    pub entries_recovered: u64,

    /// Length of the intact prefix of the file
    pub valid_bytes: u64,

    /// Bytes after the intact prefix that replay ignored
    pub discarded_bytes: u64,

    /// Whether the file was cut back to `valid_bytes`
    pub was_truncated: bool,

    /// Why replay stopped
    pub tail: WalTail,
}

impl RecoveryResult {
    fn empty() -> Self {
        Self {
            entries_recovered: 0,
            valid_bytes: 0,
            discarded_bytes: 0,
            was_truncated: false,
            tail: WalTail::Clean,
        }
    }
}

impl WalRecovery {
    /// Read all intact entries without touching the file
    ///
    /// A missing file yields no entries.
    pub fn replay(path: &Path) -> Result<(Vec<WalEntry>, RecoveryResult)> {
        if !path.exists() {
            tracing::info!(path = %path.display(), "no WAL found, starting fresh");
            return Ok((Vec::new(), RecoveryResult::empty()));
        }

        let mut entries = Vec::new();
        let mut iter = WalReader::open(path)?.entries();
        for entry in iter.by_ref() {
            entries.push(entry?);
        }
        let reader = iter.into_reader();

        let valid_bytes = reader.valid_offset();
        let result = RecoveryResult {
            entries_recovered: entries.len() as u64,
            valid_bytes,
            discarded_bytes: reader.file_len().saturating_sub(valid_bytes),
            was_truncated: false,
            tail: reader.tail().clone(),
        };

        Ok((entries, result))
    }

    /// Replay the WAL, then trim any torn or malformed tail
    ///
    /// Must run before the file is opened for append: otherwise new entries
    /// would land behind bytes replay cannot get past.
    pub fn recover(path: &Path) -> Result<(Vec<WalEntry>, RecoveryResult)> {
        let (entries, mut result) = Self::replay(path)?;

        if result.discarded_bytes > 0 {
            tracing::warn!(
                path = %path.display(),
                tail = ?result.tail,
                discarded = result.discarded_bytes,
                "discarding incomplete WAL tail"
            );

            let file = OpenOptions::new().write(true).open(path)?;
            file.set_len(result.valid_bytes)?;
            file.sync_all()?;
            result.was_truncated = true;
        }

        tracing::info!(
            path = %path.display(),
            entries = result.entries_recovered,
            bytes = result.valid_bytes,
            "WAL replay complete"
        );

        Ok((entries, result))
    }

    /// Verify integrity of a WAL file without modifying it
    pub fn verify(path: &Path) -> Result<RecoveryResult> {
        Self::replay(path).map(|(_, result)| result)
    }
}
