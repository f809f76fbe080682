//! Write-Ahead Log (WAL) Module
//!
//! Provides durability guarantees through append-only logging.
//!
//! ## Responsibilities
//! - Append a log entry (and flush it) before any in-memory mutation
//! - Replay entries in file order on startup
//! - Stop at, and trim, a torn trailing entry left by a crash mid-append
//!
//! ## File Format
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │ Entry 1                                                  │
//! │ ┌────────┬────────────┬───────┬──────────────┬────────┐  │
//! │ │ Op (1) │ KeyLen (4) │  Key  │ ValueLen (4) │ Value  │  │
//! │ └────────┴────────────┴───────┴──────────────┴────────┘  │
//! ├──────────────────────────────────────────────────────────┤
//! │ Entry 2 ...                                              │
//! └──────────────────────────────────────────────────────────┘
//! ```
//! Op is 0x01 for SET and 0x02 for DELETE. Lengths are big-endian. DELETE
//! entries carry a zero-length value. The file is never compacted.

mod entry;
mod writer;
mod reader;
mod recovery;

pub use entry::{WalEntry, WalOp, ENTRY_HEADER_SIZE};
pub use writer::WalWriter;
pub use reader::{WalIterator, WalReader, WalTail};
pub use recovery::{WalRecovery, RecoveryResult};

use std::path::Path;

use crate::error::Result;

/// Replay every intact entry of the WAL at `path`, in write order
///
/// Read-only. A missing file replays as empty.
pub fn replay(path: &Path) -> Result<Vec<WalEntry>> {
    WalRecovery::replay(path).map(|(entries, _)| entries)
}
