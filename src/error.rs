//! kvstore errors
//!
//! One enum for the whole crate, grouped by the layer that raises it, so the
//! connection layer can tell a lost write from a bad request or a miss.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, KvError>;

#[derive(Debug, Error)]
pub enum KvError {
    /// I/O outside the append path (open, replay, sockets)
    #[error(transparent)]
    Io(#[from] io::Error),

    /// Log bytes that do not form an entry
    #[error("corrupt WAL: {0}")]
    WalCorruption(String),

    /// A write, flush or sync of one entry did not complete
    #[error("append to {} failed: {source}", path.display())]
    WalAppend {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// GET or DELETE of an absent key
    #[error("key not found")]
    KeyNotFound,

    #[error("cannot reach server: {0}")]
    Network(String),

    /// Undecodable request/response or an oversized frame
    #[error("malformed message: {0}")]
    Protocol(String),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl KvError {
    /// The mutation was refused because the log did not take it
    pub fn is_wal_failure(&self) -> bool {
        matches!(self, KvError::WalAppend { .. })
    }
}
