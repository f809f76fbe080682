//! WAL Reader
//!
//! Handles reading entries from the WAL file.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use crate::error::Result;
use super::{WalEntry, WalOp};

/// How reading stopped
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalTail {
    /// Still reading
    Open,

    /// EOF on an entry boundary
    Clean,

    /// EOF in the middle of an entry (crash during append)
    Truncated,

    /// Bytes that do not form an entry
    Malformed(String),
}

/// Reads entries from the WAL file
///
/// Stops at the first incomplete or malformed entry; everything after it is
/// treated as never written.
pub struct WalReader {
    reader: BufReader<File>,

    /// End of the last intact entry
    valid_offset: u64,

    file_len: u64,

    tail: WalTail,
}

impl WalReader {
    /// Open a WAL file for reading
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        let file_len = file.metadata()?.len();

        Ok(Self {
            reader: BufReader::new(file),
            valid_offset: 0,
            file_len,
            tail: WalTail::Open,
        })
    }

    /// Read the next entry from the WAL
    ///
    /// Returns `Ok(None)` once the end of the intact prefix is reached;
    /// [`tail`](Self::tail) then says why. Only genuine I/O errors are `Err`.
    pub fn next_entry(&mut self) -> Result<Option<WalEntry>> {
        if self.tail != WalTail::Open {
            return Ok(None);
        }

        let op_byte = self.read_up_to(1)?;
        let Some(&op_byte) = op_byte.first() else {
            return Ok(self.stop(WalTail::Clean));
        };

        let op = match WalOp::try_from(op_byte) {
            Ok(op) => op,
            Err(e) => return Ok(self.stop(WalTail::Malformed(e.to_string()))),
        };

        let Some(key) = self.read_field()? else {
            return Ok(self.stop(WalTail::Truncated));
        };
        let Some(value) = self.read_field()? else {
            return Ok(self.stop(WalTail::Truncated));
        };

        let entry = WalEntry { op, key, value };
        self.valid_offset += entry.encoded_len() as u64;
        Ok(Some(entry))
    }

    /// Read a length-prefixed field, `None` if the file ends inside it
    fn read_field(&mut self) -> Result<Option<Vec<u8>>> {
        let len_bytes = self.read_up_to(4)?;
        let Ok(len_bytes) = <[u8; 4]>::try_from(len_bytes.as_slice()) else {
            return Ok(None);
        };

        // take() keeps a corrupt length from forcing a huge allocation
        let len = u32::from_be_bytes(len_bytes) as u64;
        let data = self.read_up_to(len)?;
        if (data.len() as u64) < len {
            return Ok(None);
        }
        Ok(Some(data))
    }

    fn read_up_to(&mut self, len: u64) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        (&mut self.reader).take(len).read_to_end(&mut buf)?;
        Ok(buf)
    }

    fn stop(&mut self, tail: WalTail) -> Option<WalEntry> {
        self.tail = tail;
        None
    }

    /// Iterate over all intact entries
    pub fn entries(self) -> WalIterator {
        WalIterator { reader: self }
    }

    /// End of the last intact entry read so far
    pub fn valid_offset(&self) -> u64 {
        self.valid_offset
    }

    /// File length when the reader was opened
    pub fn file_len(&self) -> u64 {
        self.file_len
    }

    pub fn tail(&self) -> &WalTail {
        &self.tail
    }
}

/// Iterator over WAL entries
pub struct WalIterator {
    reader: WalReader,
}

impl WalIterator {
    /// Give back the reader, e.g. to inspect the tail after iterating
    pub fn into_reader(self) -> WalReader {
        self.reader
    }
}

impl Iterator for WalIterator {
    type Item = Result<WalEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        self.reader.next_entry().transpose()
    }
}
