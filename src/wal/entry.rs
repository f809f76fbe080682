//! WAL Entry definitions
//!
//! Defines the structure of individual WAL log entries.

use bytes::BufMut;

use crate::error::{KvError, Result};

/// Fixed bytes per entry: op (1) + key_len (4) + value_len (4)
pub const ENTRY_HEADER_SIZE: usize = 9;

/// Operations that can be logged
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum WalOp {
    Set = 0x01,
    Delete = 0x02,
}

impl TryFrom<u8> for WalOp {
    type Error = KvError;

    fn try_from(byte: u8) -> Result<Self> {
        match byte {
            0x01 => Ok(WalOp::Set),
            0x02 => Ok(WalOp::Delete),
            _ => Err(KvError::WalCorruption(format!(
                "unknown operation byte 0x{:02x}",
                byte
            ))),
        }
    }
}

/// A single entry in the WAL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalEntry {
    /// The operation to perform
    pub op: WalOp,

    pub key: Vec<u8>,

    /// Empty for DELETE
    pub value: Vec<u8>,
}

impl WalEntry {
    pub fn set(key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> Self {
        Self {
            op: WalOp::Set,
            key: key.into(),
            value: value.into(),
        }
    }

    pub fn delete(key: impl Into<Vec<u8>>) -> Self {
        Self {
            op: WalOp::Delete,
            key: key.into(),
            value: Vec::new(),
        }
    }

    /// Size of this entry on disk
    pub fn encoded_len(&self) -> usize {
        ENTRY_HEADER_SIZE + self.key.len() + self.value.len()
    }

    /// Append the on-disk form of this entry to `buf`
    pub fn encode_into<B: BufMut>(&self, buf: &mut B) {
        buf.put_u8(self.op as u8);
        buf.put_u32(self.key.len() as u32);
        buf.put_slice(&self.key);
        buf.put_u32(self.value.len() as u32);
        buf.put_slice(&self.value);
    }

    /// Serialize to the on-disk form
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.encoded_len());
        self.encode_into(&mut buf);
        buf
    }
}
