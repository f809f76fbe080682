//! Request definitions
//!
//! Represents requests from clients.

use crate::error::{KvError, Result};

/// Request opcodes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum OpCode {
    Set = 0x01,
    Get = 0x02,
    Delete = 0x03,
    Ping = 0x04,
}

impl TryFrom<u8> for OpCode {
    type Error = KvError;

    fn try_from(byte: u8) -> Result<Self> {
        match byte {
            0x01 => Ok(OpCode::Set),
            0x02 => Ok(OpCode::Get),
            0x03 => Ok(OpCode::Delete),
            0x04 => Ok(OpCode::Ping),
            _ => Err(KvError::Protocol(format!("Unknown opcode: 0x{:02x}", byte))),
        }
    }
}

/// A parsed request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    /// Upsert a key-value pair
    Set { key: Vec<u8>, value: Vec<u8> },

    /// Get a value by key
    Get { key: Vec<u8> },

    /// Delete a key
    Delete { key: Vec<u8> },

    /// Ping (health check)
    Ping,
}

impl Request {
    /// Get the opcode
    pub fn opcode(&self) -> OpCode {
        match self {
            Request::Set { .. } => OpCode::Set,
            Request::Get { .. } => OpCode::Get,
            Request::Delete { .. } => OpCode::Delete,
            Request::Ping => OpCode::Ping,
        }
    }

    /// The key carried by the request (empty for PING)
    pub fn key(&self) -> &[u8] {
        match self {
            Request::Set { key, .. } | Request::Get { key } | Request::Delete { key } => key,
            Request::Ping => &[],
        }
    }

    /// True for requests that append to the WAL
    pub fn is_mutation(&self) -> bool {
        matches!(self, Request::Set { .. } | Request::Delete { .. })
    }
}
