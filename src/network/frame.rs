//! Frame decoder for accumulating partial reads.
//!
//! Splits the inbound byte stream into length-prefixed request frames:
//! - `AwaitingLength`: fewer than 4 bytes buffered
//! - `AwaitingPayload`: length known (and cached), body incomplete
//! - `MessageReady`: a whole frame is buffered
//! - `Closed`: a declared length exceeded the ceiling; nothing more is read

use bytes::{Buf, Bytes, BytesMut};

use crate::error::{KvError, Result};
use crate::protocol::LENGTH_PREFIX_SIZE;

/// Framing state, derived from the buffer and the cached length
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameState {
    AwaitingLength,
    AwaitingPayload { len: u32 },
    MessageReady { len: u32 },
    Closed,
}

/// Buffer for accumulating incoming bytes and extracting complete frames.
pub struct FrameDecoder {
    buffer: BytesMut,

    /// Declared body length of the frame at the head of the buffer
    expected_len: Option<u32>,

    max_frame_size: u32,

    closed: bool,
}

impl FrameDecoder {
    pub fn new(max_frame_size: u32) -> Self {
        Self {
            buffer: BytesMut::with_capacity(4096),
            expected_len: None,
            max_frame_size,
            closed: false,
        }
    }

    /// Append bytes read from the socket
    pub fn extend(&mut self, data: &[u8]) {
        if !self.closed {
            self.buffer.extend_from_slice(data);
        }
    }

    /// Pop the next complete frame, length prefix included
    ///
    /// - `Ok(Some(frame))` if a complete frame was extracted
    /// - `Ok(None)` if more data is needed
    /// - `Err(...)` if the declared length is over the ceiling; the decoder
    ///   is closed and its buffer dropped
    pub fn next_frame(&mut self) -> Result<Option<Bytes>> {
        if self.closed {
            return Ok(None);
        }

        let len = match self.expected_len {
            Some(len) => len,
            None => {
                if self.buffer.len() < LENGTH_PREFIX_SIZE {
                    return Ok(None);
                }

                let len = (&self.buffer[..LENGTH_PREFIX_SIZE]).get_u32();
                if len > self.max_frame_size {
                    self.closed = true;
                    self.buffer = BytesMut::new();
                    return Err(KvError::Protocol(format!(
                        "Frame too large: {} bytes (max {})",
                        len, self.max_frame_size
                    )));
                }

                self.expected_len = Some(len);
                len
            }
        };

        let total = LENGTH_PREFIX_SIZE + len as usize;
        if self.buffer.len() < total {
            return Ok(None);
        }

        self.expected_len = None;
        Ok(Some(self.buffer.split_to(total).freeze()))
    }

    pub fn state(&self) -> FrameState {
        if self.closed {
            return FrameState::Closed;
        }

        match self.expected_len {
            Some(len) if self.buffer.len() >= LENGTH_PREFIX_SIZE + len as usize => {
                FrameState::MessageReady { len }
            }
            Some(len) => FrameState::AwaitingPayload { len },
            None => FrameState::AwaitingLength,
        }
    }

    /// Bytes waiting to be framed
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}
