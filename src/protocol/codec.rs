//! Protocol codec
//!
//! Encoding and decoding functions for the wire protocol.
//!
//! ### Request body by opcode (after the 4-byte length prefix)
//! - SET:    op (1) + key_len (4) + key + value_len (4) + value
//! - GET:    op (1) + key_len (4) + key
//! - DELETE: op (1) + key_len (4) + key
//! - PING:   op (1) + key_len (4) (+ ignored key bytes)
//!
//! Decoding is all-or-nothing: a short buffer, a length field that overruns
//! the frame, or an unknown opcode/status fails without producing a partial
//! value. Bytes left inside a request frame after the fields its opcode needs
//! are ignored.

use std::io::{Read, Write};

use bytes::{Buf, BufMut};

use crate::error::{KvError, Result};
use super::{OpCode, Request, Response, Status};

/// Size of the request length prefix
pub const LENGTH_PREFIX_SIZE: usize = 4;

/// Smallest legal request body: opcode (1) + key_len (4)
pub const MIN_REQUEST_BODY: usize = 5;

/// Response header size: 1 byte status + 4 bytes length
pub const RESPONSE_HEADER_SIZE: usize = 5;

/// Allocation guard for the blocking stream readers (16 MB)
pub const MAX_PAYLOAD_SIZE: u32 = 16 * 1024 * 1024;

// =============================================================================
// Field helpers
// =============================================================================

fn take_u32(buf: &mut &[u8], field: &str) -> Result<u32> {
    if buf.remaining() < 4 {
        return Err(KvError::Protocol(format!(
            "missing {}: {} bytes left",
            field,
            buf.remaining()
        )));
    }
    Ok(buf.get_u32())
}

fn take_bytes(buf: &mut &[u8], field: &str) -> Result<Vec<u8>> {
    let len = take_u32(buf, field)? as usize;
    if buf.remaining() < len {
        return Err(KvError::Protocol(format!(
            "{} overruns frame: declared {} bytes, {} left",
            field,
            len,
            buf.remaining()
        )));
    }
    let bytes = buf[..len].to_vec();
    buf.advance(len);
    Ok(bytes)
}

fn put_bytes<B: BufMut>(buf: &mut B, bytes: &[u8]) {
    buf.put_u32(bytes.len() as u32);
    buf.put_slice(bytes);
}

// =============================================================================
// Request Encoding/Decoding
// =============================================================================

/// Length of the request body (everything after the length prefix)
fn request_body_len(request: &Request) -> usize {
    match request {
        Request::Set { key, value } => MIN_REQUEST_BODY + key.len() + 4 + value.len(),
        Request::Get { key } | Request::Delete { key } => MIN_REQUEST_BODY + key.len(),
        Request::Ping => MIN_REQUEST_BODY,
    }
}

/// Append an encoded request frame to `buf`
pub fn encode_request_into<B: BufMut>(request: &Request, buf: &mut B) {
    buf.put_u32(request_body_len(request) as u32);
    buf.put_u8(request.opcode() as u8);
    put_bytes(buf, request.key());

    if let Request::Set { value, .. } = request {
        put_bytes(buf, value);
    }
}

/// Encode a request to bytes
///
/// Format: len (4) + op (1) + key_len (4) + key [+ value_len (4) + value]
pub fn encode_request(request: &Request) -> Vec<u8> {
    let mut message = Vec::with_capacity(LENGTH_PREFIX_SIZE + request_body_len(request));
    encode_request_into(request, &mut message);
    message
}

/// Decode one request frame (length prefix included)
///
/// Bytes beyond the declared frame are not inspected.
pub fn decode_request(bytes: &[u8]) -> Result<Request> {
    if bytes.len() < LENGTH_PREFIX_SIZE + MIN_REQUEST_BODY {
        return Err(KvError::Protocol(format!(
            "Incomplete header: expected at least {} bytes, got {}",
            LENGTH_PREFIX_SIZE + MIN_REQUEST_BODY,
            bytes.len()
        )));
    }

    let mut buf = bytes;
    let declared = buf.get_u32() as usize;
    if declared > buf.remaining() {
        return Err(KvError::Protocol(format!(
            "Incomplete frame: declared {} bytes, got {}",
            declared,
            buf.remaining()
        )));
    }

    let mut body = &buf[..declared];
    if body.remaining() < MIN_REQUEST_BODY {
        return Err(KvError::Protocol(format!(
            "Frame too short: {} bytes",
            declared
        )));
    }

    let opcode = OpCode::try_from(body.get_u8())?;
    let key = take_bytes(&mut body, "key")?;

    let request = match opcode {
        OpCode::Set => {
            let value = take_bytes(&mut body, "value")?;
            Request::Set { key, value }
        }
        OpCode::Get => Request::Get { key },
        OpCode::Delete => Request::Delete { key },
        OpCode::Ping => Request::Ping,
    };

    if body.has_remaining() {
        tracing::trace!("ignoring {} trailing bytes in {:?} frame", body.remaining(), opcode);
    }

    Ok(request)
}

// =============================================================================
// Response Encoding/Decoding
// =============================================================================

/// Append an encoded response to `buf`
pub fn encode_response_into<B: BufMut>(response: &Response, buf: &mut B) {
    buf.put_u8(response.status as u8);
    put_bytes(buf, &response.payload);
}

/// Encode a response to bytes
///
/// Format: status (1) + payload_len (4) + payload
pub fn encode_response(response: &Response) -> Vec<u8> {
    let mut message = Vec::with_capacity(RESPONSE_HEADER_SIZE + response.payload.len());
    encode_response_into(response, &mut message);
    message
}

/// Decode a response from bytes
pub fn decode_response(bytes: &[u8]) -> Result<Response> {
    if bytes.len() < RESPONSE_HEADER_SIZE {
        return Err(KvError::Protocol(format!(
            "Incomplete response header: expected {} bytes, got {}",
            RESPONSE_HEADER_SIZE,
            bytes.len()
        )));
    }

    let mut buf = bytes;
    let status = Status::try_from(buf.get_u8())?;
    let payload = take_bytes(&mut buf, "response payload")?;

    Ok(Response { status, payload })
}

// =============================================================================
// Stream-based I/O helpers
// =============================================================================

/// Read a complete request from a blocking stream
pub fn read_request<R: Read>(reader: &mut R) -> Result<Request> {
    let mut prefix = [0u8; LENGTH_PREFIX_SIZE];
    reader.read_exact(&mut prefix)?;

    let body_len = u32::from_be_bytes(prefix);
    if body_len > MAX_PAYLOAD_SIZE {
        return Err(KvError::Protocol(format!(
            "Request too large: {} bytes (max {})",
            body_len, MAX_PAYLOAD_SIZE
        )));
    }

    let mut frame = Vec::with_capacity(LENGTH_PREFIX_SIZE + body_len as usize);
    frame.extend_from_slice(&prefix);
    frame.resize(LENGTH_PREFIX_SIZE + body_len as usize, 0);
    reader.read_exact(&mut frame[LENGTH_PREFIX_SIZE..])?;

    decode_request(&frame)
}

/// Write a request to a stream
pub fn write_request<W: Write>(writer: &mut W, request: &Request) -> Result<()> {
    writer.write_all(&encode_request(request))?;
    writer.flush()?;
    Ok(())
}

/// Read a complete response from a blocking stream
///
/// Reads exactly the header and then exactly the declared payload, so
/// pipelined responses are never split or merged.
pub fn read_response<R: Read>(reader: &mut R) -> Result<Response> {
    let mut header = [0u8; RESPONSE_HEADER_SIZE];
    reader.read_exact(&mut header)?;

    let payload_len = u32::from_be_bytes([header[1], header[2], header[3], header[4]]);
    if payload_len > MAX_PAYLOAD_SIZE {
        return Err(KvError::Protocol(format!(
            "Response payload too large: {} bytes (max {})",
            payload_len, MAX_PAYLOAD_SIZE
        )));
    }

    let mut message = Vec::with_capacity(RESPONSE_HEADER_SIZE + payload_len as usize);
    message.extend_from_slice(&header);
    message.resize(RESPONSE_HEADER_SIZE + payload_len as usize, 0);
    reader.read_exact(&mut message[RESPONSE_HEADER_SIZE..])?;

    decode_response(&message)
}

/// Write a response to a stream
pub fn write_response<W: Write>(writer: &mut W, response: &Response) -> Result<()> {
    writer.write_all(&encode_response(response))?;
    writer.flush()?;
    Ok(())
}
