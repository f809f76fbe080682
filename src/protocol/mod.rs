//! Protocol Module
//!
//! Defines the wire protocol for client-server communication.
//! All integers are big-endian.
//!
//! ### Request Format
//! ```text
//! ┌──────────┬──────────┬────────────┬───────┬──────────────┬───────┐
//! │ Len (4)  │ Op (1)   │ KeyLen (4) │  Key  │ ValueLen (4) │ Value │
//! └──────────┴──────────┴────────────┴───────┴──────────────┴───────┘
//! ```
//! `Len` counts every byte after itself. The value fields are present only
//! for SET.
//!
//! ### Opcodes
//! - 0x01: SET
//! - 0x02: GET
//! - 0x03: DELETE
//! - 0x04: PING
//!
//! ### Response Format
//! ```text
//! ┌──────────┬──────────┬─────────────────────────────┐
//! │Status(1) │ Len (4)  │         Payload             │
//! └──────────┴──────────┴─────────────────────────────┘
//! ```
//!
//! ### Status Codes
//! - 0x00: OK
//! - 0x01: ERROR
//! - 0x02: NOT_FOUND

mod request;
mod response;
mod codec;

pub use request::{OpCode, Request};
pub use response::{Response, Status, NOT_FOUND_MESSAGE};
pub use codec::{
    decode_request, decode_response, encode_request, encode_request_into, encode_response,
    encode_response_into, read_request, read_response, write_request, write_response,
    LENGTH_PREFIX_SIZE, MAX_PAYLOAD_SIZE, MIN_REQUEST_BODY, RESPONSE_HEADER_SIZE,
};
