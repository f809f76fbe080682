//! Connection Handler
//!
//! Per-socket buffering and request dispatch for the event loop.

use std::io::{self, Read, Write};
use std::sync::Arc;

use bytes::{Buf, BytesMut};
use mio::net::TcpStream;
use mio::{Interest, Registry, Token};

use crate::config::Config;
use crate::error::KvError;
use crate::network::frame::{FrameDecoder, FrameState};
use crate::protocol::{decode_request, encode_response_into, Response};
use crate::store::Store;

/// ERROR payload for a frame that does not decode
pub const INVALID_REQUEST_MESSAGE: &str = "Invalid request format";

/// ERROR payload when the WAL append fails
pub const WAL_FAILURE_MESSAGE: &str = "Failed to write to log";

/// Handles a single client connection
///
/// Owns its socket; dropping the `Connection` closes it. All I/O is
/// non-blocking and driven by readiness events from the server loop.
pub struct Connection {
    stream: TcpStream,

    token: Token,

    /// Peer address for logging
    peer_addr: String,

    store: Arc<Store>,

    decoder: FrameDecoder,

    /// Encoded responses not yet accepted by the socket
    write_buf: BytesMut,

    /// Scratch space for socket reads
    read_chunk: Vec<u8>,

    /// Whether WRITABLE is part of the registered interest
    write_interest: bool,

    closed: bool,
}

impl Connection {
    /// Create a new connection handler
    pub fn new(stream: TcpStream, token: Token, store: Arc<Store>, config: &Config) -> Self {
        let peer_addr = stream
            .peer_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|_| "unknown".to_string());

        // Disable Nagle's algorithm for low latency
        if let Err(e) = stream.set_nodelay(true) {
            tracing::debug!("set_nodelay failed for {}: {}", peer_addr, e);
        }

        Self {
            stream,
            token,
            peer_addr,
            store,
            decoder: FrameDecoder::new(config.max_frame_size),
            write_buf: BytesMut::with_capacity(4096),
            read_chunk: vec![0u8; config.read_chunk_size],
            write_interest: false,
            closed: false,
        }
    }

    /// Register for read readiness
    pub fn register(&mut self, registry: &Registry) -> io::Result<()> {
        registry.register(&mut self.stream, self.token, Interest::READABLE)
    }

    pub fn deregister(&mut self, registry: &Registry) -> io::Result<()> {
        registry.deregister(&mut self.stream)
    }

    /// Add or drop WRITABLE interest to match the write buffer
    pub fn update_interest(&mut self, registry: &Registry) -> io::Result<()> {
        let wants_write = self.has_pending_writes();
        if wants_write == self.write_interest {
            return Ok(());
        }

        let interest = if wants_write {
            Interest::READABLE | Interest::WRITABLE
        } else {
            Interest::READABLE
        };
        registry.reregister(&mut self.stream, self.token, interest)?;
        self.write_interest = wants_write;
        Ok(())
    }

    /// Drain the socket and answer every complete frame
    ///
    /// Reads until the socket would block (readiness is edge-triggered),
    /// framing after each read so an oversized header is rejected before its
    /// payload piles up. Returns `false` if the connection must be closed.
    pub fn handle_readable(&mut self) -> bool {
        loop {
            match self.stream.read(&mut self.read_chunk) {
                Ok(0) => {
                    tracing::debug!("Client {} disconnected", self.peer_addr);
                    // answers to frames already read still go out if they can
                    self.flush_writes();
                    return self.close();
                }
                Ok(n) => {
                    self.decoder.extend(&self.read_chunk[..n]);
                    if !self.process_frames() {
                        // frames ahead of the bad one were applied; answer them
                        self.flush_writes();
                        return self.close();
                    }
                }
                Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(ref e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    tracing::debug!("Error reading from {}: {}", self.peer_addr, e);
                    return self.close();
                }
            }
        }

        self.flush_writes()
    }

    /// Send as much buffered output as the socket accepts
    pub fn handle_writable(&mut self) -> bool {
        self.flush_writes()
    }

    /// Extract and answer every complete buffered frame, in order
    fn process_frames(&mut self) -> bool {
        loop {
            match self.decoder.next_frame() {
                Ok(Some(frame)) => {
                    let response = self.dispatch(&frame);
                    encode_response_into(&response, &mut self.write_buf);
                }
                Ok(None) => return true,
                Err(e) => {
                    tracing::warn!("Closing {}: {}", self.peer_addr, e);
                    return false;
                }
            }
        }
    }

    /// Decode one frame and run it against the store
    fn dispatch(&self, frame: &[u8]) -> Response {
        let request = match decode_request(frame) {
            Ok(request) => request,
            Err(e) => {
                tracing::debug!("Bad frame from {}: {}", self.peer_addr, e);
                return Response::error(INVALID_REQUEST_MESSAGE);
            }
        };

        tracing::trace!(
            op = ?request.opcode(),
            logged = request.is_mutation(),
            "request from {}",
            self.peer_addr
        );

        match self.store.execute(request) {
            Ok(data) => Response::ok(data),
            Err(KvError::KeyNotFound) => Response::not_found(),
            Err(e) if e.is_wal_failure() => Response::error(WAL_FAILURE_MESSAGE),
            Err(e) => Response::error(&e.to_string()),
        }
    }

    fn flush_writes(&mut self) -> bool {
        while !self.write_buf.is_empty() {
            match self.stream.write(&self.write_buf) {
                Ok(0) => {
                    tracing::debug!("Client {} stopped accepting data", self.peer_addr);
                    return self.close();
                }
                Ok(n) => self.write_buf.advance(n),
                Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(ref e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    tracing::debug!("Error writing to {}: {}", self.peer_addr, e);
                    return self.close();
                }
            }
        }
        !self.closed
    }

    /// Mark closed; the socket itself closes when the server drops us
    fn close(&mut self) -> bool {
        self.closed = true;
        false
    }

    pub fn has_pending_writes(&self) -> bool {
        !self.write_buf.is_empty()
    }

    /// Framing state, `Closed` once the connection has given up
    pub fn state(&self) -> FrameState {
        if self.closed {
            FrameState::Closed
        } else {
            self.decoder.state()
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn token(&self) -> Token {
        self.token
    }

    /// Get the peer address string
    pub fn peer_addr(&self) -> &str {
        &self.peer_addr
    }
}
