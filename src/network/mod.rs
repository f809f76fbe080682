//! Network Module
//!
//! TCP server and client handling.
//!
//! ## Architecture
//! - One thread, one `mio::Poll`: accept, read, dispatch and write all
//!   happen on the event loop
//! - Each socket is owned by exactly one `Connection` in the server registry
//! - Requests on a connection are answered strictly in arrival order
//! - WAL appends run inline, so a slow fsync stalls every connection

mod frame;
mod server;
mod connection;

pub use frame::{FrameDecoder, FrameState};
pub use server::{Server, ShutdownHandle};
pub use connection::{Connection, INVALID_REQUEST_MESSAGE, WAL_FAILURE_MESSAGE};
