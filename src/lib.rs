//! # kvstore
//!
//! A single-node key-value store with:
//! - Write-Ahead Logging (WAL) for durability
//! - Crash recovery with torn-tail handling
//! - Single-writer/multi-reader concurrency model
//! - Non-blocking TCP server on a single-threaded `mio` event loop
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  TCP Server (mio Poll)                       │
//! │             listener + Connection registry                   │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │ frames
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │          Connection (framing, codec, dispatch)               │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │ requests
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                        Store                                 │
//! └──────────┬──────────────────────────────────┬───────────────┘
//!            │ 1. append + flush                 │ 2. apply
//!            ▼                                   ▼
//!     ┌─────────────┐                    ┌──────────────┐
//!     │     WAL     │                    │   HashMap    │
//!     │   (Mutex)   │                    │   (RwLock)   │
//!     └─────────────┘                    └──────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod protocol;
pub mod wal;
pub mod store;
pub mod network;
pub mod client;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{KvError, Result};
pub use config::Config;
pub use store::Store;
pub use network::{Server, ShutdownHandle};
pub use client::Client;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of kvstore
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
