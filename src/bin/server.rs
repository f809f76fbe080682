//! kvstore Server Binary
//!
//! Recovers the store from its WAL and serves it over TCP.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use kvstore::config::{WalSyncStrategy, DEFAULT_MAX_FRAME_SIZE, DEFAULT_PORT, DEFAULT_WAL_PATH};
use kvstore::{Config, Server, Store};
use tracing_subscriber::{fmt, EnvFilter};

/// kvstore Server
#[derive(Parser, Debug)]
#[command(name = "kvstore-server")]
#[command(about = "Key-value store with a write-ahead log")]
#[command(version)]
struct Args {
    /// TCP port to listen on
    #[arg(default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Interface address to bind
    #[arg(short, long, default_value = "0.0.0.0")]
    bind: String,

    /// Path of the write-ahead log
    #[arg(short, long, default_value = DEFAULT_WAL_PATH)]
    wal: PathBuf,

    /// Largest request frame a client may send, in bytes
    #[arg(long, default_value_t = DEFAULT_MAX_FRAME_SIZE)]
    max_frame: u32,

    /// Skip fdatasync after each append (flush to the OS only)
    #[arg(long)]
    no_fsync: bool,
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,kvstore=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();

    tracing::info!("kvstore Server v{}", kvstore::VERSION);
    tracing::info!("WAL path: {}", args.wal.display());

    let sync_strategy = if args.no_fsync {
        WalSyncStrategy::OsBuffered
    } else {
        WalSyncStrategy::EveryWrite
    };

    // Build config from args
    let config = Config::builder()
        .listen_addr(format_listen_addr(&args.bind, args.port))
        .wal_path(&args.wal)
        .wal_sync_strategy(sync_strategy)
        .max_frame_size(args.max_frame)
        .build();

    if let Err(e) = config.validate() {
        tracing::error!("{}", e);
        std::process::exit(1);
    }

    // Replay the WAL before accepting anyone
    let store = match Store::open(&config) {
        Ok(s) => Arc::new(s),
        Err(e) => {
            tracing::error!("Failed to open store: {}", e);
            std::process::exit(1);
        }
    };

    tracing::info!("Store initialized with {} keys", store.size());

    let mut server = match Server::new(config, Arc::clone(&store)) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!("Failed to start server: {}", e);
            std::process::exit(1);
        }
    };

    // SIGINT and SIGTERM; SIGPIPE is already ignored by the Rust runtime
    let handle = server.shutdown_handle();
    if let Err(e) = ctrlc::set_handler(move || {
        tracing::info!("Received shutdown signal, stopping...");
        handle.shutdown();
    }) {
        tracing::error!("Failed to install signal handler: {}", e);
        std::process::exit(1);
    }

    if let Err(e) = server.run() {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
    drop(server);

    if let Err(e) = store.sync() {
        tracing::error!("Final WAL sync failed: {}", e);
        std::process::exit(1);
    }

    tracing::info!("Server stopped");
}

/// Join host and port, bracketing bare IPv6 addresses
fn format_listen_addr(bind: &str, port: u16) -> String {
    if bind.contains(':') && !bind.starts_with('[') {
        format!("[{}]:{}", bind, port)
    } else {
        format!("{}:{}", bind, port)
    }
}
