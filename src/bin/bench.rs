//! kvstore Benchmark Driver
//!
//! Sequential SETs then GETs against a running server.

use std::time::{Duration, Instant};

use clap::Parser;
use kvstore::Client;

/// kvstore network benchmark
#[derive(Parser, Debug)]
#[command(name = "kvstore-bench")]
#[command(about = "Measure round-trip throughput against a kvstore server")]
struct Args {
    /// Server address
    #[arg(short, long, default_value = "127.0.0.1:6379")]
    server: String,

    /// Operations per phase
    #[arg(short = 'n', long, default_value = "10000")]
    count: usize,

    /// Value size in bytes
    #[arg(short = 'v', long, default_value = "100")]
    value_size: usize,
}

fn main() {
    let args = Args::parse();

    if let Err(e) = run(&args) {
        eprintln!("benchmark failed: {}", e);
        std::process::exit(1);
    }
}

fn run(args: &Args) -> kvstore::Result<()> {
    let mut client = Client::connect(&args.server)?;
    let value = vec![b'x'; args.value_size];

    println!("kvstore benchmark: {} ops, {} byte values", args.count, args.value_size);

    let start = Instant::now();
    let mut failed = 0usize;
    for i in 0..args.count {
        let key = format!("key_{}", i);
        if !client.set(key.as_bytes(), &value)?.is_ok() {
            failed += 1;
        }
    }
    report("SET", args.count, failed, start.elapsed());

    let start = Instant::now();
    let mut failed = 0usize;
    for i in 0..args.count {
        let key = format!("key_{}", i);
        if !client.get(key.as_bytes())?.is_ok() {
            failed += 1;
        }
    }
    report("GET", args.count, failed, start.elapsed());

    Ok(())
}

fn report(phase: &str, count: usize, failed: usize, elapsed: Duration) {
    let secs = elapsed.as_secs_f64();
    let ops = if secs > 0.0 { count as f64 / secs } else { 0.0 };
    println!(
        "{:<4} {:>8} ops in {:>9.3} ms  ({:>10.0} ops/sec, {} failed)",
        phase,
        count,
        secs * 1000.0,
        ops,
        failed
    );
}
