//! kvstore CLI Client
//!
//! Command-line interface for interacting with kvstore.

use std::io::{self, BufRead, Write};

use clap::{Parser, Subcommand};
use kvstore::protocol::{Response, Status};
use kvstore::Client;

/// kvstore CLI
#[derive(Parser, Debug)]
#[command(name = "kvstore-cli")]
#[command(about = "CLI for the kvstore key-value store")]
struct Args {
    /// Server address
    #[arg(short, long, default_value = "127.0.0.1:6379")]
    server: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Get a value by key
    Get {
        /// The key to get
        key: String,
    },

    /// Set a key-value pair
    Set {
        /// The key to set
        key: String,

        /// The value to set
        value: String,
    },

    /// Delete a key
    Del {
        /// The key to delete
        key: String,
    },

    /// Ping the server
    Ping,

    /// Interactive line mode (the default)
    Repl,
}

fn main() {
    let args = Args::parse();

    let mut client = match Client::connect(&args.server) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    };

    let result = match args.command.unwrap_or(Commands::Repl) {
        Commands::Get { key } => client.get(key.as_bytes()),
        Commands::Set { key, value } => client.set(key.as_bytes(), value.as_bytes()),
        Commands::Del { key } => client.delete(key.as_bytes()),
        Commands::Ping => client.ping(),
        Commands::Repl => {
            println!("Connected to {}", args.server);
            if let Err(e) = run_repl(&mut client) {
                eprintln!("{}", e);
                std::process::exit(1);
            }
            return;
        }
    };

    match result {
        Ok(response) => println!("{}", render(&response)),
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    }
}

fn run_repl(client: &mut Client) -> kvstore::Result<()> {
    println!("Commands: SET key value, GET key, DELETE key, PING, QUIT");

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();

    loop {
        print!("kvstore> ");
        io::stdout().flush()?;

        let Some(line) = lines.next() else {
            return Ok(());
        };
        let line = line?;

        let mut words = line.split_whitespace();
        let Some(cmd) = words.next() else {
            continue;
        };

        let response = match (cmd.to_ascii_uppercase().as_str(), words.next(), words.next()) {
            ("QUIT" | "EXIT", _, _) => return Ok(()),
            ("SET", Some(key), Some(value)) => client.set(key.as_bytes(), value.as_bytes())?,
            ("SET", _, _) => {
                println!("Usage: SET key value");
                continue;
            }
            ("GET", Some(key), _) => client.get(key.as_bytes())?,
            ("GET", None, _) => {
                println!("Usage: GET key");
                continue;
            }
            ("DELETE" | "DEL", Some(key), _) => client.delete(key.as_bytes())?,
            ("DELETE" | "DEL", None, _) => {
                println!("Usage: DELETE key");
                continue;
            }
            ("PING", _, _) => client.ping()?,
            (other, _, _) => {
                println!("Unknown command: {}", other);
                continue;
            }
        };

        println!("{}", render(&response));
    }
}

fn render(response: &Response) -> String {
    match response.status {
        Status::Ok => response.payload_lossy(),
        Status::NotFound => "(nil)".to_string(),
        Status::Error => format!("Error: {}", response.payload_lossy()),
    }
}
