//! knowsql CLI Client
//!
//! Command-line interface for interacting with a knowsql server.

use clap::{Parser, Subcommand};
use knowsql::protocol::{Command, Response};
use knowsql::Client;

/// knowsql CLI
#[derive(Parser, Debug)]
#[command(name = "knowsql-cli")]
#[command(about = "CLI for the knowsql key-value server")]
#[command(version)]
struct Args {
    /// Server address
    #[arg(short, long, default_value = "127.0.0.1:6379")]
    server: String,

    #[command(subcommand)]
    command: Commands,
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

        /// The value to set (remaining words are joined with spaces)
        #[arg(required = true, num_args = 1..)]
        value: Vec<String>,
    },

    /// Delete a key
    Del {
        /// The key to delete
        key: String,
    },

    /// Increment an integer value
    Incr {
        /// The key to increment
        key: String,
    },

    /// List all keys
    List,

    /// Ping the server
    Ping,
}

impl From<Commands> for Command {
    fn from(command: Commands) -> Self {
        match command {
            Commands::Get { key } => Command::Get { key: key.into_bytes() },
            Commands::Set { key, value } => Command::Set {
                key: key.into_bytes(),
                value: value.join(" ").into_bytes(),
            },
            Commands::Del { key } => Command::Delete { key: key.into_bytes() },
            Commands::Incr { key } => Command::Incr { key: key.into_bytes() },
            Commands::List => Command::List,
            Commands::Ping => Command::Ping,
        }
    }
}

fn main() {
    let args = Args::parse();

    let mut client = match Client::connect(&args.server) {
        Ok(client) => client,
        Err(e) => {
            eprintln!("Could not connect to {}: {}", args.server, e);
            std::process::exit(1);
        }
    };

    let response = match client.execute(&args.command.into()) {
        Ok(response) => response,
        Err(e) => {
            eprintln!("Request failed: {}", e);
            std::process::exit(1);
        }
    };

    match response {
        Response::Ok => println!("OK"),
        Response::Value(value) => println!("{}", String::from_utf8_lossy(&value)),
        Response::NotFound => println!("(nil)"),
        Response::Keys(keys) => {
            for key in keys {
                println!("{}", String::from_utf8_lossy(&key));
            }
        }
        Response::Bye => {}
        Response::Error(reason) => {
            eprintln!("ERR {}", reason);
            std::process::exit(1);
        }
    }
}
