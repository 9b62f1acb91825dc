//! knowsql Server Binary
//!
//! Opens the store, then serves the line protocol over TCP until SIGINT or
//! SIGTERM.

use std::sync::Arc;

use clap::Parser;
use knowsql::config::{WalSyncStrategy, DEFAULT_PORT};
use knowsql::network::Server;
use knowsql::{Config, Store};
use tracing_subscriber::{fmt, EnvFilter};

/// knowsql Server
#[derive(Parser, Debug)]
#[command(name = "knowsql-server")]
#[command(about = "Line-protocol key-value server with a write-ahead log")]
#[command(version)]
struct Args {
    /// TCP port to listen on
    #[arg(short, long, env = "KNOWSQL_PORT", default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Interface to bind
    #[arg(long, env = "KNOWSQL_HOST", default_value = "0.0.0.0")]
    host: String,

    /// Data directory
    #[arg(short, long, env = "KNOWSQL_DATA_DIR", default_value = "./knowsql_data")]
    data_dir: String,

    /// Maximum concurrent connections
    #[arg(short, long, default_value = "128")]
    max_connections: usize,

    /// fsync the WAL every N writes (0 = every write)
    #[arg(long, default_value = "0")]
    sync_every: usize,
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,knowsql=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();

    tracing::info!("knowsql Server v{}", knowsql::VERSION);
    tracing::info!("Data directory: {}", args.data_dir);

    let sync_strategy = match args.sync_every {
        0 => WalSyncStrategy::EveryWrite,
        count => WalSyncStrategy::EveryNEntries { count },
    };

    // Build config from args
    let config = Config::builder()
        .data_dir(&args.data_dir)
        .listen_addr(format!("{}:{}", args.host, args.port))
        .max_connections(args.max_connections)
        .wal_sync_strategy(sync_strategy)
        .build();

    // Recover the store before the port opens
    let store = match Store::open(config.clone()) {
        Ok(store) => Arc::new(store),
        Err(e) => {
            tracing::error!("Failed to open store: {}", e);
            std::process::exit(1);
        }
    };

    tracing::info!(keys = store.len(), "Store ready");

    let server = match Server::bind(config, Arc::clone(&store)) {
        Ok(server) => server,
        Err(e) => {
            tracing::error!("Failed to start server: {}", e);
            std::process::exit(1);
        }
    };

    let shutdown = server.shutdown_handle();
    if let Err(e) = ctrlc::set_handler(move || {
        tracing::info!("Received termination signal, initiating shutdown...");
        shutdown.shutdown();
    }) {
        tracing::warn!("Could not install signal handler: {}", e);
    }

    if let Err(e) = server.run() {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }

    if let Err(e) = store.close() {
        tracing::error!("Failed to sync store on shutdown: {}", e);
        std::process::exit(1);
    }

    tracing::info!("Server stopped");
}
