//! # knowsql
//!
//! A small key-value server with:
//! - A line-oriented text protocol over TCP (`set`, `get`, `del`, ...)
//! - Write-Ahead Logging (WAL) for durability
//! - Crash recovery with partial write handling
//! - Single-writer/multi-reader concurrency model
//! - A bounded worker pool for client connections
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 TCP Server + Worker Pool                     │
//! │                  (Multiple Clients)                          │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │ one line in, one line out
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │              Parser  →  Executor                             │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                       Store                                  │
//! │            (Single Writer / Multi Reader)                    │
//! └──────────┬──────────────────────────────┬───────────────────┘
//!            │                              │
//!            ▼                              ▼
//!     ┌─────────────┐               ┌─────────────┐
//!     │     WAL     │               │  MemTable   │
//!     │  (Append)   │               │  (RwLock)   │
//!     └─────────────┘               └─────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod wal;
pub mod memtable;
pub mod store;
pub mod protocol;
pub mod executor;
pub mod network;
pub mod client;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{KnowsqlError, Result};
pub use config::Config;
pub use store::Store;
pub use executor::Executor;
pub use client::Client;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of knowsql
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
