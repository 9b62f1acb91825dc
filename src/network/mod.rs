//! Network Module
//!
//! TCP server and client handling.
//!
//! ## Architecture
//! - Single acceptor thread polling a non-blocking listener
//! - Fixed worker pool, one connection per worker at a time
//! - Commands routed through the Executor

mod server;
mod connection;
mod pool;

pub use server::{Server, ShutdownHandle};
pub use connection::Connection;
pub use pool::WorkerPool;
