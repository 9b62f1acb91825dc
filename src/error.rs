//! Error types for knowsql
//!
//! Provides a unified error type for all operations.

use thiserror::Error;

/// Result type alias using KnowsqlError
pub type Result<T> = std::result::Result<T, KnowsqlError>;

/// Unified error type for knowsql operations
#[derive(Debug, Error)]
pub enum KnowsqlError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // WAL Errors
    // -------------------------------------------------------------------------
    #[error("WAL corruption detected: {0}")]
    WalCorruption(String),

    /// A mutation could not be made durable; it was not applied
    #[error("durability failure: {0}")]
    Durability(String),

    // -------------------------------------------------------------------------
    // Store Errors
    // -------------------------------------------------------------------------
    #[error("invalid value: {0}")]
    InvalidValue(String),

    // -------------------------------------------------------------------------
    // Serialization Errors
    // -------------------------------------------------------------------------
    #[error("Serialization error: {0}")]
    Serialization(String),

    // -------------------------------------------------------------------------
    // Network Errors
    // -------------------------------------------------------------------------
    #[error("{0}")]
    Protocol(String),

    #[error("line exceeds {limit} bytes")]
    LineTooLong { limit: usize },

    #[error("server busy")]
    ServerBusy,

    /// An `ERR` reply as seen by a client
    #[error("server error: {0}")]
    Server(String),

    // -------------------------------------------------------------------------
    // Startup / Configuration Errors
    // -------------------------------------------------------------------------
    #[error("startup failed: {0}")]
    Startup(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl KnowsqlError {
    /// True for I/O errors that just mean the peer went away or went quiet
    pub fn is_disconnect(&self) -> bool {
        match self {
            KnowsqlError::Io(e) => matches!(
                e.kind(),
                std::io::ErrorKind::UnexpectedEof
                    | std::io::ErrorKind::ConnectionReset
                    | std::io::ErrorKind::ConnectionAborted
                    | std::io::ErrorKind::BrokenPipe
                    | std::io::ErrorKind::WouldBlock
                    | std::io::ErrorKind::TimedOut
            ),
            _ => false,
        }
    }
}
