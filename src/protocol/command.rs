//! Command definitions
//!
//! Represents commands from clients.

/// A parsed command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Get a value by key
    Get { key: Vec<u8> },

    /// Bind a key to a value
    Set { key: Vec<u8>, value: Vec<u8> },

    /// Delete a key
    Delete { key: Vec<u8> },

    /// Increment the integer stored at a key
    Incr { key: Vec<u8> },

    /// List all keys
    List,

    /// Ping (health check)
    Ping,

    /// Close the connection
    Exit,
}

impl Command {
    /// The verb that introduces this command on the wire
    pub fn verb(&self) -> &'static str {
        match self {
            Command::Get { .. } => "get",
            Command::Set { .. } => "set",
            Command::Delete { .. } => "del",
            Command::Incr { .. } => "incr",
            Command::List => "list",
            Command::Ping => "ping",
            Command::Exit => "exit",
        }
    }
}
