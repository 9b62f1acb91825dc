//! Response definitions
//!
//! Represents responses to clients.

use bytes::Bytes;

/// A response to send to client
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// Mutation acknowledged
    Ok,

    /// A stored value (or a computed one, e.g. after `incr`)
    Value(Bytes),

    /// The key is not bound
    NotFound,

    /// The request failed; the connection stays usable
    Error(String),

    /// Keys returned by `list`
    Keys(Vec<Bytes>),

    /// Farewell before the server closes the connection
    Bye,
}

impl Response {
    /// Create a value response
    pub fn value(value: impl Into<Bytes>) -> Self {
        Response::Value(value.into())
    }

    /// Create an ERROR response
    pub fn error(message: impl Into<String>) -> Self {
        Response::Error(message.into())
    }
}
