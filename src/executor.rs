//! Command executor
//!
//! Applies parsed commands to the [`Store`] and turns the outcome into a
//! [`Response`].

use std::sync::Arc;

use bytes::Bytes;

use crate::protocol::{Command, Response};
use crate::store::Store;

/// Executes commands against a shared store
#[derive(Clone)]
pub struct Executor {
    store: Arc<Store>,
}

impl Executor {
    pub fn new(store: Arc<Store>) -> Self {
        Self { store }
    }

    /// Run one command
    ///
    /// Store failures become `Error` responses; they never escape.
    pub fn execute(&self, command: Command) -> Response {
        match command {
            Command::Get { key } => match self.store.get(&key) {
                Some(value) => Response::Value(value),
                None => Response::NotFound,
            },
            Command::Set { key, value } => match self.store.set(&key, &value) {
                Ok(()) => Response::Ok,
                Err(e) => self.failed("set", e),
            },
            Command::Delete { key } => match self.store.delete(&key) {
                Ok(true) => Response::Ok,
                Ok(false) => Response::NotFound,
                Err(e) => self.failed("del", e),
            },
            Command::Incr { key } => match self.store.incr(&key) {
                Ok(value) => Response::value(value.to_string()),
                Err(e) => self.failed("incr", e),
            },
            Command::List => Response::Keys(self.store.keys()),
            Command::Ping => Response::Value(Bytes::from_static(b"PONG")),
            Command::Exit => Response::Bye,
        }
    }

    fn failed(&self, verb: &str, error: crate::KnowsqlError) -> Response {
        tracing::warn!(command = verb, "Command failed: {}", error);
        Response::error(error.to_string())
    }

    pub fn store(&self) -> &Arc<Store> {
        &self.store
    }
}
