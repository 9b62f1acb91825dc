//! TCP client
//!
//! Blocking client for the line protocol, used by `knowsql-cli` and tests.

use std::io::{BufReader, BufWriter};
use std::net::{TcpStream, ToSocketAddrs};

use bytes::Bytes;

use crate::error::{KnowsqlError, Result};
use crate::protocol::{read_response, write_command, Command, Response};

/// Longest response line the client accepts (`list` can be large)
const MAX_RESPONSE_LINE: usize = 64 * 1024 * 1024;

/// A connection to a knowsql server
pub struct Client {
    reader: BufReader<TcpStream>,
    writer: BufWriter<TcpStream>,
}

impl Client {
    /// Connect to a server
    pub fn connect<A: ToSocketAddrs>(addr: A) -> Result<Self> {
        let stream = TcpStream::connect(addr)?;
        stream.set_nodelay(true)?;
        let read_stream = stream.try_clone()?;

        Ok(Self {
            reader: BufReader::new(read_stream),
            writer: BufWriter::new(stream),
        })
    }

    /// Send one command and wait for its response
    pub fn execute(&mut self, command: &Command) -> Result<Response> {
        tracing::trace!("Sending {:?}", command);
        write_command(&mut self.writer, command)?;
        read_response(&mut self.reader, MAX_RESPONSE_LINE)
    }

    /// Get a value; `None` when the key is not bound
    pub fn get(&mut self, key: &[u8]) -> Result<Option<Bytes>> {
        match self.execute(&Command::Get { key: key.to_vec() })? {
            Response::Value(value) => Ok(Some(value)),
            Response::NotFound => Ok(None),
            other => Err(unexpected(other)),
        }
    }

    pub fn set(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        let command = Command::Set {
            key: key.to_vec(),
            value: value.to_vec(),
        };
        match self.execute(&command)? {
            Response::Ok => Ok(()),
            other => Err(unexpected(other)),
        }
    }

    /// Delete a key; `false` when it was not bound
    pub fn del(&mut self, key: &[u8]) -> Result<bool> {
        match self.execute(&Command::Delete { key: key.to_vec() })? {
            Response::Ok => Ok(true),
            Response::NotFound => Ok(false),
            other => Err(unexpected(other)),
        }
    }

    pub fn incr(&mut self, key: &[u8]) -> Result<i64> {
        match self.execute(&Command::Incr { key: key.to_vec() })? {
            Response::Value(value) => std::str::from_utf8(&value)
                .ok()
                .and_then(|s| s.parse().ok())
                .ok_or_else(|| KnowsqlError::Protocol("incr returned a non-integer".to_string())),
            other => Err(unexpected(other)),
        }
    }

    /// All keys on the server
    pub fn list(&mut self) -> Result<Vec<Bytes>> {
        match self.execute(&Command::List)? {
            Response::Value(line) => Ok(line
                .split(|b| *b == b' ')
                .filter(|k| !k.is_empty())
                .map(|k| line.slice_ref(k))
                .collect()),
            other => Err(unexpected(other)),
        }
    }

    pub fn ping(&mut self) -> Result<()> {
        match self.execute(&Command::Ping)? {
            Response::Value(v) if v.as_ref() == b"PONG" => Ok(()),
            other => Err(unexpected(other)),
        }
    }

    /// Say goodbye; the server closes the connection
    pub fn exit(mut self) -> Result<()> {
        match self.execute(&Command::Exit)? {
            Response::Bye => Ok(()),
            other => Err(unexpected(other)),
        }
    }
}

fn unexpected(response: Response) -> KnowsqlError {
    match response {
        Response::Error(reason) => KnowsqlError::Server(reason),
        other => KnowsqlError::Protocol(format!("unexpected response: {:?}", other)),
    }
}
