//! Connection Handler
//!
//! Handles individual client connections.

use std::io::{BufReader, BufWriter};
use std::net::TcpStream;
use std::time::Duration;

use crate::error::{KnowsqlError, Result};
use crate::executor::Executor;
use crate::protocol::{parse_command, read_line, write_response, Command, Response};
use super::ShutdownHandle;

/// Handles a single client connection
pub struct Connection {
    /// TCP stream reader (buffered for efficiency)
    reader: BufReader<TcpStream>,

    /// TCP stream writer (buffered for efficiency)
    writer: BufWriter<TcpStream>,

    executor: Executor,

    /// Peer address for logging
    peer_addr: String,

    max_line_length: usize,

    shutdown: ShutdownHandle,
}

impl Connection {
    /// Create a new connection handler
    ///
    /// Sets up buffered I/O on two handles to the same socket
    pub fn new(
        stream: TcpStream,
        executor: Executor,
        shutdown: ShutdownHandle,
        max_line_length: usize,
    ) -> Result<Self> {
        // Get peer address for logging before we split the stream
        let peer_addr = stream
            .peer_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|_| "unknown".to_string());

        // Disable Nagle's algorithm for low latency
        stream.set_nodelay(true)?;

        // Clone stream for separate read/write handles
        let read_stream = stream.try_clone()?;
        let write_stream = stream;

        Ok(Self {
            reader: BufReader::new(read_stream),
            writer: BufWriter::new(write_stream),
            executor,
            peer_addr,
            max_line_length,
            shutdown,
        })
    }

    /// Configure connection timeouts (0 disables)
    pub fn set_timeouts(&mut self, read_ms: u64, write_ms: u64) -> Result<()> {
        let read_timeout = (read_ms > 0).then(|| Duration::from_millis(read_ms));
        let write_timeout = (write_ms > 0).then(|| Duration::from_millis(write_ms));

        self.reader.get_ref().set_read_timeout(read_timeout)?;
        self.writer.get_ref().set_write_timeout(write_timeout)?;
        Ok(())
    }

    /// Handle the connection (blocking until closed)
    ///
    /// Each turn reads one line, dispatches it and writes one response line.
    /// Returns when the client disconnects, says `exit`, goes idle past the
    /// read timeout, or the server is shutting down.
    pub fn handle(&mut self) -> Result<()> {
        tracing::debug!("Connection established from {}", self.peer_addr);

        loop {
            if self.shutdown.is_shutdown() {
                tracing::debug!("Closing {} for shutdown", self.peer_addr);
                return Ok(());
            }

            // Reading
            let line = match read_line(&mut self.reader, self.max_line_length) {
                Ok(Some(line)) => line,
                Ok(None) => {
                    tracing::debug!("Client {} disconnected", self.peer_addr);
                    return Ok(());
                }
                Err(e @ KnowsqlError::LineTooLong { .. }) => {
                    // The rest of the line is still unread; we cannot resync
                    tracing::warn!("Dropping {}: {}", self.peer_addr, e);
                    let _ = self.send_response(&Response::error(e.to_string()));
                    return Ok(());
                }
                Err(e) if e.is_disconnect() => {
                    tracing::debug!("Client {} gone or idle: {}", self.peer_addr, e);
                    return Ok(());
                }
                Err(e) => {
                    tracing::warn!("Error reading from {}: {}", self.peer_addr, e);
                    return Err(e);
                }
            };

            // Dispatching
            let (response, close) = self.dispatch(&line);

            // Writing
            if let Err(e) = self.send_response(&response) {
                if e.is_disconnect() {
                    tracing::debug!(
                        "Client {} disconnected before response could be sent: {}",
                        self.peer_addr, e
                    );
                    return Ok(());
                }
                tracing::warn!("Error writing to {}: {}", self.peer_addr, e);
                return Err(e);
            }

            if close {
                tracing::debug!("Client {} said goodbye", self.peer_addr);
                return Ok(());
            }
        }
    }

    /// Parse and execute one line
    ///
    /// Returns the response and whether the connection should close after it.
    fn dispatch(&self, line: &[u8]) -> (Response, bool) {
        let command = match parse_command(line) {
            Ok(command) => command,
            Err(e) => {
                tracing::debug!("Bad request from {}: {}", self.peer_addr, e);
                return (Response::error(e.to_string()), false);
            }
        };

        tracing::trace!("Received command from {}: {:?}", self.peer_addr, command);

        let close = command == Command::Exit;
        (self.executor.execute(command), close)
    }

    /// Send a response to the client
    fn send_response(&mut self, response: &Response) -> Result<()> {
        write_response(&mut self.writer, response)
    }

    /// Get the peer address string
    pub fn peer_addr(&self) -> &str {
        &self.peer_addr
    }
}
