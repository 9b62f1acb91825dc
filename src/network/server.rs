//! TCP Server
//!
//! Accepts connections and dispatches them to the worker pool.

use std::io::ErrorKind;
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crate::config::Config;
use crate::error::{KnowsqlError, Result};
use crate::executor::Executor;
use crate::protocol::{write_response, Response};
use crate::store::Store;
use super::{Connection, WorkerPool};

/// How often the non-blocking accept loop checks for new work
const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Cloneable flag that asks the server and its connections to stop
#[derive(Debug, Clone, Default)]
pub struct ShutdownHandle {
    flag: Arc<AtomicBool>,
}

impl ShutdownHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Signal the server to shutdown gracefully
    pub fn shutdown(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_shutdown(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// TCP server for knowsql
pub struct Server {
    config: Config,
    listener: TcpListener,
    local_addr: SocketAddr,
    executor: Executor,
    pool: WorkerPool,
    shutdown: ShutdownHandle,
}

impl Server {
    /// Bind the listen address and start the worker pool
    ///
    /// The store must already be open, so no client ever sees it half
    /// recovered.
    pub fn bind(config: Config, store: Arc<Store>) -> Result<Self> {
        config.validate()?;

        let listener = TcpListener::bind(&config.listen_addr).map_err(|e| {
            KnowsqlError::Startup(format!("cannot bind {}: {}", config.listen_addr, e))
        })?;
        listener.set_nonblocking(true)?;
        let local_addr = listener.local_addr()?;

        let pool = WorkerPool::new(config.max_connections, config.pending_connections)?;

        tracing::info!(
            addr = %local_addr,
            workers = pool.size(),
            "Listening for connections"
        );

        Ok(Self {
            config,
            listener,
            local_addr,
            executor: Executor::new(store),
            pool,
            shutdown: ShutdownHandle::new(),
        })
    }

    /// Address actually bound (useful with port 0)
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Handle for stopping [`Server::run`] from another thread
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.shutdown.clone()
    }

    /// Accept connections until shutdown is requested (blocking)
    ///
    /// After shutdown no new connections are accepted; open ones get up to
    /// `shutdown_grace_ms` to finish their current request.
    pub fn run(self) -> Result<()> {
        while !self.shutdown.is_shutdown() {
            match self.listener.accept() {
                Ok((stream, addr)) => self.dispatch(stream, addr),
                Err(e) if e.kind() == ErrorKind::WouldBlock => thread::sleep(ACCEPT_POLL_INTERVAL),
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    tracing::error!("Failed to accept connection: {}", e);
                    thread::sleep(ACCEPT_POLL_INTERVAL);
                }
            }
        }

        tracing::info!("Shutdown requested, no longer accepting connections");
        let Server {
            config,
            listener,
            pool,
            ..
        } = self;
        drop(listener);

        let deadline = Instant::now() + Duration::from_millis(config.shutdown_grace_ms);
        while (pool.active() > 0 || pool.queued() > 0) && Instant::now() < deadline {
            thread::sleep(ACCEPT_POLL_INTERVAL);
        }

        if pool.active() > 0 || pool.queued() > 0 {
            tracing::warn!(
                open = pool.active(),
                "Grace period over, abandoning open connections"
            );
        } else {
            pool.join();
        }

        Ok(())
    }

    /// Hand an accepted stream to the pool, or turn it away if saturated
    fn dispatch(&self, stream: TcpStream, addr: SocketAddr) {
        // Accepted sockets may inherit the listener's non-blocking mode
        if let Err(e) = stream.set_nonblocking(false) {
            tracing::warn!("Dropping {}: {}", addr, e);
            return;
        }

        let busy_reply = stream.try_clone();
        let executor = self.executor.clone();
        let shutdown = self.shutdown.clone();
        let max_line_length = self.config.max_line_length;
        let read_timeout_ms = self.config.read_timeout_ms;
        let write_timeout_ms = self.config.write_timeout_ms;

        let job = move || {
            let mut connection = match Connection::new(stream, executor, shutdown, max_line_length) {
                Ok(connection) => connection,
                Err(e) => {
                    tracing::warn!("Failed to set up connection from {}: {}", addr, e);
                    return;
                }
            };
            if let Err(e) = connection.set_timeouts(read_timeout_ms, write_timeout_ms) {
                tracing::warn!("Failed to set timeouts for {}: {}", addr, e);
                return;
            }
            if let Err(e) = connection.handle() {
                tracing::debug!("Connection {} ended with error: {}", connection.peer_addr(), e);
            }
        };

        if let Err(e) = self.pool.try_spawn(job) {
            tracing::warn!("Rejecting {}: {}", addr, e);
            if let Ok(mut stream) = busy_reply {
                let _ = write_response(&mut stream, &Response::error(e.to_string()));
            }
        }
    }
}
