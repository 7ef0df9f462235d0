//! TCP listener with a single accept loop.
//!
//! [`ConnectionListener`] binds a socket, accepts connections in a background
//! task and hands every accepted stream to a [`StreamHandler`] running in its
//! own task. The same listener serves the player port and the game bridge
//! port; only the handler differs.

use crate::error::ServerError;
use async_trait::async_trait;
use socket2::{Domain, Protocol, Socket, Type};
use std::io;
use std::net::{SocketAddr, TcpListener as StdTcpListener};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Per-connection logic plugged into a [`ConnectionListener`].
#[async_trait]
pub trait StreamHandler: Send + Sync + 'static {
    /// Serves one accepted connection until it ends.
    ///
    /// `shutdown` is cancelled when the listener disconnects all of its
    /// connections; implementations should stop promptly when it fires.
    async fn handle(
        &self,
        stream: TcpStream,
        remote_addr: SocketAddr,
        shutdown: CancellationToken,
    ) -> Result<(), ServerError>;
}

/// Socket options for a [`ConnectionListener`].
#[derive(Debug, Clone, Copy)]
pub struct ListenerOptions {
    /// Backlog passed to `listen(2)`
    pub backlog: i32,
}

impl Default for ListenerOptions {
    fn default() -> Self {
        Self { backlog: 1024 }
    }
}

/// A bound TCP listener and its accept loop.
pub struct ConnectionListener {
    /// Address actually bound (resolves port 0)
    local_addr: SocketAddr,

    /// Cancelled to stop the accept loop
    accept_shutdown: CancellationToken,

    /// Parent of every per-connection token
    connections: CancellationToken,

    /// Accept loop task, taken on close
    accept_task: Mutex<Option<JoinHandle<()>>>,
}

impl ConnectionListener {
    /// Binds `addr` and starts accepting connections.
    ///
    /// Binding happens before this function returns, so a failure to bind is
    /// reported here as [`ServerError::Bind`] and never retried.
    pub async fn bind(
        addr: SocketAddr,
        options: ListenerOptions,
        handler: Arc<dyn StreamHandler>,
    ) -> Result<Self, ServerError> {
        let listener = bind_socket(addr, options)?;
        let local_addr = listener
            .local_addr()
            .map_err(|source| ServerError::Bind { addr, source })?;

        let accept_shutdown = CancellationToken::new();
        let connections = CancellationToken::new();

        let accept_task = tokio::spawn(accept_loop(
            listener,
            handler,
            accept_shutdown.clone(),
            connections.clone(),
        ));

        info!("✅ Listener bound on {}", local_addr);

        Ok(Self {
            local_addr,
            accept_shutdown,
            connections,
            accept_task: Mutex::new(Some(accept_task)),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Stops accepting new connections.
    ///
    /// Returns once the listening socket has been dropped. Connections that
    /// were already accepted keep running.
    pub async fn close(&self) {
        self.accept_shutdown.cancel();
        let task = self.accept_task.lock().await.take();
        if let Some(task) = task {
            if let Err(e) = task.await {
                warn!("Accept loop for {} ended abnormally: {}", self.local_addr, e);
            }
            info!("🔒 Listener on {} closed", self.local_addr);
        }
    }

    /// Terminates every connection accepted by this listener.
    pub fn disconnect_all(&self) {
        self.connections.cancel();
    }

    pub fn is_closed(&self) -> bool {
        self.accept_shutdown.is_cancelled()
    }
}

/// Creates, configures and binds the listening socket.
fn bind_socket(addr: SocketAddr, options: ListenerOptions) -> Result<TcpListener, ServerError> {
    let bind_error = |source: io::Error| ServerError::Bind { addr, source };

    let socket = Socket::new(Domain::for_address(addr), Type::STREAM, Some(Protocol::TCP))
        .map_err(bind_error)?;
    socket.set_reuse_address(true).ok();
    socket.bind(&addr.into()).map_err(bind_error)?;
    socket.listen(options.backlog).map_err(bind_error)?;

    let std_listener: StdTcpListener = socket.into();
    std_listener.set_nonblocking(true).map_err(bind_error)?;

    TcpListener::from_std(std_listener).map_err(bind_error)
}

/// Pause before accepting again after a listener-level failure.
const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_millis(100);

/// How long to wait before the next `accept` after `err`.
///
/// Errors that belong to a single incoming connection are retried at once.
/// Anything else (EMFILE, ENFILE, ENOBUFS and the like) backs off briefly so
/// the loop does not spin while resources are exhausted.
fn accept_backoff(err: &io::Error) -> Option<Duration> {
    match err.kind() {
        io::ErrorKind::ConnectionAborted
        | io::ErrorKind::ConnectionReset
        | io::ErrorKind::ConnectionRefused
        | io::ErrorKind::Interrupted
        | io::ErrorKind::WouldBlock => None,
        _ => Some(ACCEPT_ERROR_BACKOFF),
    }
}

async fn accept_loop(
    listener: TcpListener,
    handler: Arc<dyn StreamHandler>,
    shutdown: CancellationToken,
    connections: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            accepted = listener.accept() => match accepted {
                Ok((stream, addr)) => {
                    let handler = handler.clone();
                    let connection_shutdown = connections.child_token();

                    // Spawn individual connection handler
                    tokio::spawn(async move {
                        if let Err(e) = handler.handle(stream, addr, connection_shutdown).await {
                            error!("Connection error from {}: {}", addr, e);
                        }
                    });
                }
                Err(e) => match accept_backoff(&e) {
                    None => warn!("Dropped connection during accept: {}", e),
                    Some(delay) => {
                        error!("Failed to accept connection: {}; retrying in {:?}", e, delay);
                        tokio::select! {
                            _ = shutdown.cancelled() => break,
                            _ = tokio::time::sleep(delay) => {}
                        }
                    }
                },
            },
        }
    }
    // Dropping `listener` here closes the socket, so later connection
    // attempts are refused.
}
