//! Player connection handle.
//!
//! A [`PlayerConnection`] is the handle the rest of the server uses to refer
//! to one player's network link. Cloning it is cheap and every clone refers to
//! the same link; equality is handle identity.

use super::{ConnectionError, ConnectionId};
use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Handle to an individual player connection.
///
/// Outbound bytes are queued on an unbounded channel drained by the
/// connection's writer task, so [`PlayerConnection::send`] never blocks the
/// caller on the socket.
#[derive(Clone)]
pub struct PlayerConnection {
    inner: Arc<ConnectionInner>,
}

struct ConnectionInner {
    /// Server-local identifier, used in logs and on the game bridge wire
    id: ConnectionId,

    /// The remote network address of the client
    remote_addr: SocketAddr,

    /// Queue feeding the writer task
    outbound: mpsc::UnboundedSender<Vec<u8>>,

    /// Cancelled when the connection is terminated
    shutdown: CancellationToken,
}

impl PlayerConnection {
    /// Creates a connection handle and the receiving end of its outbound queue.
    ///
    /// Whoever owns the socket drains the returned receiver and writes each
    /// buffer to the stream.
    pub fn new(
        id: ConnectionId,
        remote_addr: SocketAddr,
    ) -> (Self, mpsc::UnboundedReceiver<Vec<u8>>) {
        Self::with_shutdown(id, remote_addr, CancellationToken::new())
    }

    /// Like [`PlayerConnection::new`], tying the connection's lifetime to
    /// `shutdown`. Cancelling `shutdown` terminates the connection.
    pub fn with_shutdown(
        id: ConnectionId,
        remote_addr: SocketAddr,
        shutdown: CancellationToken,
    ) -> (Self, mpsc::UnboundedReceiver<Vec<u8>>) {
        let (outbound, rx) = mpsc::unbounded_channel();
        let connection = Self {
            inner: Arc::new(ConnectionInner {
                id,
                remote_addr,
                outbound,
                shutdown,
            }),
        };
        (connection, rx)
    }

    pub fn id(&self) -> ConnectionId {
        self.inner.id
    }

    pub fn remote_addr(&self) -> SocketAddr {
        self.inner.remote_addr
    }

    /// Queues `data` for delivery to the player.
    pub fn send(&self, data: Vec<u8>) -> Result<(), ConnectionError> {
        if self.is_closed() {
            return Err(ConnectionError::Closed(self.inner.id));
        }
        self.inner
            .outbound
            .send(data)
            .map_err(|_| ConnectionError::Closed(self.inner.id))
    }

    /// Terminates the connection. Reader and writer tasks stop and the
    /// socket is dropped.
    pub fn close(&self) {
        self.inner.shutdown.cancel();
    }

    pub fn is_closed(&self) -> bool {
        self.inner.shutdown.is_cancelled() || self.inner.outbound.is_closed()
    }

    /// Resolves once the connection has been terminated.
    pub async fn closed(&self) {
        self.inner.shutdown.cancelled().await
    }

    pub(crate) fn shutdown_token(&self) -> CancellationToken {
        self.inner.shutdown.clone()
    }
}

impl PartialEq for PlayerConnection {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for PlayerConnection {}

impl fmt::Debug for PlayerConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlayerConnection")
            .field("id", &self.inner.id)
            .field("remote_addr", &self.inner.remote_addr)
            .field("closed", &self.is_closed())
            .finish()
    }
}
