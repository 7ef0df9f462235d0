//! Connection management for player and game clients.
//!
//! This module holds the player connection handle, the TCP listener shared by
//! the player port and the game bridge port, and the per-connection writer
//! task.

pub mod client;
pub mod listener;

pub use client::PlayerConnection;
pub use listener::{ConnectionListener, ListenerOptions, StreamHandler};

use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Type alias for connection identifiers.
///
/// Connection IDs are assigned in accept order and are unique for the
/// lifetime of a listener.
pub type ConnectionId = usize;

/// Errors raised when talking to a connection.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    #[error("Connection {0} is closed")]
    Closed(ConnectionId),
}

/// Drains `rx` into `writer` until the queue closes or `shutdown` fires.
///
/// Bytes queued before `shutdown` fires are still written. The write half is
/// shut down on exit so the peer sees EOF.
pub(crate) async fn run_writer<W>(
    id: ConnectionId,
    mut writer: W,
    mut rx: mpsc::UnboundedReceiver<Vec<u8>>,
    shutdown: CancellationToken,
) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    loop {
        tokio::select! {
            biased;
            next = rx.recv() => match next {
                Some(bytes) => {
                    writer.write_all(&bytes).await?;
                    writer.flush().await?;
                    debug!("📤 Wrote {} bytes to connection {}", bytes.len(), id);
                }
                None => break,
            },
            _ = shutdown.cancelled() => break,
        }
    }
    writer.shutdown().await.ok();
    Ok(())
}
