//! Per-connection handling for the player port.
//!
//! Each accepted player stream gets a [`PlayerConnection`] handle, a writer
//! task draining its outbound queue, and a read loop that frames, decodes and
//! forwards messages to the coordinator's dispatch task.

use crate::connection::{run_writer, ConnectionId, PlayerConnection, StreamHandler};
use crate::error::ServerError;
use crate::messaging::{decode_message, FramingMode, PlayerFrameCodec, SessionEvent};
use async_trait::async_trait;
use futures::StreamExt;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_util::codec::FramedRead;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// [`StreamHandler`] for player connections.
pub struct PlayerStreamHandler {
    events: mpsc::UnboundedSender<SessionEvent>,
    framing: FramingMode,
    max_frame_length: usize,
    next_id: AtomicUsize,
}

impl PlayerStreamHandler {
    pub fn new(
        events: mpsc::UnboundedSender<SessionEvent>,
        framing: FramingMode,
        max_frame_length: usize,
    ) -> Self {
        Self {
            events,
            framing,
            max_frame_length,
            next_id: AtomicUsize::new(1),
        }
    }

    fn next_connection_id(&self) -> ConnectionId {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }
}

#[async_trait]
impl StreamHandler for PlayerStreamHandler {
    /// Serves one player until EOF, a decode error, or shutdown.
    ///
    /// A frame that fails to decode terminates this connection only; the
    /// error is returned so the accept loop logs it.
    async fn handle(
        &self,
        stream: TcpStream,
        remote_addr: SocketAddr,
        shutdown: CancellationToken,
    ) -> Result<(), ServerError> {
        let id = self.next_connection_id();
        let (read_half, write_half) = stream.into_split();
        let (connection, outbound) = PlayerConnection::with_shutdown(id, remote_addr, shutdown);
        info!("🔗 Player connection {} from {}", id, remote_addr);

        let writer_shutdown = connection.shutdown_token();
        tokio::spawn(async move {
            if let Err(e) = run_writer(id, write_half, outbound, writer_shutdown).await {
                warn!("Write to player connection {} failed: {}", id, e);
            }
        });

        let mut frames = FramedRead::new(
            read_half,
            PlayerFrameCodec::new(self.framing, self.max_frame_length),
        );

        let result = loop {
            let frame = tokio::select! {
                _ = connection.closed() => break Ok(()),
                frame = frames.next() => frame,
            };

            let frame = match frame {
                Some(Ok(frame)) => frame,
                Some(Err(e)) => {
                    break Err(ServerError::Network(format!(
                        "Failed to read from connection {}: {}",
                        id, e
                    )))
                }
                None => break Ok(()),
            };

            match decode_message(&frame) {
                Ok(Some(message)) => {
                    let event = SessionEvent::new(connection.clone(), message);
                    if self.events.send(event).is_err() {
                        debug!("Dispatcher stopped; dropping connection {}", id);
                        break Ok(());
                    }
                }
                Ok(None) => {}
                Err(e) => {
                    warn!(
                        "🚫 Undecodable message from connection {} ({}); disconnecting",
                        id, e
                    );
                    break Err(e.into());
                }
            }
        };

        connection.close();
        info!("👋 Player connection {} from {} closed", id, remote_addr);
        result
    }
}
