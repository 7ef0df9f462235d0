//! TCP bridge to an out-of-process game engine.
//!
//! [`GameBridge`] is a [`GameCollaborator`] for deployments where the game
//! rules run in a separate process. Game clients connect to the game port and
//! exchange newline-delimited JSON with the bridge (see [`protocol`]):
//!
//! * `add_player` and `make_move` are broadcast to every connected game client
//!   as [`BridgeCommand`]s, addressing players by connection id
//! * game clients report [`GameReport::Initialised`] to announce the game id,
//!   and use [`GameReport::Send`] / [`GameReport::Disconnect`] to talk to
//!   players through the bridge

pub mod protocol;

pub use protocol::{BridgeCommand, GameReport};

use crate::collaborator::{CollaboratorError, GameCollaborator, GameId, GameNotifier};
use crate::colour::Colour;
use crate::config::DEFAULT_MAX_FRAME_LENGTH;
use crate::connection::{
    run_writer, ConnectionId, ConnectionListener, ListenerOptions, PlayerConnection,
    StreamHandler,
};
use crate::error::ServerError;
use async_trait::async_trait;
use dashmap::DashMap;
use futures::StreamExt;
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, Mutex};
use tokio_util::codec::{FramedRead, LinesCodec};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// State shared between the bridge and its game client handlers.
#[derive(Default)]
struct BridgeShared {
    /// Players added through `add_player`, for routing `SEND` reports
    players: DashMap<ConnectionId, PlayerConnection>,

    /// Outbound queues of connected game clients
    game_clients: DashMap<usize, mpsc::UnboundedSender<Vec<u8>>>,

    next_client_id: AtomicUsize,
}

/// Game collaborator that relays to game clients over TCP.
pub struct GameBridge {
    shared: Arc<BridgeShared>,
    listener: Mutex<Option<ConnectionListener>>,
    options: ListenerOptions,
    max_line_length: usize,
}

impl GameBridge {
    pub fn new() -> Self {
        Self::with_max_line_length(DEFAULT_MAX_FRAME_LENGTH)
    }

    pub fn with_max_line_length(max_line_length: usize) -> Self {
        Self {
            shared: Arc::new(BridgeShared::default()),
            listener: Mutex::new(None),
            options: ListenerOptions::default(),
            max_line_length,
        }
    }

    /// Address of the game listener, while listening.
    pub async fn local_addr(&self) -> Option<SocketAddr> {
        self.listener
            .lock()
            .await
            .as_ref()
            .map(ConnectionListener::local_addr)
    }

    pub fn game_client_count(&self) -> usize {
        self.shared.game_clients.len()
    }

    /// Sends `command` to every connected game client.
    fn broadcast(&self, command: &BridgeCommand) -> Result<(), CollaboratorError> {
        let line = command.to_line()?;

        let mut delivered = 0;
        for client in self.shared.game_clients.iter() {
            if client.value().send(line.clone().into_bytes()).is_ok() {
                delivered += 1;
            }
        }

        if delivered == 0 {
            return Err(CollaboratorError::NoGameClient);
        }
        debug!("📡 Broadcast to {} game client(s): {}", delivered, line.trim_end());
        Ok(())
    }
}

impl Default for GameBridge {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GameCollaborator for GameBridge {
    async fn listen(
        &self,
        addr: SocketAddr,
        notifier: GameNotifier,
    ) -> Result<(), CollaboratorError> {
        let mut listener = self.listener.lock().await;
        if listener.is_some() {
            return Err(CollaboratorError::Listen {
                addr,
                reason: "already listening".to_string(),
            });
        }

        let handler = Arc::new(GameClientHandler {
            shared: self.shared.clone(),
            notifier,
            max_line_length: self.max_line_length,
        });
        let bound = ConnectionListener::bind(addr, self.options, handler)
            .await
            .map_err(|e| CollaboratorError::Listen {
                addr,
                reason: e.to_string(),
            })?;

        info!("🎮 Game bridge listening on {}", bound.local_addr());
        *listener = Some(bound);
        Ok(())
    }

    async fn close(&self) -> Result<(), CollaboratorError> {
        if let Some(listener) = self.listener.lock().await.take() {
            listener.close().await;
            listener.disconnect_all();
        }
        self.shared.players.clear();
        Ok(())
    }

    async fn add_player(
        &self,
        connection: &PlayerConnection,
        colour: Colour,
        game_id: GameId,
    ) -> Result<(), CollaboratorError> {
        self.shared.players.retain(|_, player| !player.is_closed());
        self.shared
            .players
            .insert(connection.id(), connection.clone());

        self.broadcast(&BridgeCommand::AddPlayer {
            player: connection.id(),
            colour,
            game_id,
        })
    }

    async fn make_move(
        &self,
        connection: &PlayerConnection,
        payload: Value,
    ) -> Result<(), CollaboratorError> {
        self.broadcast(&BridgeCommand::Move {
            player: connection.id(),
            payload,
        })
    }
}

/// Serves one game client connection.
struct GameClientHandler {
    shared: Arc<BridgeShared>,
    notifier: GameNotifier,
    max_line_length: usize,
}

impl GameClientHandler {
    fn handle_line(&self, client_id: usize, line: &str) {
        if line.trim().is_empty() {
            return;
        }

        let report: GameReport = match serde_json::from_str(line) {
            Ok(report) => report,
            Err(e) => {
                warn!("Skipping malformed line from game client {}: {}", client_id, e);
                return;
            }
        };

        match report {
            GameReport::Initialised { game_id } => {
                if !self.notifier.initialised(game_id) {
                    warn!("Game {} initialised after the session server stopped", game_id);
                }
            }
            GameReport::Send { player, data } => self.send_to_player(player, &data),
            GameReport::Disconnect { player } => {
                if let Some((_, connection)) = self.shared.players.remove(&player) {
                    info!("Game client {} disconnected player {}", client_id, player);
                    connection.close();
                }
            }
        }
    }

    fn send_to_player(&self, player: ConnectionId, data: &Value) {
        let connection = self.shared.players.get(&player).map(|c| c.clone());
        let Some(connection) = connection else {
            warn!("Game tried to message unknown player {}", player);
            return;
        };

        let mut bytes = match serde_json::to_vec(data) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("Failed to serialize message for player {}: {}", player, e);
                return;
            }
        };
        bytes.push(b'\n');

        if let Err(e) = connection.send(bytes) {
            warn!("Dropping message for player {}: {}", player, e);
            self.shared.players.remove(&player);
        }
    }
}

#[async_trait]
impl StreamHandler for GameClientHandler {
    async fn handle(
        &self,
        stream: TcpStream,
        remote_addr: SocketAddr,
        shutdown: CancellationToken,
    ) -> Result<(), ServerError> {
        let client_id = self.shared.next_client_id.fetch_add(1, Ordering::Relaxed);
        let (read_half, write_half) = stream.into_split();
        let (outbound, rx) = mpsc::unbounded_channel();
        self.shared.game_clients.insert(client_id, outbound);
        info!("🎮 Game client {} connected from {}", client_id, remote_addr);

        let writer_shutdown = shutdown.clone();
        tokio::spawn(async move {
            if let Err(e) = run_writer(client_id, write_half, rx, writer_shutdown).await {
                warn!("Write to game client {} failed: {}", client_id, e);
            }
        });

        let mut lines = FramedRead::new(
            read_half,
            LinesCodec::new_with_max_length(self.max_line_length),
        );

        let result = loop {
            tokio::select! {
                _ = shutdown.cancelled() => break Ok(()),
                line = lines.next() => match line {
                    Some(Ok(line)) => self.handle_line(client_id, &line),
                    Some(Err(e)) => {
                        break Err(ServerError::Network(format!(
                            "Game client {} stream failed: {}",
                            client_id, e
                        )))
                    }
                    None => break Ok(()),
                },
            }
        };

        self.shared.game_clients.remove(&client_id);
        shutdown.cancel();
        info!("🎮 Game client {} disconnected", client_id);
        result
    }
}
