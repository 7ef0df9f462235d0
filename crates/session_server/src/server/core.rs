//! Core session server implementation.
//!
//! This module contains [`SessionServer`], which owns the lifecycle of the
//! player listener, the game collaborator's listener and the dispatch task
//! that feeds the [`SessionCoordinator`].

use crate::collaborator::{GameCollaborator, GameEvent, GameId, GameNotifier};
use crate::config::ServerConfig;
use crate::connection::{ConnectionListener, ListenerOptions};
use crate::error::ServerError;
use crate::messaging::SessionEvent;
use crate::server::coordinator::SessionCoordinator;
use crate::server::handlers::PlayerStreamHandler;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Lifecycle of a [`SessionServer`].
///
/// `Idle -> Listening -> Closed`; there is no way back from `Closed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    Idle,
    Listening,
    Closed,
}

/// Resources held while the server is listening.
struct Running {
    player_listener: ConnectionListener,
    dispatch_shutdown: CancellationToken,
    dispatch_task: JoinHandle<()>,
}

enum Lifecycle {
    Idle,
    Listening(Running),
    Closed,
}

impl Lifecycle {
    fn state(&self) -> ServerState {
        match self {
            Lifecycle::Idle => ServerState::Idle,
            Lifecycle::Listening(_) => ServerState::Listening,
            Lifecycle::Closed => ServerState::Closed,
        }
    }
}

/// The session server.
///
/// Accepts player connections, decodes their messages and drives the
/// [`SessionCoordinator`]. All coordinator handlers run on one dispatch task,
/// so registrations and moves are handled strictly one after another, and a
/// game notification is never handled concurrently with a player event.
pub struct SessionServer {
    /// Server configuration settings
    config: ServerConfig,

    /// The game-logic component
    collaborator: Arc<dyn GameCollaborator>,

    /// Registration and routing logic plus its state
    coordinator: SessionCoordinator,

    lifecycle: Mutex<Lifecycle>,
}

impl SessionServer {
    /// Creates an idle server. Nothing is bound until [`SessionServer::start`].
    pub fn new(config: ServerConfig, collaborator: Arc<dyn GameCollaborator>) -> Self {
        let coordinator = SessionCoordinator::new(collaborator.clone());
        Self {
            config,
            collaborator,
            coordinator,
            lifecycle: Mutex::new(Lifecycle::Idle),
        }
    }

    /// Starts listening for players on `player_port` and asks the
    /// collaborator to listen on `game_port`.
    ///
    /// # Startup Sequence
    ///
    /// 1. Bind the player listener (a bind failure is returned as is)
    /// 2. Spawn the dispatch task consuming player events and game events
    /// 3. Start the collaborator's listener; on failure everything started so
    ///    far is torn down again and the error returned
    ///
    /// # Errors
    ///
    /// [`ServerError::InvalidState`] unless the server is idle.
    pub async fn start(&self, player_port: u16, game_port: u16) -> Result<(), ServerError> {
        let mut lifecycle = self.lifecycle.lock().await;
        if !matches!(*lifecycle, Lifecycle::Idle) {
            return Err(ServerError::InvalidState(format!(
                "start called while {:?}",
                lifecycle.state()
            )));
        }

        let player_addr = self.config.socket_addr(player_port);
        let game_addr = self.config.socket_addr(game_port);

        let (event_sender, event_receiver) = mpsc::unbounded_channel();
        let (notifier, game_events) = GameNotifier::channel();

        let handler = Arc::new(PlayerStreamHandler::new(
            event_sender,
            self.config.framing,
            self.config.max_frame_length,
        ));
        let player_listener = ConnectionListener::bind(
            player_addr,
            ListenerOptions {
                backlog: self.config.listen_backlog,
            },
            handler,
        )
        .await?;

        let dispatch_shutdown = CancellationToken::new();
        let dispatch_task = tokio::spawn(run_dispatch(
            self.coordinator.clone(),
            event_receiver,
            game_events,
            dispatch_shutdown.clone(),
        ));

        if let Err(e) = self.collaborator.listen(game_addr, notifier).await {
            error!("Game collaborator failed to listen on {}: {}", game_addr, e);
            player_listener.close().await;
            dispatch_shutdown.cancel();
            let _ = dispatch_task.await;
            return Err(e.into());
        }

        info!(
            "🚀 Session server started; player port {}; game port {}",
            player_listener.local_addr().port(),
            game_port
        );

        *lifecycle = Lifecycle::Listening(Running {
            player_listener,
            dispatch_shutdown,
            dispatch_task,
        });
        Ok(())
    }

    /// Closes the player listener and the collaborator's listener.
    ///
    /// Both are attempted even if one fails. The dispatch task stops after
    /// the handler it is currently running, if any, and open player
    /// connections are terminated. A collaborator failure is returned after
    /// everything else has been shut down.
    pub async fn close(&self) -> Result<(), ServerError> {
        let mut lifecycle = self.lifecycle.lock().await;
        let previous = std::mem::replace(&mut *lifecycle, Lifecycle::Closed);

        let running = match previous {
            Lifecycle::Listening(running) => running,
            Lifecycle::Idle => {
                info!("Session server closed before it was started");
                return Ok(());
            }
            Lifecycle::Closed => return Ok(()),
        };

        info!("🛑 Shutting down session server...");
        running.player_listener.close().await;

        running.dispatch_shutdown.cancel();
        if let Err(e) = running.dispatch_task.await {
            warn!("Dispatch task ended abnormally: {}", e);
        }
        running.player_listener.disconnect_all();

        let result = self.collaborator.close().await;
        if let Err(e) = &result {
            error!("Game collaborator failed to close: {}", e);
        }

        info!("✅ Session server closed");
        result.map_err(ServerError::from)
    }

    /// The current game id, or [`GameId::UNSET`] if the collaborator has not
    /// announced a game yet.
    pub async fn game_id(&self) -> GameId {
        self.coordinator.game_id().await
    }

    pub async fn state(&self) -> ServerState {
        self.lifecycle.lock().await.state()
    }

    /// Address the player listener is bound to, while listening.
    pub async fn player_addr(&self) -> Option<SocketAddr> {
        match &*self.lifecycle.lock().await {
            Lifecycle::Listening(running) => Some(running.player_listener.local_addr()),
            _ => None,
        }
    }

    /// Gets a handle to the coordinator.
    pub fn coordinator(&self) -> SessionCoordinator {
        self.coordinator.clone()
    }
}

/// Feeds player events and game events to the coordinator, one at a time.
///
/// Game events are preferred when both are ready. Handler failures are logged
/// and do not stop the loop.
async fn run_dispatch(
    coordinator: SessionCoordinator,
    mut player_events: mpsc::UnboundedReceiver<SessionEvent>,
    mut game_events: mpsc::UnboundedReceiver<GameEvent>,
    shutdown: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;
            _ = shutdown.cancelled() => break,
            Some(event) = game_events.recv() => {
                coordinator.handle_game_event(event).await;
            }
            Some(event) = player_events.recv() => {
                let connection_id = event.connection().id();
                if let Err(e) = coordinator.dispatch(event).await {
                    warn!("⚠️ Failed to handle message from connection {}: {}", connection_id, e);
                }
            }
            else => break,
        }
    }
    info!("Dispatcher stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborator::CollaboratorError;
    use crate::colour::Colour;
    use crate::connection::PlayerConnection;
    use async_trait::async_trait;
    use serde_json::Value;

    struct IdleGame {
        fail_listen: bool,
        fail_close: bool,
    }

    #[async_trait]
    impl GameCollaborator for IdleGame {
        async fn listen(
            &self,
            addr: SocketAddr,
            _notifier: GameNotifier,
        ) -> Result<(), CollaboratorError> {
            if self.fail_listen {
                return Err(CollaboratorError::Listen {
                    addr,
                    reason: "refused".to_string(),
                });
            }
            Ok(())
        }

        async fn close(&self) -> Result<(), CollaboratorError> {
            if self.fail_close {
                return Err(CollaboratorError::Rejected("still running".to_string()));
            }
            Ok(())
        }

        async fn add_player(
            &self,
            _connection: &PlayerConnection,
            _colour: Colour,
            _game_id: GameId,
        ) -> Result<(), CollaboratorError> {
            Ok(())
        }

        async fn make_move(
            &self,
            _connection: &PlayerConnection,
            _payload: Value,
        ) -> Result<(), CollaboratorError> {
            Ok(())
        }
    }

    fn server(fail_listen: bool, fail_close: bool) -> SessionServer {
        SessionServer::new(
            ServerConfig::default(),
            Arc::new(IdleGame {
                fail_listen,
                fail_close,
            }),
        )
    }

    #[tokio::test]
    async fn test_lifecycle_transitions() {
        let server = server(false, false);
        assert_eq!(server.state().await, ServerState::Idle);
        assert!(server.player_addr().await.is_none());

        server.start(0, 0).await.unwrap();
        assert_eq!(server.state().await, ServerState::Listening);
        assert!(server.player_addr().await.is_some());

        server.close().await.unwrap();
        assert_eq!(server.state().await, ServerState::Closed);

        // Closed is terminal
        assert!(matches!(
            server.start(0, 0).await,
            Err(ServerError::InvalidState(_))
        ));
        server.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_start_twice_is_rejected() {
        let server = server(false, false);
        server.start(0, 0).await.unwrap();
        assert!(matches!(
            server.start(0, 0).await,
            Err(ServerError::InvalidState(_))
        ));
        server.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_collaborator_listen_failure_rolls_back() {
        let server = server(true, false);
        let result = server.start(0, 0).await;

        assert!(matches!(result, Err(ServerError::Collaborator(_))));
        assert_eq!(server.state().await, ServerState::Idle);
    }

    #[tokio::test]
    async fn test_close_reports_collaborator_failure() {
        let server = server(false, true);
        server.start(0, 0).await.unwrap();

        let result = server.close().await;
        assert!(matches!(result, Err(ServerError::Collaborator(_))));
        assert_eq!(server.state().await, ServerState::Closed);
    }

    #[tokio::test]
    async fn test_game_id_starts_unset() {
        let server = server(false, false);
        assert_eq!(server.game_id().await, GameId(-1));
    }
}
