//! Registration, colour allocation and move routing.
//!
//! [`SessionCoordinator`] is the part of the server that reacts to decoded
//! player events and collaborator notifications. It keeps exactly two pieces
//! of state, the colour pool and the game identifier, both behind one mutex.
//! Nothing is recorded per player; the association between connection, colour
//! and game lives in the collaborator.

use crate::collaborator::{GameCollaborator, GameEvent, GameId};
use crate::colour::{Colour, ColourPool};
use crate::connection::PlayerConnection;
use crate::error::ServerError;
use crate::messaging::SessionEvent;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Mutable state owned by the coordinator.
#[derive(Debug, Default)]
struct SessionState {
    colours: ColourPool,
    game_id: GameId,
}

/// Handlers for player events and game notifications.
///
/// Cloning is cheap; clones share the same state and collaborator.
#[derive(Clone)]
pub struct SessionCoordinator {
    collaborator: Arc<dyn GameCollaborator>,
    state: Arc<Mutex<SessionState>>,
}

impl SessionCoordinator {
    pub fn new(collaborator: Arc<dyn GameCollaborator>) -> Self {
        Self {
            collaborator,
            state: Arc::new(Mutex::new(SessionState::default())),
        }
    }

    /// Routes one decoded player event to its handler.
    pub async fn dispatch(&self, event: SessionEvent) -> Result<(), ServerError> {
        match event {
            SessionEvent::Register {
                connection,
                student_id,
            } => self
                .register(&connection, student_id.as_deref())
                .await
                .map(|_| ()),
            SessionEvent::Move {
                connection,
                payload,
            } => self.forward_move(&connection, payload).await,
        }
    }

    /// Registers a player: takes the next colour and asks the collaborator to
    /// add the player under the current game id.
    ///
    /// Registration does not wait for the game to be initialised. If the
    /// collaborator has not announced a game yet, the player is added with
    /// [`GameId::UNSET`].
    ///
    /// # Errors
    ///
    /// * [`ServerError::AllocationExhausted`] when all six colours are taken;
    ///   the collaborator is not called
    /// * [`ServerError::Collaborator`] when `add_player` fails; the colour
    ///   stays allocated
    pub async fn register(
        &self,
        connection: &PlayerConnection,
        student_id: Option<&str>,
    ) -> Result<Colour, ServerError> {
        let student = student_id.unwrap_or("<unknown>");
        let (colour, game_id) = {
            let mut state = self.state.lock().await;
            let colour = state.colours.allocate().ok_or_else(|| {
                ServerError::AllocationExhausted {
                    student_id: student_id.map(str::to_string),
                }
            })?;
            (colour, state.game_id)
        };

        if !game_id.is_set() {
            warn!(
                "⏳ Student {} registered before the game was initialised; adding with unset game id",
                student
            );
        }

        info!(
            "🎨 Student {} on connection {} assigned {} (game {})",
            student,
            connection.id(),
            colour,
            game_id
        );

        self.collaborator
            .add_player(connection, colour, game_id)
            .await?;
        Ok(colour)
    }

    /// Forwards a move to the collaborator.
    ///
    /// No check is made that the connection ever registered.
    pub async fn forward_move(
        &self,
        connection: &PlayerConnection,
        payload: Value,
    ) -> Result<(), ServerError> {
        debug!("♟️ Forwarding move from connection {}", connection.id());
        self.collaborator.make_move(connection, payload).await?;
        Ok(())
    }

    /// Applies a collaborator notification.
    pub async fn handle_game_event(&self, event: GameEvent) {
        match event {
            GameEvent::Initialised(game_id) => {
                self.record_initialised(game_id).await;
            }
        }
    }

    /// Records the game id announced by the collaborator.
    ///
    /// The id is set once per game; later announcements, and announcements
    /// of [`GameId::UNSET`], are ignored. Returns whether the id was recorded.
    pub async fn record_initialised(&self, game_id: GameId) -> bool {
        if !game_id.is_set() {
            warn!("Ignoring initialised notification carrying the unset game id");
            return false;
        }

        let mut state = self.state.lock().await;
        if state.game_id.is_set() {
            warn!(
                "Ignoring initialised notification for game {}; game {} is already active",
                game_id, state.game_id
            );
            return false;
        }
        state.game_id = game_id;
        info!("🎲 Game {} initialised", game_id);
        true
    }

    /// The recorded game id, or [`GameId::UNSET`].
    pub async fn game_id(&self) -> GameId {
        self.state.lock().await.game_id
    }

    /// Number of colours still available in this game.
    pub async fn remaining_colours(&self) -> usize {
        self.state.lock().await.colours.remaining()
    }
}
