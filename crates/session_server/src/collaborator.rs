//! Interface to the game-logic collaborator.
//!
//! The session server owns no game rules. Everything past registration and
//! move forwarding is delegated to a [`GameCollaborator`], which also runs its
//! own listener for game-side clients and announces the game identifier
//! through a [`GameNotifier`].

use crate::colour::Colour;
use crate::connection::PlayerConnection;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::net::SocketAddr;
use tokio::sync::mpsc;

/// Identifier of the game currently being played.
///
/// Holds [`GameId::UNSET`] until the collaborator reports initialisation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GameId(pub i64);

impl GameId {
    /// Sentinel used before the collaborator has announced a game
    pub const UNSET: GameId = GameId(-1);

    pub fn is_set(&self) -> bool {
        *self != Self::UNSET
    }
}

impl Default for GameId {
    fn default() -> Self {
        Self::UNSET
    }
}

impl fmt::Display for GameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Notifications raised by the game collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameEvent {
    /// A game has been set up and is identified by the given id
    Initialised(GameId),
}

/// Channel through which a collaborator reports [`GameEvent`]s back to the
/// session coordinator.
#[derive(Debug, Clone)]
pub struct GameNotifier {
    sender: mpsc::UnboundedSender<GameEvent>,
}

impl GameNotifier {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<GameEvent>) {
        let (sender, rx) = mpsc::unbounded_channel();
        (Self { sender }, rx)
    }

    /// Announces that the game identified by `game_id` has been initialised.
    ///
    /// Returns `false` if the coordinator is no longer listening.
    pub fn initialised(&self, game_id: GameId) -> bool {
        self.sender.send(GameEvent::Initialised(game_id)).is_ok()
    }
}

/// Errors reported by a game collaborator.
#[derive(Debug, thiserror::Error)]
pub enum CollaboratorError {
    #[error("Failed to listen on {addr}: {reason}")]
    Listen { addr: SocketAddr, reason: String },

    #[error("No game client is connected")]
    NoGameClient,

    #[error("Rejected by game: {0}")]
    Rejected(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// The game-logic component the session server delegates to.
///
/// Calls are made from the coordinator's single dispatch task, one at a time,
/// in the order the triggering messages were handled.
#[async_trait]
pub trait GameCollaborator: Send + Sync + 'static {
    /// Starts the collaborator's own listener for game-side clients.
    ///
    /// `notifier` is how the collaborator later reports
    /// [`GameEvent::Initialised`].
    async fn listen(
        &self,
        addr: SocketAddr,
        notifier: GameNotifier,
    ) -> Result<(), CollaboratorError>;

    /// Stops the collaborator's listener.
    async fn close(&self) -> Result<(), CollaboratorError>;

    /// Adds a newly registered player to the game.
    ///
    /// `game_id` is whatever the coordinator has recorded at registration
    /// time and may still be [`GameId::UNSET`].
    async fn add_player(
        &self,
        connection: &PlayerConnection,
        colour: Colour,
        game_id: GameId,
    ) -> Result<(), CollaboratorError>;

    /// Applies a move. `payload` is the complete message the player sent.
    async fn make_move(
        &self,
        connection: &PlayerConnection,
        payload: Value,
    ) -> Result<(), CollaboratorError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_game_id_sentinel() {
        assert_eq!(GameId::default(), GameId(-1));
        assert!(!GameId::UNSET.is_set());
        assert!(GameId(0).is_set());
        assert_eq!(serde_json::to_string(&GameId(42)).unwrap(), "42");
    }

    #[tokio::test]
    async fn test_notifier_delivers_events() {
        let (notifier, mut rx) = GameNotifier::channel();
        assert!(notifier.initialised(GameId(7)));
        assert_eq!(rx.recv().await, Some(GameEvent::Initialised(GameId(7))));

        drop(rx);
        assert!(!notifier.initialised(GameId(8)));
    }
}
