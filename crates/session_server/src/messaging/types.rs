//! Message type definitions for the player protocol.
//!
//! Players send JSON objects carrying a mandatory `type` tag:
//!
//! ```json
//! { "type": "REGISTER", "student_id": "s1234567" }
//! { "type": "MOVE", "target": 74, "ticket": "Taxi" }
//! ```
//!
//! Everything beyond `type` in a `MOVE` belongs to the game and is carried
//! through untouched.

use crate::connection::PlayerConnection;
use serde_json::Value;

/// Wire tag of a registration message.
pub const REGISTER_TYPE: &str = "REGISTER";

/// Wire tag of a move message.
pub const MOVE_TYPE: &str = "MOVE";

/// A decoded message from a player.
#[derive(Debug, Clone, PartialEq)]
pub enum PlayerMessage {
    /// The sender wants to join the current game.
    ///
    /// `student_id` is opaque: a string value as is, any other JSON value as
    /// its JSON text, `None` when absent or null.
    Register { student_id: Option<String> },

    /// The sender made a move; `payload` is the whole decoded document
    Move { payload: Value },
}

/// A player message tagged with the connection it arrived on.
///
/// This is what the protocol decoder hands to the session coordinator.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    Register {
        connection: PlayerConnection,
        student_id: Option<String>,
    },
    Move {
        connection: PlayerConnection,
        payload: Value,
    },
}

impl SessionEvent {
    pub fn new(connection: PlayerConnection, message: PlayerMessage) -> Self {
        match message {
            PlayerMessage::Register { student_id } => SessionEvent::Register {
                connection,
                student_id,
            },
            PlayerMessage::Move { payload } => SessionEvent::Move {
                connection,
                payload,
            },
        }
    }

    pub fn connection(&self) -> &PlayerConnection {
        match self {
            SessionEvent::Register { connection, .. } | SessionEvent::Move { connection, .. } => {
                connection
            }
        }
    }
}

/// Errors produced while decoding a player frame.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("Invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
}
