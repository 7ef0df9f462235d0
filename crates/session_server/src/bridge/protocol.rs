//! Wire format spoken between the game bridge and game clients.
//!
//! Each message is one JSON object per line, tagged by `type`.

use crate::collaborator::GameId;
use crate::colour::Colour;
use crate::connection::ConnectionId;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Sent by the bridge to every connected game client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BridgeCommand {
    AddPlayer {
        player: ConnectionId,
        colour: Colour,
        game_id: GameId,
    },
    Move {
        player: ConnectionId,
        #[serde(rename = "move")]
        payload: Value,
    },
}

/// Sent by a game client to the bridge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GameReport {
    /// A game has been set up
    Initialised { game_id: GameId },

    /// Deliver `data` to a player
    Send { player: ConnectionId, data: Value },

    /// Drop a player's connection
    Disconnect { player: ConnectionId },
}

impl BridgeCommand {
    /// Serializes the command as a newline-terminated line.
    pub fn to_line(&self) -> Result<String, serde_json::Error> {
        let mut line = serde_json::to_string(self)?;
        line.push('\n');
        Ok(line)
    }
}
