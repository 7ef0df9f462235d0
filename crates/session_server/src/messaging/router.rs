//! Decoding of player frames into typed messages.

use crate::messaging::{DecodeError, PlayerMessage, MOVE_TYPE, REGISTER_TYPE};
use serde_json::Value;
use tracing::debug;

/// Decodes one frame received from a player.
///
/// The frame must hold exactly one JSON document.
///
/// # Returns
///
/// * `Ok(Some(message))` for a `REGISTER` or `MOVE`
/// * `Ok(None)` when the frame is blank, is not an object, or carries any
///   other (or no) `type`; such messages are dropped without an event
/// * `Err(DecodeError)` when the frame is not valid JSON
pub fn decode_message(frame: &[u8]) -> Result<Option<PlayerMessage>, DecodeError> {
    if frame.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }

    let document: Value = serde_json::from_slice(frame)?;

    let message_type = match document.get("type").and_then(Value::as_str) {
        Some(t) => t,
        None => {
            debug!("📭 Dropping message without a 'type' field");
            return Ok(None);
        }
    };

    match message_type {
        REGISTER_TYPE => {
            let student_id = match document.get("student_id") {
                None | Some(Value::Null) => None,
                Some(Value::String(id)) => Some(id.clone()),
                Some(other) => Some(other.to_string()),
            };
            Ok(Some(PlayerMessage::Register { student_id }))
        }
        MOVE_TYPE => Ok(Some(PlayerMessage::Move { payload: document })),
        other => {
            debug!("📭 Dropping message of unhandled type '{}'", other);
            Ok(None)
        }
    }
}
