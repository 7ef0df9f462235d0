//! Player protocol: framing, message types and decoding.
//!
//! Bytes read from a player connection are split into frames by
//! [`PlayerFrameCodec`], each frame is decoded by [`decode_message`], and the
//! result is wrapped into a [`SessionEvent`] for the session coordinator.

pub mod codec;
pub mod router;
pub mod types;

pub use codec::{FrameError, FramingMode, PlayerFrameCodec};
pub use router::decode_message;
pub use types::{DecodeError, PlayerMessage, SessionEvent, MOVE_TYPE, REGISTER_TYPE};
