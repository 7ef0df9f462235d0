//! # Session Server - Player Connection and Registration Layer
//!
//! The connection-and-session layer of a multiplayer turn-based game. It
//! accepts player connections, decodes a minimal JSON protocol, registers
//! players into the single ongoing game by assigning each a colour, and
//! forwards their moves to the game logic.
//!
//! ## Design Philosophy
//!
//! The session server contains **NO game logic**. Board state, move
//! validation, turn order and win detection all live behind the
//! [`GameCollaborator`] trait. This crate only provides:
//!
//! * **Connection handling** - TCP listener and per-player connection tasks
//! * **Protocol decoding** - framing and classification of player messages
//! * **Colour allocation** - a fixed, non-replenished pool per game
//! * **Routing** - registrations and moves to the collaborator, the game id
//!   back from it
//!
//! ## Message Flow
//!
//! 1. A player sends `{"type": "REGISTER", "student_id": "..."}` or
//!    `{"type": "MOVE", ...}` over TCP
//! 2. The frame is decoded into a [`SessionEvent`] tagged with its
//!    [`PlayerConnection`]
//! 3. The dispatch task hands it to the [`SessionCoordinator`]
//! 4. Registrations take the next [`Colour`] and call
//!    [`GameCollaborator::add_player`]; moves call
//!    [`GameCollaborator::make_move`] with the full message
//! 5. The collaborator announces the game id through its [`GameNotifier`]
//!
//! Messages of any other type are dropped without an event. A frame that is
//! not valid JSON disconnects the offending player and nobody else.
//!
//! ## Example
//!
//! ```no_run
//! use session_server::{GameBridge, ServerConfig, SessionServer};
//! use std::sync::Arc;
//!
//! # async fn run() -> Result<(), session_server::ServerError> {
//! let server = SessionServer::new(ServerConfig::default(), Arc::new(GameBridge::new()));
//! server.start(8123, 8124).await?;
//! // ...
//! server.close().await?;
//! # Ok(())
//! # }
//! ```

pub use bridge::GameBridge;
pub use collaborator::{CollaboratorError, GameCollaborator, GameEvent, GameId, GameNotifier};
pub use colour::{Colour, ColourPool};
pub use config::ServerConfig;
pub use connection::{ConnectionError, ConnectionId, PlayerConnection};
pub use error::ServerError;
pub use messaging::{DecodeError, FramingMode, PlayerMessage, SessionEvent};
pub use server::{ServerState, SessionCoordinator, SessionServer};

pub mod bridge;
pub mod collaborator;
pub mod colour;
pub mod config;
pub mod connection;
pub mod error;
pub mod messaging;
pub mod server;
