//! Error types for the session server.
//!
//! [`ServerError`] is the top-level error returned by the public API. The
//! narrower error enums live next to the code that raises them and convert
//! into it with `?`.

use crate::collaborator::CollaboratorError;
use crate::messaging::DecodeError;
use std::net::SocketAddr;

/// Errors surfaced by the session server.
///
/// # Categories
///
/// * **Startup** - [`ServerError::Bind`] is fatal and never retried
/// * **Per-connection** - [`ServerError::Decode`] only ever affects the
///   connection that caused it
/// * **Registration** - [`ServerError::AllocationExhausted`] once every colour
///   has been handed out
/// * **Game side** - [`ServerError::Collaborator`] wraps failures reported by
///   the game collaborator
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Binding or listening on a socket failed
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    /// Network-level failure after startup (accept errors, socket setup)
    #[error("Network error: {0}")]
    Network(String),

    /// A player sent something that could not be decoded
    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    /// A registration arrived after every colour was handed out
    #[error("No colours left to allocate for student {student_id:?}")]
    AllocationExhausted { student_id: Option<String> },

    /// The game collaborator rejected or failed a call
    #[error("Game collaborator error: {0}")]
    Collaborator(#[from] CollaboratorError),

    /// An operation was called in the wrong lifecycle state
    #[error("Invalid server state: {0}")]
    InvalidState(String),
}
