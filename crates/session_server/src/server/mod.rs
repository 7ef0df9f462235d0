//! The session server: lifecycle, connection handling and coordination.

pub mod coordinator;
pub mod core;
pub mod handlers;

pub use self::core::{ServerState, SessionServer};
pub use coordinator::SessionCoordinator;
pub use handlers::PlayerStreamHandler;
