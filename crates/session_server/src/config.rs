//! Server configuration types and defaults.
//!
//! This module contains the configuration used to construct a
//! [`SessionServer`](crate::SessionServer). Ports are not part of it; they are
//! supplied to `start` directly.

use crate::messaging::FramingMode;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

/// Default maximum size of a single line when using [`FramingMode::Lines`].
pub const DEFAULT_MAX_FRAME_LENGTH: usize = 64 * 1024;

/// Configuration structure for the session server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Interface both the player and game listeners bind to
    pub host: IpAddr,

    /// How player byte streams are split into messages
    pub framing: FramingMode,

    /// Upper bound for one line in [`FramingMode::Lines`]
    pub max_frame_length: usize,

    /// Backlog passed to `listen(2)` for the player socket
    pub listen_backlog: i32,
}

impl ServerConfig {
    /// Socket address for a listener on `port` at the configured host.
    pub fn socket_addr(&self, port: u16) -> SocketAddr {
        SocketAddr::new(self.host, port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            framing: FramingMode::default(),
            max_frame_length: DEFAULT_MAX_FRAME_LENGTH,
            listen_backlog: 1024,
        }
    }
}
