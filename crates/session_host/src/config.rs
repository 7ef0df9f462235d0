//! Configuration management for the session host.
//!
//! This module handles loading, validation, and conversion of the host
//! configuration from TOML files and command-line arguments.

use crate::cli::CliArgs;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use session_server::config::DEFAULT_MAX_FRAME_LENGTH;
use session_server::{FramingMode, ServerConfig};
use std::net::IpAddr;
use std::path::Path;
use tracing::info;

/// Application configuration loaded from TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Listener configuration settings
    #[serde(default)]
    pub server: ServerSettings,
    /// Logging configuration settings
    #[serde(default)]
    pub logging: LoggingSettings,
}

/// Listener settings.
///
/// Both listeners bind to `host`; `player_port` serves players and
/// `game_port` serves game clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    /// Interface to bind to (e.g., "127.0.0.1")
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_player_port")]
    pub player_port: u16,
    #[serde(default = "default_game_port")]
    pub game_port: u16,
    /// How player byte streams are split into messages
    #[serde(default)]
    pub framing: FramingMode,
    /// Longest accepted line when framing by lines
    #[serde(default = "default_max_frame_length")]
    pub max_frame_length: usize,
    /// Backlog of the player socket
    #[serde(default = "default_listen_backlog")]
    pub listen_backlog: i32,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_player_port() -> u16 {
    8123
}

fn default_game_port() -> u16 {
    8124
}

fn default_max_frame_length() -> usize {
    DEFAULT_MAX_FRAME_LENGTH
}

fn default_listen_backlog() -> i32 {
    1024
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            player_port: default_player_port(),
            game_port: default_game_port(),
            framing: FramingMode::default(),
            max_frame_length: default_max_frame_length(),
            listen_backlog: default_listen_backlog(),
        }
    }
}

/// Logging system configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Log level filter (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Whether to output logs in JSON format
    #[serde(default)]
    pub json_format: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json_format: false,
        }
    }
}

impl AppConfig {
    /// Loads configuration from a TOML file.
    ///
    /// If the file doesn't exist, a default configuration file is written at
    /// `path` and the defaults are returned.
    pub async fn load_from_file(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read {}", path.display()))?;
            let config: AppConfig = toml::from_str(&content)
                .with_context(|| format!("Failed to parse {}", path.display()))?;
            Ok(config)
        } else {
            let default_config = AppConfig::default();
            let toml_content = toml::to_string_pretty(&default_config)?;
            tokio::fs::write(path, toml_content)
                .await
                .with_context(|| format!("Failed to write {}", path.display()))?;
            info!("Created default configuration file: {}", path.display());
            Ok(default_config)
        }
    }

    /// Applies command-line overrides on top of the loaded file.
    pub fn apply_overrides(&mut self, args: &CliArgs) -> Result<()> {
        if let Some(host) = &args.host {
            self.server.host = host.clone();
        }
        if let Some(port) = args.player_port {
            self.server.player_port = port;
        }
        if let Some(port) = args.game_port {
            self.server.game_port = port;
        }
        if let Some(framing) = &args.framing {
            self.server.framing = framing.parse().map_err(anyhow::Error::msg)?;
        }
        if let Some(level) = &args.log_level {
            self.logging.level = level.clone();
        }
        if args.json_logs {
            self.logging.json_format = true;
        }
        Ok(())
    }

    /// Converts the host configuration into the library's [`ServerConfig`].
    pub fn to_server_config(&self) -> Result<ServerConfig> {
        let host: IpAddr = self
            .server
            .host
            .parse()
            .with_context(|| format!("Invalid host: {}", self.server.host))?;

        Ok(ServerConfig {
            host,
            framing: self.server.framing,
            max_frame_length: self.server.max_frame_length,
            listen_backlog: self.server.listen_backlog,
        })
    }

    /// Validates the configuration for consistency and correctness.
    ///
    /// # Returns
    ///
    /// `Ok(())` if the configuration is valid, or an error string describing the issue.
    pub fn validate(&self) -> Result<(), String> {
        if self.server.host.parse::<IpAddr>().is_err() {
            return Err(format!("Invalid host: {}", &self.server.host));
        }

        // Port 0 asks the OS for any free port, so two zeros never clash
        if self.server.player_port == self.server.game_port && self.server.player_port != 0 {
            return Err(format!(
                "Player port and game port must differ (both are {})",
                self.server.player_port
            ));
        }

        if self.server.max_frame_length == 0 {
            return Err("max_frame_length must be greater than zero".to_string());
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(format!(
                "Invalid log level: {}. Must be one of: {valid_levels:?}",
                &self.logging.level
            ));
        }

        Ok(())
    }
}
