//! Command-line interface handling for the session host.
//!
//! Every option here overrides the matching setting from the configuration
//! file.

use clap::{value_parser, Arg, ArgMatches, Command};
use std::path::PathBuf;

/// Command line arguments parsed from user input.
#[derive(Debug, Clone, Default)]
pub struct CliArgs {
    /// Path to the configuration file
    pub config_path: PathBuf,
    /// Optional override for the listen host
    pub host: Option<String>,
    /// Optional override for the player port
    pub player_port: Option<u16>,
    /// Optional override for the game port
    pub game_port: Option<u16>,
    /// Optional override for player stream framing ("chunk" or "lines")
    pub framing: Option<String>,
    /// Optional override for log level
    pub log_level: Option<String>,
    /// Whether to force JSON log output
    pub json_logs: bool,
}

impl CliArgs {
    /// Parses the process arguments.
    ///
    /// Exits with a usage message if they are invalid.
    pub fn parse() -> Self {
        Self::from_matches(&command().get_matches())
    }

    fn from_matches(matches: &ArgMatches) -> Self {
        Self {
            config_path: matches
                .get_one::<PathBuf>("config")
                .cloned()
                .unwrap_or_else(|| PathBuf::from("config.toml")),
            host: matches.get_one::<String>("host").cloned(),
            player_port: matches.get_one::<u16>("player-port").copied(),
            game_port: matches.get_one::<u16>("game-port").copied(),
            framing: matches.get_one::<String>("framing").cloned(),
            log_level: matches.get_one::<String>("log-level").cloned(),
            json_logs: matches.get_flag("json-logs"),
        }
    }
}

fn command() -> Command {
    Command::new("Session Host")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Player registration and move routing for a turn-based game")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file path")
                .value_parser(value_parser!(PathBuf))
                .default_value("config.toml"),
        )
        .arg(
            Arg::new("host")
                .long("host")
                .value_name("ADDRESS")
                .help("Interface to listen on (e.g., 0.0.0.0)"),
        )
        .arg(
            Arg::new("player-port")
                .long("player-port")
                .value_name("PORT")
                .help("Port players connect to")
                .value_parser(value_parser!(u16)),
        )
        .arg(
            Arg::new("game-port")
                .long("game-port")
                .value_name("PORT")
                .help("Port game clients connect to")
                .value_parser(value_parser!(u16)),
        )
        .arg(
            Arg::new("framing")
                .long("framing")
                .value_name("MODE")
                .help("Player stream framing")
                .value_parser(["chunk", "lines"]),
        )
        .arg(
            Arg::new("log-level")
                .short('l')
                .long("log-level")
                .value_name("LEVEL")
                .help("Log level (trace, debug, info, warn, error)"),
        )
        .arg(
            Arg::new("json-logs")
                .long("json-logs")
                .help("Output logs in JSON format")
                .action(clap::ArgAction::SetTrue),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> CliArgs {
        CliArgs::from_matches(&command().try_get_matches_from(args).unwrap())
    }

    #[test]
    fn test_defaults() {
        let args = parse(&["session_host"]);
        assert_eq!(args.config_path, PathBuf::from("config.toml"));
        assert!(args.host.is_none());
        assert!(args.player_port.is_none());
        assert!(args.game_port.is_none());
        assert!(args.framing.is_none());
        assert!(!args.json_logs);
    }

    #[test]
    fn test_overrides() {
        let args = parse(&[
            "session_host",
            "-c",
            "custom.toml",
            "--host",
            "0.0.0.0",
            "--player-port",
            "9000",
            "--game-port",
            "9001",
            "--framing",
            "lines",
            "-l",
            "debug",
            "--json-logs",
        ]);

        assert_eq!(args.config_path, PathBuf::from("custom.toml"));
        assert_eq!(args.host.as_deref(), Some("0.0.0.0"));
        assert_eq!(args.player_port, Some(9000));
        assert_eq!(args.game_port, Some(9001));
        assert_eq!(args.framing.as_deref(), Some("lines"));
        assert_eq!(args.log_level.as_deref(), Some("debug"));
        assert!(args.json_logs);
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(command()
            .try_get_matches_from(["session_host", "--player-port", "70000"])
            .is_err());
        assert!(command()
            .try_get_matches_from(["session_host", "--framing", "xml"])
            .is_err());
    }
}
