//! Command-line interface for side_stacker.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use side_stacker::{ConfigError, ServerConfig};
use tracing::{debug, instrument};

/// Side Stacker - WebSocket referee for side-stacking connect-four
#[derive(Parser, Debug)]
#[command(name = "side_stacker")]
#[command(about = "Referee server for two-player side-stacking connect-four", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Subcommand to run
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the WebSocket game server
    Serve(ServeArgs),

    /// List finished games stored in the database
    History(HistoryArgs),
}

/// Options for `serve`. Flags override values from the config file.
#[derive(Args, Debug, Default)]
pub struct ServeArgs {
    /// TOML config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Host to bind to
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Side length of the grid
    #[arg(long)]
    pub grid_size: Option<usize>,

    /// Pieces in a row needed to win
    #[arg(long)]
    pub win_length: Option<usize>,

    /// Send rejection reasons back to clients
    #[arg(long)]
    pub debug_errors: bool,

    /// SQLite file for finished games
    #[arg(long)]
    pub database: Option<PathBuf>,
}

impl ServeArgs {
    /// Resolves the effective configuration.
    #[instrument(skip(self))]
    pub fn into_config(self) -> Result<ServerConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => ServerConfig::from_file(path)?,
            None => ServerConfig::default(),
        };

        if let Some(host) = self.host {
            config = config.with_host(host);
        }
        if let Some(port) = self.port {
            config = config.with_port(port);
        }
        if let Some(grid_size) = self.grid_size {
            config = config.with_grid_size(grid_size);
        }
        if let Some(win_length) = self.win_length {
            config = config.with_win_length(win_length);
        }
        if self.debug_errors {
            config = config.with_debug_errors(true);
        }
        if let Some(database) = self.database {
            config = config.with_database(Some(database));
        }

        config.validate()?;
        debug!(?config, "Resolved server config");
        Ok(config)
    }
}

/// Options for `history`.
#[derive(Args, Debug)]
pub struct HistoryArgs {
    /// Path to the database file
    #[arg(long, default_value = "side_stacker.db")]
    pub database: PathBuf,

    /// Maximum number of games to show
    #[arg(short, long, default_value = "20")]
    pub limit: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serve_flags_override_defaults() {
        let cli = Cli::parse_from([
            "side_stacker",
            "serve",
            "--port",
            "4000",
            "--win-length",
            "3",
            "--debug-errors",
        ]);
        let Command::Serve(args) = cli.command else {
            panic!("expected serve");
        };
        let config = args.into_config().unwrap();
        assert_eq!(*config.port(), 4000);
        assert_eq!(*config.win_length(), 3);
        assert_eq!(*config.grid_size(), 7);
        assert!(*config.debug_errors());
    }

    #[test]
    fn test_serve_rejects_bad_dimensions() {
        let args = ServeArgs {
            grid_size: Some(3),
            ..ServeArgs::default()
        };
        assert!(args.into_config().is_err());
    }

    #[test]
    fn test_history_defaults() {
        let cli = Cli::parse_from(["side_stacker", "history"]);
        let Command::History(args) = cli.command else {
            panic!("expected history");
        };
        assert_eq!(args.limit, 20);
        assert_eq!(args.database, PathBuf::from("side_stacker.db"));
    }
}
