//! Server configuration, loaded from an optional TOML file.

use std::path::{Path, PathBuf};

use derive_getters::Getters;
use derive_more::{Display, Error};
use derive_setters::Setters;
use serde::{Deserialize, Serialize};
use side_stacker_board::{Board, DEFAULT_GRID_SIZE, DEFAULT_WIN_LENGTH};
use tracing::{debug, info, instrument};

/// Runtime settings for the referee server.
#[derive(Debug, Clone, PartialEq, Eq, Getters, Setters, Serialize, Deserialize)]
#[setters(prefix = "with_")]
pub struct ServerConfig {
    /// Interface to bind.
    #[serde(default = "default_host")]
    host: String,

    /// TCP port to listen on.
    #[serde(default = "default_port")]
    port: u16,

    /// Side length of the square grid.
    #[serde(default = "default_grid_size")]
    grid_size: usize,

    /// Aligned pieces needed to win.
    #[serde(default = "default_win_length")]
    win_length: usize,

    /// Send rejection reasons back to clients as `ERROR` messages.
    #[serde(default)]
    debug_errors: bool,

    /// SQLite file for finished games. Results are only logged when unset.
    #[serde(default)]
    database: Option<PathBuf>,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3333
}

fn default_grid_size() -> usize {
    DEFAULT_GRID_SIZE
}

fn default_win_length() -> usize {
    DEFAULT_WIN_LENGTH
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            grid_size: default_grid_size(),
            win_length: default_win_length(),
            debug_errors: false,
            database: None,
        }
    }
}

impl ServerConfig {
    /// Loads configuration from a TOML file. Missing keys take their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read or parsed.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        debug!("Loading config from file");
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::new(format!("Failed to read config file: {}", e)))?;

        let config: Self = toml::from_str(&content)
            .map_err(|e| ConfigError::new(format!("Failed to parse config: {}", e)))?;

        info!(port = config.port, grid_size = config.grid_size, "Config loaded successfully");
        Ok(config)
    }

    /// Checks grid dimensions.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] unless `1 <= win_length <= grid_size`.
    #[instrument(skip(self))]
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.grid_size == 0 {
            return Err(ConfigError::new("grid_size must be at least 1"));
        }
        if self.win_length == 0 || self.win_length > self.grid_size {
            return Err(ConfigError::new(format!(
                "win_length must be between 1 and grid_size ({}), got {}",
                self.grid_size, self.win_length
            )));
        }
        Ok(())
    }

    /// Builds the empty board every new session starts from.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the dimensions are invalid.
    #[instrument(skip(self))]
    pub fn board(&self) -> Result<Board, ConfigError> {
        self.validate()?;
        Board::new(self.grid_size, self.win_length)
            .map_err(|e| ConfigError::new(format!("Invalid board: {}", e)))
    }

    /// `host:port` string for the listener.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Configuration error.
#[derive(Debug, Clone, Display, Error)]
#[display("Config error: {} at {}:{}", message, file, line)]
pub struct ConfigError {
    /// Error message.
    pub message: String,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl ConfigError {
    /// Creates a new configuration error with caller location tracking.
    #[track_caller]
    pub fn new(message: impl Into<String>) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            message: message.into(),
            line: loc.line(),
            file: loc.file(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.bind_address(), "127.0.0.1:3333");
        assert_eq!(*config.grid_size(), 7);
        assert_eq!(*config.win_length(), 4);
        assert!(!*config.debug_errors());
        assert!(config.database().is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "port = 4000\ndebug_errors = true").unwrap();

        let config = ServerConfig::from_file(file.path()).unwrap();
        assert_eq!(*config.port(), 4000);
        assert!(*config.debug_errors());
        assert_eq!(*config.grid_size(), 7);
    }

    #[test]
    fn test_unreadable_file() {
        let error = ServerConfig::from_file("/definitely/not/here.toml").unwrap_err();
        assert!(error.message.contains("Failed to read"));
    }

    #[test]
    fn test_rejects_bad_dimensions() {
        assert!(ServerConfig::default().with_grid_size(0).validate().is_err());
        assert!(ServerConfig::default().with_win_length(8).validate().is_err());
        assert!(ServerConfig::default().with_win_length(0).board().is_err());

        let board = ServerConfig::default()
            .with_grid_size(5)
            .with_win_length(3)
            .board()
            .unwrap();
        assert_eq!(board.grid_size(), 5);
    }
}
