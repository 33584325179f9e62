//! Result sinks: where finished games are written.
//!
//! The controller hands each completed game to a [`ResultSink`] exactly once
//! and does not wait for the write. Failures are logged by the caller and
//! never reach players.

use async_trait::async_trait;
use derive_getters::Getters;
use derive_new::new;
use side_stacker_board::Outcome;
use tracing::{debug, info, instrument};

use crate::db::{DbError, GameRepository, NewGameRecord};

/// Shape of a finished game as handed to a sink.
#[derive(Debug, Clone, PartialEq, Eq, Getters, new)]
pub struct CompletionRecord {
    /// Session id.
    id: String,
    /// Winning colour or tie.
    winner: Outcome,
    /// Row-major `R`/`Y`/`o` encoding of the final board.
    board: String,
    /// UTC time the game ended, `YYYY-MM-DD HH:MM:SS`.
    timestamp: String,
}

impl CompletionRecord {
    /// `chrono` format string for [`CompletionRecord::timestamp`].
    pub const TIMESTAMP_FORMAT: &'static str = "%Y-%m-%d %H:%M:%S";
}

impl From<&CompletionRecord> for NewGameRecord {
    fn from(record: &CompletionRecord) -> Self {
        NewGameRecord::new(
            record.id.clone(),
            record.winner.to_string(),
            record.board.clone(),
            record.timestamp.clone(),
        )
    }
}

/// Failure to store a completion record.
#[derive(Debug, Clone, derive_more::Display)]
pub enum PersistenceError {
    /// The database rejected the write.
    #[display("{_0}")]
    Database(DbError),
    /// The blocking write task panicked or was cancelled.
    #[display("Persistence task failed: {reason}")]
    Task {
        /// Join error text.
        reason: String,
    },
}

impl std::error::Error for PersistenceError {}

impl From<DbError> for PersistenceError {
    fn from(err: DbError) -> Self {
        Self::Database(err)
    }
}

/// Write-only destination for finished games.
#[async_trait]
pub trait ResultSink: Send + Sync {
    /// Stores one record.
    async fn record(&self, record: CompletionRecord) -> Result<(), PersistenceError>;
}

/// Sink backed by the SQLite `games` table.
#[derive(Debug, Clone)]
pub struct SqliteResultSink {
    repository: GameRepository,
}

impl SqliteResultSink {
    /// Creates a sink writing through `repository`.
    #[instrument(skip(repository))]
    pub fn new(repository: GameRepository) -> Self {
        info!("Creating SqliteResultSink");
        Self { repository }
    }
}

#[async_trait]
impl ResultSink for SqliteResultSink {
    #[instrument(skip(self, record), fields(id = %record.id, winner = %record.winner))]
    async fn record(&self, record: CompletionRecord) -> Result<(), PersistenceError> {
        let repository = self.repository.clone();
        let row = NewGameRecord::from(&record);

        let stored = tokio::task::spawn_blocking(move || repository.record_game(row))
            .await
            .map_err(|e| PersistenceError::Task {
                reason: e.to_string(),
            })??;

        debug!(id = %stored.id(), "Completion record stored");
        Ok(())
    }
}

/// Sink that only logs; used when no database is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogResultSink;

#[async_trait]
impl ResultSink for LogResultSink {
    async fn record(&self, record: CompletionRecord) -> Result<(), PersistenceError> {
        info!(
            id = %record.id,
            winner = %record.winner,
            board = %record.board,
            timestamp = %record.timestamp,
            "Game finished (not persisted)"
        );
        Ok(())
    }
}
