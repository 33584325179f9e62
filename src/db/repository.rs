//! Database repository for finished games.

use diesel::prelude::*;
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};
use tracing::{debug, info, instrument};

use crate::db::{DbError, GameRecord, NewGameRecord, schema};

const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Database repository for game results.
#[derive(Debug, Clone)]
pub struct GameRepository {
    db_path: String,
}

impl GameRepository {
    /// Creates a new repository for the database at the given path.
    ///
    /// Use `":memory:"` only with a single connection; every call here opens
    /// a fresh one, so prefer a file path.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the path is empty.
    #[instrument(skip(db_path), fields(db_path = %db_path))]
    pub fn new(db_path: String) -> Result<Self, DbError> {
        if db_path.is_empty() {
            return Err(DbError::new("Database path is empty"));
        }
        info!(path = %db_path, "Creating GameRepository");
        Ok(Self { db_path })
    }

    /// Establishes a database connection.
    #[instrument(skip(self))]
    fn connection(&self) -> Result<SqliteConnection, DbError> {
        debug!(path = %self.db_path, "Establishing connection");
        Ok(SqliteConnection::establish(&self.db_path)?)
    }

    /// Applies any pending schema migrations and returns how many ran.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a migration fails.
    #[instrument(skip(self))]
    pub fn run_migrations(&self) -> Result<usize, DbError> {
        let mut conn = self.connection()?;
        let applied = conn
            .run_pending_migrations(MIGRATIONS)
            .map_err(|e| DbError::new(format!("Migration failed: {}", e)))?
            .len();
        info!(applied, "Migrations complete");
        Ok(applied)
    }

    /// Records a completed game.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the id already exists or a database error occurs.
    #[instrument(skip(self, game), fields(id = %game.id(), winner = %game.winner()))]
    pub fn record_game(&self, game: NewGameRecord) -> Result<GameRecord, DbError> {
        debug!("Recording game result");
        let mut conn = self.connection()?;

        let stored = diesel::insert_into(schema::games::table)
            .values(&game)
            .returning(GameRecord::as_returning())
            .get_result(&mut conn)?;

        info!(id = %stored.id(), winner = %stored.winner(), "Game result recorded");
        Ok(stored)
    }

    /// Lists up to `limit` games, most recent first.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a database error occurs.
    #[instrument(skip(self))]
    pub fn list_games(&self, limit: i64) -> Result<Vec<GameRecord>, DbError> {
        let mut conn = self.connection()?;

        let games = schema::games::table
            .order((schema::games::timestamp.desc(), schema::games::id.asc()))
            .limit(limit)
            .select(GameRecord::as_select())
            .load(&mut conn)?;

        info!(count = games.len(), "Games loaded");
        Ok(games)
    }

    /// Gets a game by session id. Returns `None` if not found.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a database error occurs.
    #[instrument(skip(self))]
    pub fn get_game(&self, id: &str) -> Result<Option<GameRecord>, DbError> {
        let mut conn = self.connection()?;

        let game = schema::games::table
            .find(id)
            .select(GameRecord::as_select())
            .first(&mut conn)
            .optional()?;

        debug!(found = game.is_some(), "Game lookup");
        Ok(game)
    }
}
