//! Database models for completed games.

use derive_getters::Getters;
use derive_new::new;
use diesel::prelude::*;
use side_stacker_board::Outcome;
use tracing::instrument;

use crate::db::{DbError, schema};

/// A stored game result.
#[derive(Debug, Clone, PartialEq, Eq, Queryable, Identifiable, Selectable, Getters)]
#[diesel(table_name = schema::games)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct GameRecord {
    id: String,
    winner: String,
    board: String,
    timestamp: String,
}

impl GameRecord {
    /// Parses the stored winner column (`RED`, `YELLOW`, `TIE`).
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the column holds any other value.
    #[instrument(skip(self), fields(winner = %self.winner))]
    pub fn parse_winner(&self) -> Result<Outcome, DbError> {
        Outcome::from_label(&self.winner)
            .ok_or_else(|| DbError::new(format!("Invalid winner: '{}'", self.winner)))
    }
}

/// Insertable row for recording a finished game.
#[derive(Debug, Clone, Insertable, new, Getters)]
#[diesel(table_name = schema::games)]
pub struct NewGameRecord {
    id: String,
    winner: String,
    board: String,
    timestamp: String,
}
