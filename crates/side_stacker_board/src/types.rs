//! Core domain types for side-stacking four-in-a-row.

use serde::{Deserialize, Serialize};
use tracing::instrument;

/// Player colour. Red always moves first.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display, strum::EnumIter,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Color {
    /// First player.
    Red,
    /// Second player.
    Yellow,
}

impl Color {
    /// Returns the opposing colour.
    pub fn opponent(self) -> Self {
        match self {
            Color::Red => Color::Yellow,
            Color::Yellow => Color::Red,
        }
    }
}

/// A single cell of the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Cell {
    /// No piece.
    #[default]
    Empty,
    /// Red piece.
    Red,
    /// Yellow piece.
    Yellow,
}

impl Cell {
    /// Returns the colour occupying this cell, if any.
    pub fn color(self) -> Option<Color> {
        match self {
            Cell::Empty => None,
            Cell::Red => Some(Color::Red),
            Cell::Yellow => Some(Color::Yellow),
        }
    }

    /// Checks if the cell holds no piece.
    pub fn is_empty(self) -> bool {
        self == Cell::Empty
    }

    /// Single-character storage code (`R`, `Y`, `o`).
    pub fn code(self) -> char {
        match self {
            Cell::Empty => 'o',
            Cell::Red => 'R',
            Cell::Yellow => 'Y',
        }
    }

    /// Parses a storage code produced by [`Cell::code`].
    pub fn from_code(code: char) -> Option<Self> {
        match code {
            'o' => Some(Cell::Empty),
            'R' => Some(Cell::Red),
            'Y' => Some(Cell::Yellow),
            _ => None,
        }
    }
}

impl From<Color> for Cell {
    fn from(color: Color) -> Self {
        match color {
            Color::Red => Cell::Red,
            Color::Yellow => Cell::Yellow,
        }
    }
}

/// Edge a row is entered from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display)]
pub enum Side {
    /// Pieces enter at column 0 and push rightwards.
    #[serde(rename = "L")]
    #[strum(serialize = "L")]
    Left,
    /// Pieces enter at the last column and push leftwards.
    #[serde(rename = "R")]
    #[strum(serialize = "R")]
    Right,
}

/// Result of scanning the board for a finished game.
///
/// `Undecided` is deliberately separate from `Tie`: only the latter ends a game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GameStatus {
    /// Empty cells remain and nobody has a line yet.
    Undecided,
    /// A colour completed a line.
    Won(Color),
    /// The grid is full without any line.
    Tie,
}

impl GameStatus {
    /// Returns the terminal outcome, or `None` while the game continues.
    pub fn outcome(self) -> Option<Outcome> {
        match self {
            GameStatus::Undecided => None,
            GameStatus::Won(color) => Some(Outcome::Won(color)),
            GameStatus::Tie => Some(Outcome::Tie),
        }
    }
}

/// Terminal result of a game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, derive_more::Display)]
pub enum Outcome {
    /// Winning colour.
    #[display("{_0}")]
    Won(Color),
    /// Full board, no line.
    #[display("TIE")]
    Tie,
}

impl Outcome {
    /// Returns the winning colour, `None` for a tie.
    pub fn winner(self) -> Option<Color> {
        match self {
            Outcome::Won(color) => Some(color),
            Outcome::Tie => None,
        }
    }

    /// Parses the label produced by `Display` (`RED`, `YELLOW`, `TIE`).
    #[instrument]
    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "RED" => Some(Outcome::Won(Color::Red)),
            "YELLOW" => Some(Outcome::Won(Color::Yellow)),
            "TIE" => Some(Outcome::Tie),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opponent_alternates() {
        assert_eq!(Color::Red.opponent(), Color::Yellow);
        assert_eq!(Color::Yellow.opponent(), Color::Red);
    }

    #[test]
    fn test_wire_spelling() {
        assert_eq!(serde_json::to_string(&Side::Left).unwrap(), "\"L\"");
        assert_eq!(serde_json::to_string(&Color::Yellow).unwrap(), "\"YELLOW\"");
        assert_eq!(serde_json::to_string(&Cell::Empty).unwrap(), "\"EMPTY\"");
        assert_eq!(Color::Red.to_string(), "RED");
    }

    #[test]
    fn test_outcome_labels() {
        assert_eq!(Outcome::Won(Color::Red).to_string(), "RED");
        assert_eq!(Outcome::Tie.to_string(), "TIE");
        assert_eq!(Outcome::from_label("YELLOW"), Some(Outcome::Won(Color::Yellow)));
        assert_eq!(Outcome::from_label("draw"), None);
    }

    #[test]
    fn test_undecided_has_no_outcome() {
        assert_eq!(GameStatus::Undecided.outcome(), None);
        assert_eq!(GameStatus::Tie.outcome(), Some(Outcome::Tie));
    }
}
