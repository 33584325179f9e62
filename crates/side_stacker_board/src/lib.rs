//! Side-stacking four-in-a-row, pure game logic.
//!
//! Pieces enter a row from its left or right edge and push whatever is
//! already there one step inward. The first player to align four pieces
//! vertically, horizontally or diagonally wins; a full grid with no line
//! is a tie.
//!
//! This crate has no I/O. Sessions, networking and persistence live in
//! the `side_stacker` server crate.

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod board;
mod types;
mod win;

pub use board::{Board, BoardError, DEFAULT_GRID_SIZE, DEFAULT_WIN_LENGTH, PlayError};
pub use types::{Cell, Color, GameStatus, Outcome, Side};
pub use win::check_win_condition;
