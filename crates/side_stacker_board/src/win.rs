//! Win and tie detection.

use crate::board::Board;
use crate::types::{Cell, Color, GameStatus};
use tracing::{debug, instrument};

/// Line directions as (row step, column step): down, right, down-right, up-right.
const DIRECTIONS: [(isize, isize); 4] = [(1, 0), (0, 1), (1, 1), (-1, 1)];

/// Scans every vertical, horizontal and diagonal line of `win_length` cells.
///
/// Returns the colour of the first complete line found, [`GameStatus::Tie`]
/// when no line exists and no cell is empty, and [`GameStatus::Undecided`]
/// otherwise. Start positions are derived from the grid size and win length,
/// so lines touching any edge are covered.
#[instrument(skip(board), fields(grid_size = board.grid_size(), win_length = board.win_length()))]
pub fn check_win_condition(board: &Board) -> GameStatus {
    let size = board.grid_size() as isize;
    let reach = board.win_length() as isize - 1;

    for (dr, dc) in DIRECTIONS {
        for row in 0..size {
            for col in 0..size {
                let (end_row, end_col) = (row + dr * reach, col + dc * reach);
                if !(0..size).contains(&end_row) || !(0..size).contains(&end_col) {
                    continue;
                }
                if let Some(color) = line_owner(board, row, col, dr, dc, board.win_length()) {
                    debug!(?color, row, col, dr, dc, "Winning line found");
                    return GameStatus::Won(color);
                }
            }
        }
    }

    if board.is_full() {
        GameStatus::Tie
    } else {
        GameStatus::Undecided
    }
}

/// Colour shared by all `len` cells starting at `(row, col)`, if any.
fn line_owner(
    board: &Board,
    row: isize,
    col: isize,
    dr: isize,
    dc: isize,
    len: usize,
) -> Option<Color> {
    let first = board.get(row as usize, col as usize)?.color()?;
    (1..len as isize)
        .all(|step| {
            board.get((row + dr * step) as usize, (col + dc * step) as usize)
                == Some(Cell::from(first))
        })
        .then_some(first)
}
