//! The square grid and the side-entry move algorithm.

use crate::types::{Cell, Color, GameStatus, Side};
use crate::win::check_win_condition;
use tracing::{debug, instrument};

/// Default side length of the grid.
pub const DEFAULT_GRID_SIZE: usize = 7;

/// Default number of aligned pieces needed to win.
pub const DEFAULT_WIN_LENGTH: usize = 4;

/// Reasons a move could not be applied to the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display)]
pub enum PlayError {
    /// The requested row does not exist.
    #[display("Row {row} is out of bounds for a {grid_size}x{grid_size} grid")]
    RowOutOfBounds {
        /// Requested row.
        row: usize,
        /// Grid side length.
        grid_size: usize,
    },
    /// Every cell of the row is occupied.
    #[display("Row {_0} is full")]
    RowFull(usize),
}

impl std::error::Error for PlayError {}

/// Reasons a board could not be built.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display)]
pub enum BoardError {
    /// Grid size or win length is unusable.
    #[display("Invalid dimensions: grid size {grid_size}, win length {win_length}")]
    InvalidDimensions {
        /// Requested side length.
        grid_size: usize,
        /// Requested win length.
        win_length: usize,
    },
    /// An encoded board has the wrong number of cells.
    #[display("Encoded board has {actual} cells, expected {expected}")]
    WrongLength {
        /// Cells expected (`grid_size²`).
        expected: usize,
        /// Cells found.
        actual: usize,
    },
    /// An encoded board contains a character other than `R`, `Y` or `o`.
    #[display("Unknown cell code {_0:?}")]
    UnknownCode(char),
}

impl std::error::Error for BoardError {}

/// N×N grid, stored row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Board {
    grid_size: usize,
    win_length: usize,
    cells: Vec<Cell>,
}

impl Board {
    /// Creates an empty board.
    ///
    /// # Errors
    ///
    /// Returns [`BoardError::InvalidDimensions`] if the grid is empty or the
    /// win length is zero or longer than a row.
    #[instrument]
    pub fn new(grid_size: usize, win_length: usize) -> Result<Self, BoardError> {
        if grid_size == 0 || win_length == 0 || win_length > grid_size {
            return Err(BoardError::InvalidDimensions {
                grid_size,
                win_length,
            });
        }
        Ok(Self {
            grid_size,
            win_length,
            cells: vec![Cell::Empty; grid_size * grid_size],
        })
    }

    /// Creates the standard 7×7, four-to-win board.
    pub fn standard() -> Self {
        Self {
            grid_size: DEFAULT_GRID_SIZE,
            win_length: DEFAULT_WIN_LENGTH,
            cells: vec![Cell::Empty; DEFAULT_GRID_SIZE * DEFAULT_GRID_SIZE],
        }
    }

    /// Side length of the grid.
    pub fn grid_size(&self) -> usize {
        self.grid_size
    }

    /// Pieces in a line needed to win.
    pub fn win_length(&self) -> usize {
        self.win_length
    }

    /// Cell at `(row, col)`, or `None` outside the grid.
    pub fn get(&self, row: usize, col: usize) -> Option<Cell> {
        if row >= self.grid_size || col >= self.grid_size {
            return None;
        }
        self.cells.get(row * self.grid_size + col).copied()
    }

    /// Overwrites a cell. Intended for setting up positions; games go through
    /// [`Board::apply_move`].
    ///
    /// # Errors
    ///
    /// Returns [`PlayError::RowOutOfBounds`] if `(row, col)` is outside the grid.
    pub fn set(&mut self, row: usize, col: usize, cell: Cell) -> Result<(), PlayError> {
        if row >= self.grid_size || col >= self.grid_size {
            return Err(PlayError::RowOutOfBounds {
                row,
                grid_size: self.grid_size,
            });
        }
        self.cells[row * self.grid_size + col] = cell;
        Ok(())
    }

    /// Borrowed view of one row.
    pub fn row(&self, row: usize) -> Option<&[Cell]> {
        if row >= self.grid_size {
            return None;
        }
        let start = row * self.grid_size;
        Some(&self.cells[start..start + self.grid_size])
    }

    /// Structural snapshot of the grid, one `Vec` per row.
    pub fn rows(&self) -> Vec<Vec<Cell>> {
        self.cells
            .chunks(self.grid_size)
            .map(<[Cell]>::to_vec)
            .collect()
    }

    /// All cells in row-major order.
    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    /// Checks only that the row exists; a full row is still a valid position.
    pub fn is_valid_position(&self, _side: Side, row: usize) -> bool {
        row < self.grid_size
    }

    /// Checks if every cell is occupied.
    pub fn is_full(&self) -> bool {
        self.cells.iter().all(|cell| !cell.is_empty())
    }

    /// Inserts a piece of `color` into `row` from `side`.
    ///
    /// The new piece lands on the entry edge. Pieces already sitting between
    /// the edge and the nearest empty cell slide one step inward to make room,
    /// so that empty cell ends up occupied. Returns the committed row.
    ///
    /// # Errors
    ///
    /// - [`PlayError::RowOutOfBounds`] if `row` is not on the grid.
    /// - [`PlayError::RowFull`] if the row has no empty cell; the board is
    ///   left untouched.
    #[instrument(skip(self), fields(grid_size = self.grid_size))]
    pub fn apply_move(&mut self, color: Color, side: Side, row: usize) -> Result<&[Cell], PlayError> {
        if row >= self.grid_size {
            return Err(PlayError::RowOutOfBounds {
                row,
                grid_size: self.grid_size,
            });
        }

        let start = row * self.grid_size;
        let line = &mut self.cells[start..start + self.grid_size];
        let piece = Cell::from(color);

        match side {
            Side::Left => {
                let gap = line
                    .iter()
                    .position(|cell| cell.is_empty())
                    .ok_or(PlayError::RowFull(row))?;
                line[..=gap].rotate_right(1);
                line[0] = piece;
            }
            Side::Right => {
                let gap = line
                    .iter()
                    .rposition(|cell| cell.is_empty())
                    .ok_or(PlayError::RowFull(row))?;
                line[gap..].rotate_left(1);
                let edge = line.len() - 1;
                line[edge] = piece;
            }
        }

        debug!(?color, %side, row, "Piece inserted");
        Ok(&self.cells[start..start + self.grid_size])
    }

    /// Scans the board for a completed line or a full grid.
    pub fn check_win_condition(&self) -> GameStatus {
        check_win_condition(self)
    }

    /// Row-major, one character per cell (`R`, `Y`, `o`).
    #[instrument(skip(self))]
    pub fn encode(&self) -> String {
        self.cells.iter().map(|cell| cell.code()).collect()
    }

    /// Rebuilds a board from [`Board::encode`] output.
    ///
    /// # Errors
    ///
    /// Returns [`BoardError`] for bad dimensions, a length other than
    /// `grid_size²`, or an unknown character.
    #[instrument(skip(encoded))]
    pub fn decode(grid_size: usize, win_length: usize, encoded: &str) -> Result<Self, BoardError> {
        let mut board = Self::new(grid_size, win_length)?;
        let cells = encoded
            .chars()
            .map(|code| Cell::from_code(code).ok_or(BoardError::UnknownCode(code)))
            .collect::<Result<Vec<_>, _>>()?;
        if cells.len() != board.cells.len() {
            return Err(BoardError::WrongLength {
                expected: board.cells.len(),
                actual: cells.len(),
            });
        }
        board.cells = cells;
        Ok(board)
    }

    /// Formats the board as a human-readable grid.
    pub fn display(&self) -> String {
        self.cells
            .chunks(self.grid_size)
            .map(|row| {
                row.iter()
                    .map(|cell| match cell {
                        Cell::Empty => ".",
                        Cell::Red => "R",
                        Cell::Yellow => "Y",
                    })
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const R: Cell = Cell::Red;
    const Y: Cell = Cell::Yellow;
    const E: Cell = Cell::Empty;

    fn board_with_row(row: usize, cells: [Cell; 7]) -> Board {
        let mut board = Board::standard();
        for (col, cell) in cells.into_iter().enumerate() {
            board.set(row, col, cell).unwrap();
        }
        board
    }

    #[test]
    fn test_left_entry_on_empty_row() {
        let mut board = Board::standard();
        let row = board.apply_move(Color::Red, Side::Left, 0).unwrap().to_vec();
        assert_eq!(row, vec![R, E, E, E, E, E, E]);
    }

    #[test]
    fn test_right_entry_on_empty_row() {
        let mut board = Board::standard();
        let row = board.apply_move(Color::Yellow, Side::Right, 6).unwrap().to_vec();
        assert_eq!(row, vec![E, E, E, E, E, E, Y]);
    }

    #[test]
    fn test_left_entry_pushes_pieces_inward() {
        let mut board = board_with_row(2, [R, Y, E, R, E, E, E]);
        let row = board.apply_move(Color::Yellow, Side::Left, 2).unwrap().to_vec();
        assert_eq!(row, vec![Y, R, Y, R, E, E, E]);
    }

    #[test]
    fn test_right_entry_pushes_pieces_inward() {
        let mut board = board_with_row(3, [E, E, Y, E, R, R, Y]);
        let row = board.apply_move(Color::Red, Side::Right, 3).unwrap().to_vec();
        assert_eq!(row, vec![E, E, Y, R, R, Y, R]);
    }

    #[test]
    fn test_move_adds_exactly_one_piece() {
        let mut board = board_with_row(1, [Y, R, Y, E, Y, E, R]);
        let before: Vec<Cell> = board.row(1).unwrap().to_vec();
        board.apply_move(Color::Red, Side::Right, 1).unwrap();
        let after = board.row(1).unwrap();

        let count = |cells: &[Cell], c: Cell| cells.iter().filter(|&&x| x == c).count();
        assert_eq!(count(after, R), count(&before, R) + 1);
        assert_eq!(count(after, Y), count(&before, Y));
        assert_eq!(count(after, E), count(&before, E) - 1);
    }

    #[test]
    fn test_full_row_is_untouched() {
        let mut board = board_with_row(4, [R, Y, R, Y, R, Y, R]);
        let snapshot = board.clone();
        assert_eq!(
            board.apply_move(Color::Yellow, Side::Left, 4),
            Err(PlayError::RowFull(4))
        );
        assert_eq!(
            board.apply_move(Color::Yellow, Side::Right, 4),
            Err(PlayError::RowFull(4))
        );
        assert_eq!(board, snapshot);
    }

    #[test]
    fn test_row_out_of_bounds() {
        let mut board = Board::standard();
        assert!(matches!(
            board.apply_move(Color::Red, Side::Left, 7),
            Err(PlayError::RowOutOfBounds { row: 7, .. })
        ));
        assert!(!board.is_valid_position(Side::Right, 7));
        assert!(board.is_valid_position(Side::Right, 6));
    }

    #[test]
    fn test_invalid_dimensions_rejected() {
        assert!(Board::new(0, 1).is_err());
        assert!(Board::new(5, 0).is_err());
        assert!(Board::new(3, 4).is_err());
        assert!(Board::new(3, 3).is_ok());
    }

    #[test]
    fn test_encode_layout() {
        let mut board = Board::standard();
        board.apply_move(Color::Red, Side::Left, 0).unwrap();
        board.apply_move(Color::Yellow, Side::Right, 6).unwrap();
        let encoded = board.encode();

        assert_eq!(encoded.len(), 49);
        assert!(encoded.starts_with("Roooooo"));
        assert!(encoded.ends_with("ooooooY"));
        assert_eq!(Board::decode(7, 4, &encoded).unwrap(), board);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert_eq!(
            Board::decode(3, 3, "RYo"),
            Err(BoardError::WrongLength { expected: 9, actual: 3 })
        );
        assert_eq!(
            Board::decode(3, 3, "RYoRYoRYx"),
            Err(BoardError::UnknownCode('x'))
        );
    }

    #[test]
    fn test_display() {
        let mut board = Board::new(3, 3).unwrap();
        board.apply_move(Color::Red, Side::Left, 1).unwrap();
        assert_eq!(board.display(), ". . .\nR . .\n. . .");
    }
}
