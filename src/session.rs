//! Live state of a single game: board, seats, turn and outcome.
//!
//! A [`GameSession`] performs no I/O. The [`SessionController`](crate::SessionController)
//! owns it, decides who is connected, and turns the results of these methods
//! into outbound messages.

use chrono::{DateTime, Utc};
use side_stacker_board::{Board, Color, GameStatus, Outcome, PlayError};
use strum::IntoEnumIterator;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::persistence::CompletionRecord;
use crate::protocol::Move;

/// Unique identifier for a game session.
pub type SessionId = String;

/// Opaque identity of one client connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, derive_more::Display)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    /// Allocates a fresh random id.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

/// Lifecycle state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
pub enum SessionState {
    /// Red is seated, Yellow has never joined.
    WaitingForOpponent,
    /// Both seats are bound and nobody has won.
    Active,
    /// The game started but one seat is vacant.
    Paused,
    /// A winner or tie has been recorded.
    Finished,
}

/// Reasons a move or preselection was refused. The session is never modified
/// when one of these is returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display)]
pub enum ValidationError {
    /// The connection holds no seat in the current session.
    #[display("Connection is not seated in a game")]
    NotSeated,
    /// No session exists.
    #[display("No game in progress")]
    NoActiveGame,
    /// The second player has not joined yet.
    #[display("Game has not started")]
    GameNotStarted,
    /// The opponent's seat is vacant while they reconnect.
    #[display("Opponent is disconnected")]
    OpponentAbsent,
    /// The game already has a result.
    #[display("Game is already over")]
    GameOver,
    /// The row does not exist.
    #[display("Position is out of bounds: row {row} on a {grid_size}x{grid_size} grid")]
    OutOfBounds {
        /// Requested row.
        row: usize,
        /// Grid side length.
        grid_size: usize,
    },
    /// Sent by the colour that is not on move.
    #[display("Not their turn: {_0} is waiting for the opponent")]
    NotYourTurn(Color),
}

impl std::error::Error for ValidationError {}

/// What a validated move did to the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOutcome {
    /// The row was full. Nothing changed and nothing is broadcast.
    RowFull,
    /// The piece was placed and the turn passed; carries the board verdict.
    Played(GameStatus),
}

/// A game session with two seats.
#[derive(Debug, Clone)]
pub struct GameSession {
    id: SessionId,
    board: Board,
    red: Option<ConnectionId>,
    yellow: Option<ConnectionId>,
    turn: Color,
    has_started: bool,
    winner: Option<Outcome>,
}

impl GameSession {
    /// Creates a session around an empty board. Red moves first.
    #[instrument(skip(board), fields(grid_size = board.grid_size()))]
    pub fn new(id: SessionId, board: Board) -> Self {
        info!(session_id = %id, "Creating new game session");
        Self {
            id,
            board,
            red: None,
            yellow: None,
            turn: Color::Red,
            has_started: false,
            winner: None,
        }
    }

    /// Creates a session with a random UUID.
    pub fn with_random_id(board: Board) -> Self {
        Self::new(Uuid::new_v4().to_string(), board)
    }

    /// Session ID.
    pub fn id(&self) -> &SessionId {
        &self.id
    }

    /// Current board.
    pub fn board(&self) -> &Board {
        &self.board
    }

    /// Colour to move next.
    pub fn turn(&self) -> Color {
        self.turn
    }

    /// Whether both players have ever been seated together.
    pub fn has_started(&self) -> bool {
        self.has_started
    }

    /// Recorded result, if the game is over.
    pub fn winner(&self) -> Option<Outcome> {
        self.winner
    }

    /// Connection bound to `color`, if any.
    pub fn seat(&self, color: Color) -> Option<ConnectionId> {
        match color {
            Color::Red => self.red,
            Color::Yellow => self.yellow,
        }
    }

    fn seat_mut(&mut self, color: Color) -> &mut Option<ConnectionId> {
        match color {
            Color::Red => &mut self.red,
            Color::Yellow => &mut self.yellow,
        }
    }

    /// Derives the lifecycle state from seats, start flag and winner.
    pub fn state(&self) -> SessionState {
        if self.winner.is_some() {
            SessionState::Finished
        } else if !self.has_started {
            SessionState::WaitingForOpponent
        } else if self.red.is_some() && self.yellow.is_some() {
            SessionState::Active
        } else {
            SessionState::Paused
        }
    }

    /// First unbound colour, Red before Yellow.
    pub fn vacant_color(&self) -> Option<Color> {
        Color::iter().find(|color| self.seat(*color).is_none())
    }

    /// Checks if no seat is bound.
    pub fn is_deserted(&self) -> bool {
        self.red.is_none() && self.yellow.is_none()
    }

    /// Colour bound to `connection`, if it holds a seat.
    pub fn color_of(&self, connection: ConnectionId) -> Option<Color> {
        Color::iter().find(|color| self.seat(*color) == Some(connection))
    }

    /// Connection seated opposite `color`.
    pub fn opponent_of(&self, color: Color) -> Option<ConnectionId> {
        self.seat(color.opponent())
    }

    /// Binds `connection` to `color`. Once both seats are bound the game counts
    /// as started, and stays started through later disconnections.
    #[instrument(skip(self), fields(session_id = %self.id))]
    pub fn bind(&mut self, color: Color, connection: ConnectionId) {
        if let Some(previous) = self.seat_mut(color).replace(connection) {
            warn!(%previous, ?color, "Seat was already bound; replacing");
        }
        if self.red.is_some() && self.yellow.is_some() && !self.has_started {
            info!("Both seats bound; game started");
            self.has_started = true;
        }
        debug!(?color, %connection, state = %self.state(), "Seat bound");
    }

    /// Clears the seat held by `connection` and returns its colour.
    #[instrument(skip(self), fields(session_id = %self.id))]
    pub fn unbind(&mut self, connection: ConnectionId) -> Option<Color> {
        let color = self.color_of(connection)?;
        *self.seat_mut(color) = None;
        debug!(?color, state = %self.state(), "Seat cleared");
        Some(color)
    }

    /// Checks that `color` may submit `mv` now.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] if the game is over or not running, the
    /// opponent is absent, the row is out of bounds, or it is not `color`'s turn.
    #[instrument(skip(self), fields(session_id = %self.id, turn = ?self.turn))]
    pub fn validate(&self, color: Color, mv: Move) -> Result<(), ValidationError> {
        match self.state() {
            SessionState::Finished => return Err(ValidationError::GameOver),
            SessionState::WaitingForOpponent => return Err(ValidationError::GameNotStarted),
            SessionState::Paused => return Err(ValidationError::OpponentAbsent),
            SessionState::Active => {}
        }

        if !self.board.is_valid_position(mv.side, mv.row) {
            return Err(ValidationError::OutOfBounds {
                row: mv.row,
                grid_size: self.board.grid_size(),
            });
        }

        if self.turn != color {
            return Err(ValidationError::NotYourTurn(color));
        }

        Ok(())
    }

    /// Validates and plays `mv` for `color`.
    ///
    /// A full row yields [`MoveOutcome::RowFull`] and leaves everything as it
    /// was. Otherwise the turn passes to the opponent and the board is
    /// checked for a result, which is stored when terminal.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] under the same conditions as [`GameSession::validate`].
    #[instrument(skip(self), fields(session_id = %self.id))]
    pub fn play(&mut self, color: Color, mv: Move) -> Result<MoveOutcome, ValidationError> {
        self.validate(color, mv)?;

        match self.board.apply_move(color, mv.side, mv.row) {
            Ok(_) => {}
            Err(PlayError::RowFull(row)) => {
                debug!(row, "Row full; move ignored");
                return Ok(MoveOutcome::RowFull);
            }
            Err(PlayError::RowOutOfBounds { row, grid_size }) => {
                return Err(ValidationError::OutOfBounds { row, grid_size });
            }
        }

        self.turn = color.opponent();
        let status = self.board.check_win_condition();
        if let Some(outcome) = status.outcome() {
            info!(%outcome, "Game finished");
            self.winner = Some(outcome);
        }

        debug!(?status, next_turn = ?self.turn, "Move applied");
        Ok(MoveOutcome::Played(status))
    }

    /// Builds the record persisted for a finished game.
    pub fn completion_record(&self, finished_at: DateTime<Utc>) -> Option<CompletionRecord> {
        let winner = self.winner?;
        Some(CompletionRecord::new(
            self.id.clone(),
            winner,
            self.board.encode(),
            finished_at.format(CompletionRecord::TIMESTAMP_FORMAT).to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use side_stacker_board::{Cell, Side};

    fn active_session() -> (GameSession, ConnectionId, ConnectionId) {
        let mut session = GameSession::new("test".to_string(), Board::standard());
        let (red, yellow) = (ConnectionId::new(), ConnectionId::new());
        session.bind(Color::Red, red);
        session.bind(Color::Yellow, yellow);
        (session, red, yellow)
    }

    #[test]
    fn test_lifecycle_states() {
        let mut session = GameSession::new("s".to_string(), Board::standard());
        let red = ConnectionId::new();
        session.bind(Color::Red, red);
        assert_eq!(session.state(), SessionState::WaitingForOpponent);
        assert_eq!(session.vacant_color(), Some(Color::Yellow));

        let yellow = ConnectionId::new();
        session.bind(Color::Yellow, yellow);
        assert_eq!(session.state(), SessionState::Active);
        assert!(session.has_started());

        assert_eq!(session.unbind(yellow), Some(Color::Yellow));
        assert_eq!(session.state(), SessionState::Paused);
        assert_eq!(session.unbind(yellow), None);

        session.bind(Color::Yellow, ConnectionId::new());
        assert_eq!(session.state(), SessionState::Active);
    }

    #[test]
    fn test_turns_alternate() {
        let (mut session, _, _) = active_session();
        assert_eq!(session.turn(), Color::Red);
        session.play(Color::Red, Move::new(Side::Left, 0)).unwrap();
        assert_eq!(session.turn(), Color::Yellow);
        session.play(Color::Yellow, Move::new(Side::Right, 0)).unwrap();
        assert_eq!(session.turn(), Color::Red);
    }

    #[test]
    fn test_out_of_turn_rejected_without_change() {
        let (mut session, _, _) = active_session();
        let before = session.board().clone();
        assert_eq!(
            session.play(Color::Yellow, Move::new(Side::Left, 0)),
            Err(ValidationError::NotYourTurn(Color::Yellow))
        );
        assert_eq!(session.board(), &before);
        assert_eq!(session.turn(), Color::Red);
    }

    #[test]
    fn test_out_of_bounds_checked_before_turn() {
        let (session, _, _) = active_session();
        assert_eq!(
            session.validate(Color::Yellow, Move::new(Side::Left, 7)),
            Err(ValidationError::OutOfBounds {
                row: 7,
                grid_size: 7
            })
        );
    }

    #[test]
    fn test_full_row_is_silent_noop() {
        let (mut session, _, _) = active_session();
        for i in 0..7 {
            let color = if i % 2 == 0 { Color::Red } else { Color::Yellow };
            session.play(color, Move::new(Side::Left, 3)).unwrap();
        }
        let board = session.board().clone();
        let turn = session.turn();

        assert_eq!(
            session.play(turn, Move::new(Side::Right, 3)),
            Ok(MoveOutcome::RowFull)
        );
        assert_eq!(session.board(), &board);
        assert_eq!(session.turn(), turn);
    }

    #[test]
    fn test_moves_rejected_unless_active() {
        let mut session = GameSession::new("s".to_string(), Board::standard());
        let red = ConnectionId::new();
        session.bind(Color::Red, red);
        assert_eq!(
            session.play(Color::Red, Move::new(Side::Left, 0)),
            Err(ValidationError::GameNotStarted)
        );

        let yellow = ConnectionId::new();
        session.bind(Color::Yellow, yellow);
        session.unbind(yellow);
        assert_eq!(
            session.play(Color::Red, Move::new(Side::Left, 0)),
            Err(ValidationError::OpponentAbsent)
        );
    }

    #[test]
    fn test_vertical_win_finishes_session() {
        let (mut session, _, _) = active_session();
        // Red stacks column 0 of rows 0..4; Yellow answers from the right.
        for row in 0..3 {
            session.play(Color::Red, Move::new(Side::Left, row)).unwrap();
            session.play(Color::Yellow, Move::new(Side::Right, row)).unwrap();
        }
        let outcome = session.play(Color::Red, Move::new(Side::Left, 3)).unwrap();

        assert_eq!(outcome, MoveOutcome::Played(GameStatus::Won(Color::Red)));
        assert_eq!(session.state(), SessionState::Finished);
        assert_eq!(session.board().get(3, 0), Some(Cell::Red));
        assert_eq!(
            session.play(Color::Yellow, Move::new(Side::Left, 5)),
            Err(ValidationError::GameOver)
        );
    }

    #[test]
    fn test_completion_record() {
        let (mut session, _, _) = active_session();
        let finished_at = Utc.with_ymd_and_hms(2024, 3, 9, 17, 5, 2).unwrap();
        assert!(session.completion_record(finished_at).is_none());

        for row in 0..3 {
            session.play(Color::Red, Move::new(Side::Left, row)).unwrap();
            session.play(Color::Yellow, Move::new(Side::Right, row)).unwrap();
        }
        session.play(Color::Red, Move::new(Side::Left, 3)).unwrap();

        let record = session.completion_record(finished_at).unwrap();
        assert_eq!(record.id(), "test");
        assert_eq!(*record.winner(), Outcome::Won(Color::Red));
        assert_eq!(record.board().len(), 49);
        assert_eq!(record.timestamp(), "2024-03-09 17:05:02");
    }
}
