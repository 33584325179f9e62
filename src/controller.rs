//! Session controller: seats connections, routes moves, and retires finished games.
//!
//! The controller holds at most one live [`GameSession`]. One game at a time
//! is a stated capacity limit: a third connection while both seats are taken
//! is turned away with `ERR_GAME_IN_PROGRESS`.
//!
//! All session state sits behind a single mutex. Each operation runs its
//! read-validate-mutate-broadcast sequence while holding it, so two moves
//! racing each other cannot both pass the turn check. Broadcasting only
//! enqueues onto per-connection channels and never blocks. The completion
//! record is handed to the [`ResultSink`] on a spawned task after the lock
//! is released.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;
use derive_getters::Getters;
use side_stacker_board::{Board, Color, Outcome};
use tokio::sync::mpsc;
use tracing::{debug, error, info, instrument, warn};

use crate::persistence::{CompletionRecord, ResultSink};
use crate::protocol::{Move, ServerMessage};
use crate::session::{
    ConnectionId, GameSession, MoveOutcome, SessionId, SessionState, ValidationError,
};

/// Sending half of a connection's outbound queue.
pub type Outbox = mpsc::Sender<ServerMessage>;

/// Per-connection metadata.
#[derive(Debug)]
struct ConnectionEntry {
    outbox: Outbox,
    session: Option<SessionId>,
    color: Option<Color>,
}

#[derive(Debug, Default)]
struct ControllerState {
    session: Option<GameSession>,
    connections: HashMap<ConnectionId, ConnectionEntry>,
}

impl ControllerState {
    /// Colour `connection` holds in the live session.
    fn seat_of(&self, connection: ConnectionId) -> Result<Color, ValidationError> {
        let session = self.session.as_ref().ok_or(ValidationError::NoActiveGame)?;
        let entry = self
            .connections
            .get(&connection)
            .ok_or(ValidationError::NotSeated)?;
        match (entry.session.as_ref(), entry.color) {
            (Some(id), Some(color)) if id == session.id() => Ok(color),
            _ => Err(ValidationError::NotSeated),
        }
    }

    fn assign(&mut self, connection: ConnectionId, session: &SessionId, color: Color) {
        if let Some(entry) = self.connections.get_mut(&connection) {
            entry.session = Some(session.clone());
            entry.color = Some(color);
        }
    }

    fn deliver(&self, to: ConnectionId, message: ServerMessage) {
        let Some(entry) = self.connections.get(&to) else {
            debug!(connection = %to, "Recipient already gone; message dropped");
            return;
        };
        if let Err(e) = entry.outbox.try_send(message) {
            warn!(connection = %to, error = %e, "Failed to enqueue message, channel full or closed");
        }
    }

    /// Sends to whichever connection sits opposite `color`.
    fn deliver_to_opponent(&self, color: Color, message: ServerMessage) {
        let Some(opponent) = self.session.as_ref().and_then(|s| s.opponent_of(color)) else {
            debug!(?color, "No opponent seated; message dropped");
            return;
        };
        self.deliver(opponent, message);
    }
}

/// Read-only snapshot of the live session.
#[derive(Debug, Clone, PartialEq, Eq, Getters)]
pub struct SessionView {
    id: SessionId,
    state: SessionState,
    turn: Color,
    board: Board,
    red: Option<ConnectionId>,
    yellow: Option<ConnectionId>,
}

/// Owns the single live session and the connection table.
pub struct SessionController {
    template: Board,
    state: Mutex<ControllerState>,
    sink: Arc<dyn ResultSink>,
}

impl std::fmt::Debug for SessionController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionController")
            .field("grid_size", &self.template.grid_size())
            .field("win_length", &self.template.win_length())
            .finish_non_exhaustive()
    }
}

impl SessionController {
    /// Creates a controller. Each new session starts from a clone of `template`.
    #[instrument(skip_all, fields(grid_size = template.grid_size(), win_length = template.win_length()))]
    pub fn new(template: Board, sink: Arc<dyn ResultSink>) -> Self {
        info!("Creating session controller");
        Self {
            template,
            state: Mutex::new(ControllerState::default()),
            sink,
        }
    }

    fn lock(&self) -> MutexGuard<'_, ControllerState> {
        self.state.lock().unwrap_or_else(|poisoned| {
            error!("Controller state lock poisoned; continuing with inner state");
            poisoned.into_inner()
        })
    }

    /// Registers a new connection and seats it if a seat is available.
    ///
    /// - No session: a session is created, the connection takes Red and is
    ///   told `WAITING_FOR_OPPONENT`.
    /// - Waiting: the connection takes Yellow and both players get `GAME_STARTED`.
    /// - Paused: the connection takes the vacant colour, gets `GAME_STARTED`,
    ///   and both players get `GAME_RESUMED` with the stored board and turn.
    /// - Active: the connection gets `ERR_GAME_IN_PROGRESS` and stays unseated.
    #[instrument(skip(self, outbox))]
    pub fn connect(&self, outbox: Outbox) -> ConnectionId {
        let connection = ConnectionId::new();
        let mut guard = self.lock();
        let state = &mut *guard;
        state.connections.insert(
            connection,
            ConnectionEntry {
                outbox,
                session: None,
                color: None,
            },
        );

        match state.session.as_ref().map(GameSession::state) {
            None | Some(SessionState::Finished) => {
                let mut session = GameSession::with_random_id(self.template.clone());
                session.bind(Color::Red, connection);
                state.assign(connection, session.id(), Color::Red);
                info!(%connection, session_id = %session.id(), "First player seated as RED");
                state.session = Some(session);
                state.deliver(connection, ServerMessage::WaitingForOpponent);
            }
            Some(SessionState::WaitingForOpponent) => {
                let Some(session) = state.session.as_mut() else {
                    return connection;
                };
                session.bind(Color::Yellow, connection);
                let session_id = session.id().clone();
                let red = session.seat(Color::Red);
                state.assign(connection, &session_id, Color::Yellow);
                info!(%connection, %session_id, "Second player seated as YELLOW; game started");

                if let Some(red) = red {
                    state.deliver(
                        red,
                        ServerMessage::GameStarted {
                            player_color: Color::Red,
                        },
                    );
                }
                state.deliver(
                    connection,
                    ServerMessage::GameStarted {
                        player_color: Color::Yellow,
                    },
                );
            }
            Some(SessionState::Paused) => {
                let Some(session) = state.session.as_mut() else {
                    return connection;
                };
                let Some(color) = session.vacant_color() else {
                    return connection;
                };
                session.bind(color, connection);
                let session_id = session.id().clone();
                let resumed = ServerMessage::GameResumed {
                    reconnected_player_color: color,
                    next_turn: session.turn(),
                    board: session.board().rows(),
                };
                let opponent = session.opponent_of(color);
                state.assign(connection, &session_id, color);
                info!(%connection, %session_id, ?color, "Vacant seat reclaimed; game resumed");

                state.deliver(
                    connection,
                    ServerMessage::GameStarted {
                        player_color: color,
                    },
                );
                state.deliver(connection, resumed.clone());
                if let Some(opponent) = opponent {
                    state.deliver(opponent, resumed);
                }
            }
            Some(SessionState::Active) => {
                warn!(%connection, "Game in progress; connection not seated");
                state.deliver(connection, ServerMessage::ErrGameInProgress);
            }
        }

        connection
    }

    /// Forgets a closed connection and releases its seat.
    ///
    /// Leaving before an opponent arrives discards the session. Leaving a
    /// started game pauses it and tells the remaining player; if nobody is
    /// left the session is discarded.
    #[instrument(skip(self))]
    pub fn disconnect(&self, connection: ConnectionId) {
        let mut guard = self.lock();
        let state = &mut *guard;
        let Some(entry) = state.connections.remove(&connection) else {
            debug!("Unknown connection closed");
            return;
        };

        let Some(session) = state.session.as_mut() else {
            debug!("Connection closed with no live session");
            return;
        };
        if entry.session.as_ref() != Some(session.id()) {
            debug!("Unseated connection closed");
            return;
        }

        let prior = session.state();
        let Some(color) = session.unbind(connection) else {
            return;
        };

        match prior {
            SessionState::WaitingForOpponent => {
                info!(session_id = %session.id(), "Waiting player left; session discarded");
                state.session = None;
            }
            SessionState::Active | SessionState::Paused => {
                if session.is_deserted() {
                    info!(session_id = %session.id(), "Both players gone; session discarded");
                    state.session = None;
                } else {
                    info!(session_id = %session.id(), ?color, "Player disconnected; game paused");
                    state.deliver_to_opponent(color, ServerMessage::PlayerDisconnected { color });
                }
            }
            SessionState::Finished => {}
        }
    }

    /// Relays a candidate move to the opponent without touching the board.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] if the sender is not seated, the game is
    /// not active, the row is out of bounds, or it is not the sender's turn.
    #[instrument(skip(self))]
    pub fn preselect_move(&self, connection: ConnectionId, mv: Move) -> Result<(), ValidationError> {
        let guard = self.lock();
        let color = guard.seat_of(connection)?;
        let session = guard.session.as_ref().ok_or(ValidationError::NoActiveGame)?;
        session.validate(color, mv)?;

        debug!(?color, ?mv, "Relaying preselection");
        guard.deliver_to_opponent(color, ServerMessage::OpponentPreselection(mv));
        Ok(())
    }

    /// Plays a move for the sender.
    ///
    /// A full row is a silent no-op. Otherwise the opponent receives
    /// `OPPONENT_MOVE`, the turn passes, and a winning or tying move
    /// retires the session and emits its completion record.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] under the same conditions as
    /// [`SessionController::preselect_move`].
    #[instrument(skip(self))]
    pub fn play_move(
        &self,
        connection: ConnectionId,
        mv: Move,
    ) -> Result<MoveOutcome, ValidationError> {
        let (outcome, record) = {
            let mut guard = self.lock();
            let state = &mut *guard;
            let color = state.seat_of(connection)?;
            let session = state.session.as_mut().ok_or(ValidationError::NoActiveGame)?;

            let outcome = session.play(color, mv)?;
            let MoveOutcome::Played(status) = outcome else {
                return Ok(outcome);
            };

            state.deliver_to_opponent(color, ServerMessage::OpponentMove(mv));
            let record = status
                .outcome()
                .and_then(|result| Self::retire(state, result));
            (outcome, record)
        };

        if let Some(record) = record {
            self.emit(record);
        }
        Ok(outcome)
    }

    /// Removes the finished session and clears every seat that pointed at it.
    fn retire(state: &mut ControllerState, result: Outcome) -> Option<CompletionRecord> {
        let session = state.session.take()?;
        for entry in state.connections.values_mut() {
            if entry.session.as_ref() == Some(session.id()) {
                entry.session = None;
                entry.color = None;
            }
        }
        info!(session_id = %session.id(), %result, "Session finished and cleared");
        session.completion_record(Utc::now())
    }

    /// Hands a record to the sink without waiting for the write.
    fn emit(&self, record: CompletionRecord) {
        let sink = Arc::clone(&self.sink);
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                runtime.spawn(async move {
                    let id = record.id().clone();
                    if let Err(e) = sink.record(record).await {
                        warn!(session_id = %id, error = %e, "Failed to persist game result");
                    }
                });
            }
            Err(e) => {
                error!(session_id = %record.id(), error = %e, "No async runtime; game result dropped");
            }
        }
    }

    /// Snapshot of the live session, if any.
    pub fn session_view(&self) -> Option<SessionView> {
        let guard = self.lock();
        guard.session.as_ref().map(|session| SessionView {
            id: session.id().clone(),
            state: session.state(),
            turn: session.turn(),
            board: session.board().clone(),
            red: session.seat(Color::Red),
            yellow: session.seat(Color::Yellow),
        })
    }

    /// Colour currently bound to `connection`.
    pub fn color_of(&self, connection: ConnectionId) -> Option<Color> {
        self.lock().seat_of(connection).ok()
    }

    /// Number of open connections, seated or not.
    pub fn connection_count(&self) -> usize {
        self.lock().connections.len()
    }
}
