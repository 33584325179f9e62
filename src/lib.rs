//! Side Stacker referee library.
//!
//! A WebSocket server that seats two players in a game of side-stacking
//! connect-four and enforces the rules between them.
//!
//! # Architecture
//!
//! - **Board**: grid, gravity and win detection (`side_stacker_board` crate)
//! - **Protocol**: JSON wire messages and command dispatch
//! - **Session**: one game's seats, turn and lifecycle
//! - **Controller**: the single live session and every open connection
//! - **Persistence**: completion records written to SQLite or the log
//! - **Server**: axum WebSocket transport
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use side_stacker::{Dispatcher, GameServer, LogResultSink, ServerConfig, SessionController};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = ServerConfig::default();
//! let controller = Arc::new(SessionController::new(config.board()?, Arc::new(LogResultSink)));
//! let server = GameServer::new(controller, Dispatcher::new(*config.debug_errors()));
//!
//! let listener = tokio::net::TcpListener::bind(config.bind_address()).await?;
//! server.run(listener).await?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

// Private module declarations
mod config;
mod controller;
mod db;
mod persistence;
mod protocol;
mod server;
mod session;

// Crate-level exports - Configuration
pub use config::{ConfigError, ServerConfig};

// Crate-level exports - Controller
pub use controller::{Outbox, SessionController, SessionView};

// Crate-level exports - Database
pub use db::{DbError, GameRecord, GameRepository, NewGameRecord};

// Crate-level exports - Persistence
pub use persistence::{
    CompletionRecord, LogResultSink, PersistenceError, ResultSink, SqliteResultSink,
};

// Crate-level exports - Wire protocol
pub use protocol::{
    ClientCommand, CommandTag, DispatchError, Dispatcher, Move, ProtocolError, ServerMessage,
};

// Crate-level exports - Server types
pub use server::{CONNECTION_CHANNEL_BUFFER, GameServer};

// Crate-level exports - Session management
pub use session::{
    ConnectionId, GameSession, MoveOutcome, SessionId, SessionState, ValidationError,
};

// Crate-level exports - Board types
pub use side_stacker_board::{
    Board, BoardError, Cell, Color, DEFAULT_GRID_SIZE, DEFAULT_WIN_LENGTH, GameStatus, Outcome,
    PlayError, Side, check_win_condition,
};
