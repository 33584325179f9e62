//! Side Stacker - referee server CLI.

#![warn(missing_docs)]

mod cli;

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Command, HistoryArgs, ServeArgs};
use side_stacker::{
    Board, Dispatcher, GameRecord, GameRepository, GameServer, LogResultSink, ResultSink,
    SessionController, SqliteResultSink,
};
use tracing::{info, instrument, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    initialize_tracing();

    let cli = Cli::parse();

    match cli.command {
        Command::Serve(args) => run_server(args).await,
        Command::History(args) => show_history(args),
    }
}

fn initialize_tracing() {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,side_stacker=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Run the WebSocket referee.
#[instrument(skip_all)]
async fn run_server(args: ServeArgs) -> Result<()> {
    let config = args.into_config()?;
    let board = config.board()?;

    let sink: Arc<dyn ResultSink> = match config.database() {
        Some(path) => {
            let repository = GameRepository::new(path.display().to_string())?;
            repository.run_migrations()?;
            info!(path = %path.display(), "Persisting finished games to SQLite");
            Arc::new(SqliteResultSink::new(repository))
        }
        None => {
            warn!("No database configured; finished games will only be logged");
            Arc::new(LogResultSink)
        }
    };

    let controller = Arc::new(SessionController::new(board, sink));
    let server = GameServer::new(controller, Dispatcher::new(*config.debug_errors()));

    let listener = tokio::net::TcpListener::bind(config.bind_address()).await?;
    info!("Server ready at ws://{}/", config.bind_address());
    server.run(listener).await
}

/// Print stored games, newest first.
#[instrument(skip_all, fields(database = %args.database.display(), limit = args.limit))]
fn show_history(args: HistoryArgs) -> Result<()> {
    let repository = GameRepository::new(args.database.display().to_string())?;
    repository.run_migrations()?;

    let games = repository.list_games(args.limit)?;
    if games.is_empty() {
        println!("No games recorded.");
        return Ok(());
    }

    for game in &games {
        println!("{}  {}  winner: {}", game.timestamp(), game.id(), game.winner());
        match render_board(game) {
            Some(rendered) => println!("{}\n", rendered),
            None => println!("{}\n", game.board()),
        }
    }
    Ok(())
}

/// Renders a stored board, inferring its side length from the encoding.
fn render_board(game: &GameRecord) -> Option<String> {
    let len = game.board().chars().count();
    let grid_size = (1..=len).find(|n| n * n >= len).filter(|n| n * n == len)?;
    let win_length = grid_size.min(side_stacker::DEFAULT_WIN_LENGTH);
    Board::decode(grid_size, win_length, game.board())
        .map(|board| board.display())
        .ok()
}
