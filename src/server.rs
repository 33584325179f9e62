//! WebSocket transport.
//!
//! Each socket gets two tasks: one drains its outbound queue into the
//! socket, the other reads frames and hands text to the [`Dispatcher`].
//! Closing the socket is the only cancellation signal; it releases the
//! connection's seat through [`SessionController::disconnect`].

use std::sync::Arc;

use axum::{
    Router,
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::Response,
    routing::get,
};
use futures::{SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tracing::{debug, error, info, instrument, warn};

use crate::controller::SessionController;
use crate::protocol::{Dispatcher, ProtocolError, ServerMessage};

/// Buffer size for each connection's outbound queue.
pub const CONNECTION_CHANNEL_BUFFER: usize = 256;

/// State shared by every socket handler.
#[derive(Debug, Clone)]
struct AppState {
    controller: Arc<SessionController>,
    dispatcher: Dispatcher,
}

/// The referee's network front end.
#[derive(Debug, Clone)]
pub struct GameServer {
    controller: Arc<SessionController>,
    dispatcher: Dispatcher,
}

impl GameServer {
    /// Creates a server around a shared controller.
    #[instrument(skip(controller))]
    pub fn new(controller: Arc<SessionController>, dispatcher: Dispatcher) -> Self {
        info!(surface_errors = dispatcher.surface_errors(), "Creating game server");
        Self {
            controller,
            dispatcher,
        }
    }

    /// Builds the router. WebSocket upgrades are accepted on `/` and `/ws`.
    pub fn router(&self) -> Router {
        let state = AppState {
            controller: Arc::clone(&self.controller),
            dispatcher: self.dispatcher,
        };
        Router::new()
            .route("/", get(ws_handler))
            .route("/ws", get(ws_handler))
            .with_state(state)
    }

    /// Serves on `listener` until the process receives Ctrl+C.
    ///
    /// # Errors
    ///
    /// Returns an error if the listener fails.
    #[instrument(skip_all)]
    pub async fn run(self, listener: TcpListener) -> anyhow::Result<()> {
        let address = listener.local_addr()?;
        info!(%address, "Accepting WebSocket connections");
        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown_signal())
            .await?;
        info!("Server stopped");
        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
    info!("Shutdown requested");
}

/// WebSocket upgrade handler, entry point for new connections.
async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Services one socket until it closes.
async fn handle_socket(socket: WebSocket, state: AppState) {
    let (mut ws_sender, mut ws_receiver) = socket.split();
    let (tx, mut rx) = mpsc::channel::<ServerMessage>(CONNECTION_CHANNEL_BUFFER);

    let connection = state.controller.connect(tx.clone());
    info!(%connection, "WebSocket connection established");

    let send_task = tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            match message.to_json() {
                Ok(json) => {
                    if ws_sender.send(Message::Text(json.into())).await.is_err() {
                        break;
                    }
                }
                Err(e) => warn!(error = %e, "Failed to serialize outbound message"),
            }
        }
    });

    while let Some(result) = ws_receiver.next().await {
        let reply = match result {
            Ok(Message::Text(text)) => {
                state
                    .dispatcher
                    .handle_text(&state.controller, connection, text.as_str())
            }
            Ok(Message::Binary(_)) => state
                .dispatcher
                .reject(connection, ProtocolError::BinaryFrame.into()),
            Ok(Message::Close(_)) => {
                info!(%connection, "WebSocket closed by client");
                break;
            }
            Ok(_) => None,
            Err(e) => {
                error!(%connection, error = %e, "WebSocket error");
                break;
            }
        };

        if let Some(reply) = reply
            && tx.try_send(reply).is_err()
        {
            warn!(%connection, "Failed to send reply, channel full or closed");
        }
    }

    state.controller.disconnect(connection);
    send_task.abort();
    debug!(%connection, "WebSocket connection terminated");
}
