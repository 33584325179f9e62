//! Routes decoded commands to controller operations.
//!
//! Every client command maps to exactly one controller call through a
//! `match` on [`ClientCommand`]; there is no runtime handler registry.
//! Errors are caught here, logged, and only echoed back to the sender
//! when error surfacing is switched on.

use tracing::{debug, instrument, warn};

use super::error::ProtocolError;
use super::messages::{ClientCommand, ServerMessage};
use crate::controller::SessionController;
use crate::session::{ConnectionId, ValidationError};

/// Anything that stopped a client frame from taking effect.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::From)]
pub enum DispatchError {
    /// The frame could not be decoded.
    #[display("{_0}")]
    Protocol(ProtocolError),
    /// The command was decoded but refused.
    #[display("{_0}")]
    Validation(ValidationError),
}

impl std::error::Error for DispatchError {}

/// Decodes client frames and applies them to the controller.
#[derive(Debug, Clone, Copy, Default, derive_new::new)]
pub struct Dispatcher {
    /// Whether rejection reasons are sent back to the client as `ERROR`.
    surface_errors: bool,
}

impl Dispatcher {
    /// Whether rejection reasons are sent back to clients.
    pub fn surface_errors(&self) -> bool {
        self.surface_errors
    }

    /// Handles one text frame from `connection`.
    ///
    /// Returns the reply owed to the sender, which is only ever an `ERROR`
    /// message and only when error surfacing is on.
    #[instrument(skip(self, controller, text), fields(%connection))]
    pub fn handle_text(
        &self,
        controller: &SessionController,
        connection: ConnectionId,
        text: &str,
    ) -> Option<ServerMessage> {
        match self.route(controller, connection, text) {
            Ok(()) => None,
            Err(error) => self.reject(connection, error),
        }
    }

    /// Decodes `text` and runs the matching controller operation.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError`] if decoding or validation fails. A move into
    /// a full row is not an error.
    #[instrument(skip(self, controller, text), fields(%connection))]
    pub fn route(
        &self,
        controller: &SessionController,
        connection: ConnectionId,
        text: &str,
    ) -> Result<(), DispatchError> {
        let command = ClientCommand::decode(text)?;
        debug!(tag = %command.tag(), "Dispatching command");

        match command {
            ClientCommand::PreselectMove(mv) => controller.preselect_move(connection, mv)?,
            ClientCommand::Move(mv) => {
                let outcome = controller.play_move(connection, mv)?;
                debug!(?outcome, "Move handled");
            }
        }
        Ok(())
    }

    /// Logs a failure and builds the reply the sender may see.
    #[instrument(skip(self))]
    pub fn reject(&self, connection: ConnectionId, error: DispatchError) -> Option<ServerMessage> {
        warn!(%connection, %error, "Client message rejected");
        self.surface_errors.then(|| ServerMessage::Error {
            error: error.to_string(),
        })
    }
}
