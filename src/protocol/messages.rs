//! Wire messages exchanged with clients.
//!
//! Every frame is a JSON object `{"cmd": TAG, ...fields}`. Client commands
//! are decoded in two steps: the tag is looked up in the closed
//! [`CommandTag`] set first, so an unknown command is reported as such
//! rather than as a generic parse failure.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use side_stacker_board::{Cell, Color, Side};
use tracing::{debug, instrument};

use super::error::ProtocolError;

/// A move target: the row to play and the edge it is entered from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, derive_new::new)]
pub struct Move {
    /// Entry edge.
    pub side: Side,
    /// Row index, sent on the wire as `index`.
    #[serde(rename = "index")]
    pub row: usize,
}

/// Tags of commands a client may send.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::EnumString, strum::Display)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum CommandTag {
    /// Non-committing preview of a move, relayed to the opponent.
    PreselectMove,
    /// Committed move.
    Move,
}

/// A decoded client command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientCommand {
    /// Show the opponent which move is being considered.
    PreselectMove(Move),
    /// Play a move.
    Move(Move),
}

impl ClientCommand {
    /// Decodes one text frame.
    ///
    /// # Errors
    ///
    /// - [`ProtocolError::Malformed`] if the frame is not a JSON object or the
    ///   fields do not fit the command.
    /// - [`ProtocolError::MissingCommand`] if there is no string `cmd` field.
    /// - [`ProtocolError::UnknownCommand`] if the tag is not recognised.
    #[instrument(skip(text), fields(len = text.len()))]
    pub fn decode(text: &str) -> Result<Self, ProtocolError> {
        let envelope: serde_json::Value =
            serde_json::from_str(text).map_err(|e| ProtocolError::Malformed {
                reason: e.to_string(),
            })?;

        let raw_tag = envelope
            .get("cmd")
            .and_then(serde_json::Value::as_str)
            .ok_or(ProtocolError::MissingCommand)?;

        let tag = CommandTag::from_str(raw_tag).map_err(|_| ProtocolError::UnknownCommand {
            tag: raw_tag.to_string(),
        })?;

        let payload: Move =
            serde_json::from_value(envelope).map_err(|e| ProtocolError::Malformed {
                reason: format!("{tag}: {e}"),
            })?;

        debug!(%tag, ?payload, "Decoded client command");
        Ok(match tag {
            CommandTag::PreselectMove => ClientCommand::PreselectMove(payload),
            CommandTag::Move => ClientCommand::Move(payload),
        })
    }

    /// Returns the command's tag.
    pub fn tag(&self) -> CommandTag {
        match self {
            ClientCommand::PreselectMove(_) => CommandTag::PreselectMove,
            ClientCommand::Move(_) => CommandTag::Move,
        }
    }
}

/// Messages the server sends to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    tag = "cmd",
    rename_all = "SCREAMING_SNAKE_CASE",
    rename_all_fields = "camelCase"
)]
pub enum ServerMessage {
    /// First player seated; waiting for a second.
    WaitingForOpponent,
    /// The receiver has been seated with this colour.
    GameStarted {
        /// Colour assigned to the receiver.
        player_color: Color,
    },
    /// A vacated seat was reclaimed; play continues from the stored state.
    GameResumed {
        /// Colour of the player who reconnected.
        reconnected_player_color: Color,
        /// Colour to move next.
        next_turn: Color,
        /// Grid, one array per row.
        board: Vec<Vec<Cell>>,
    },
    /// A seated player's connection closed.
    PlayerDisconnected {
        /// Colour that left.
        color: Color,
    },
    /// Both seats are taken.
    ErrGameInProgress,
    /// The opponent is considering this move.
    OpponentPreselection(Move),
    /// The opponent played this move.
    OpponentMove(Move),
    /// Rejection details, only sent when error surfacing is enabled.
    Error {
        /// Human-readable reason.
        error: String,
    },
}

impl ServerMessage {
    /// Serializes the message as a JSON text frame.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
