//! Protocol-level failures: the text frame could not be turned into a command.

/// A client frame that could not be decoded into a known command.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display)]
pub enum ProtocolError {
    /// Not JSON, or the payload does not match the command's fields.
    #[display("Malformed message: {reason}")]
    Malformed {
        /// Decoder error text.
        reason: String,
    },
    /// The envelope has no string `cmd` field.
    #[display("Message has no command")]
    MissingCommand,
    /// The `cmd` tag names no known command.
    #[display("Unknown command: {tag}")]
    UnknownCommand {
        /// Tag as received.
        tag: String,
    },
    /// Binary frames are not part of the protocol.
    #[display("Binary frames are not supported")]
    BinaryFrame,
}

impl std::error::Error for ProtocolError {}
