//! Client/server message protocol and command dispatch.

mod dispatch;
mod error;
mod messages;

pub use dispatch::{DispatchError, Dispatcher};
pub use error::ProtocolError;
pub use messages::{ClientCommand, CommandTag, Move, ServerMessage};
