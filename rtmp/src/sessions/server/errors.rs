use super::state::ServerState;
use crate::messages::{MessageDeserializationError, MessageSerializationError};
use thiserror::Error;

/// Errors that fail the server's session setup
#[derive(Debug, Error)]
pub enum ServerSessionError {
    /// A request was made that the current state does not allow
    #[error("Cannot {action} while the session is in the {state:?} state")]
    SessionInInvalidState {
        action: &'static str,
        state: ServerState,
    },

    /// The client sent a setup command out of sequence
    #[error("Received {command} command while in the {state:?} state")]
    UnexpectedCommand { command: String, state: ServerState },

    #[error("The connect request did not specify an application name")]
    NoAppNameForConnectionRequest,

    /// `publish` or `play` did not carry a stream key
    #[error("The {command} request did not specify a stream key")]
    NoStreamKey { command: String },

    #[error("Failed to decode message from the client: {0}")]
    MessageDeserializationError(#[from] MessageDeserializationError),

    #[error("Failed to encode message for the client: {0}")]
    MessageSerializationError(#[from] MessageSerializationError),
}
