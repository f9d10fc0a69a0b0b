use super::state::ClientState;
use crate::messages::{MessageDeserializationError, MessageSerializationError};
use thiserror::Error;

/// Errors that fail the client's session setup
#[derive(Debug, Error)]
pub enum ClientSessionError {
    /// A request was made that the current state does not allow
    #[error("Cannot {action} while the session is in the {state:?} state")]
    SessionInInvalidState {
        action: &'static str,
        state: ClientState,
    },

    /// A `_result` or `_error` arrived that does not answer the outstanding request
    #[error("Received {command} with transaction id {received} but expected {expected:?}")]
    UnexpectedTransaction {
        command: String,
        expected: Option<f64>,
        received: f64,
    },

    /// The server answered a request with `_error`
    #[error("Server rejected {command}: {description}")]
    CommandRejected { command: String, description: String },

    /// The server sent an `onStatus` with level `error`
    #[error("Server reported {code}: {description}")]
    StatusError { code: String, description: String },

    /// An `onStatus` arrived whose code does not follow from the current state
    #[error("Received status {code} while the session is in the {state:?} state")]
    UnexpectedStatus { code: String, state: ClientState },

    /// The `createStream` result did not carry a numeric stream id
    #[error("The server sent a create stream success result without a stream id")]
    CreateStreamResponseHadNoStreamNumber,

    #[error("Failed to decode message from the server: {0}")]
    MessageDeserializationError(#[from] MessageDeserializationError),

    #[error("Failed to encode message for the server: {0}")]
    MessageSerializationError(#[from] MessageSerializationError),
}
