use rtmp_amf0::{Amf0DeserializationError, Amf0SerializationError};
use std::io;
use thiserror::Error;

/// Errors raised while turning a message payload into a typed `RtmpMessage`
#[derive(Debug, Error)]
pub enum MessageDeserializationError {
    /// The payload did not have the layout its message type requires
    #[error("The message was not encoded in an expected format")]
    InvalidMessageFormat,

    /// A user control message carried an event type that is not known
    #[error("Unknown user control event type {event_type}")]
    UnknownUserControlEvent { event_type: u16 },

    /// A Set Peer Bandwidth message carried a limit type other than hard, soft or dynamic
    #[error("Unknown peer bandwidth limit type {limit_type}")]
    UnknownBandwidthLimitType { limit_type: u8 },

    #[error("The message did not contain valid AMF0 values: {0}")]
    Amf0DeserializationError(#[from] Amf0DeserializationError),

    #[error("The message payload ended early: {0}")]
    Io(#[from] io::Error),
}

/// Errors raised while encoding a typed `RtmpMessage` into a payload
#[derive(Debug, Error)]
pub enum MessageSerializationError {
    #[error("Failed to encode AMF0 values: {0}")]
    Amf0SerializationError(#[from] Amf0SerializationError),

    #[error("{0}")]
    Io(#[from] io::Error),
}
