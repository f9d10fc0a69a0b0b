use crate::chunk_io::{ChunkDeserializationError, ChunkSerializationError};
use crate::handshake::HandshakeError;
use crate::media::{MediaKind, TrackError};
use crate::messages::{MessageDeserializationError, MessageSerializationError};
use crate::sessions::{ClientSessionError, ServerSessionError};
use std::io;
use thiserror::Error;

/// Violations of the RTMP protocol by either peer, or by the caller's use of the connection
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("{0}")]
    ChunkDeserialization(#[from] ChunkDeserializationError),

    #[error("{0}")]
    ChunkSerialization(#[from] ChunkSerializationError),

    #[error("{0}")]
    MessageDeserialization(#[from] MessageDeserializationError),

    #[error("{0}")]
    MessageSerialization(#[from] MessageSerializationError),

    #[error("Session setup failed: {0}")]
    ClientSession(#[from] ClientSessionError),

    #[error("Session setup failed: {0}")]
    ServerSession(#[from] ServerSessionError),

    #[error("Invalid RTMP url '{url}': {reason}")]
    InvalidUrl { url: String, reason: &'static str },

    /// No audio or video track could be found in the first messages of the stream
    #[error("No supported tracks found after {messages} messages")]
    NoTracks { messages: usize },

    /// An access unit was written for a track the writer never announced
    #[error("No {kind} track was announced for this stream")]
    TrackNotAnnounced { kind: MediaKind },
}

/// Every error a connection, reader or writer can return
#[derive(Debug, Error)]
pub enum RtmpError {
    #[error("Handshake failed: {0}")]
    Handshake(#[from] HandshakeError),

    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// A payload of one track could not be framed.  The connection and other tracks are
    /// unaffected.
    #[error("Error on {kind} track: {source}")]
    Track {
        kind: MediaKind,
        #[source]
        source: TrackError,
    },

    #[error("Transport error: {0}")]
    Transport(#[from] io::Error),
}

impl RtmpError {
    /// Fatal errors leave the connection unusable and it should be closed
    pub fn is_fatal(&self) -> bool {
        match self {
            RtmpError::Track { .. } => false,
            _ => true,
        }
    }
}

macro_rules! protocol_error_from {
    ($($error:ty),*) => {
        $(
            impl From<$error> for RtmpError {
                fn from(error: $error) -> Self {
                    RtmpError::Protocol(ProtocolError::from(error))
                }
            }
        )*
    };
}

protocol_error_from!(
    ChunkDeserializationError,
    ChunkSerializationError,
    MessageDeserializationError,
    MessageSerializationError,
    ClientSessionError,
    ServerSessionError
);
