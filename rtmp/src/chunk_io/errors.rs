use crate::messages::{MessageDeserializationError, MessageSerializationError};
use std::io;
use thiserror::Error;

/// Errors raised while turning received bytes into messages
#[derive(Debug, Error)]
pub enum ChunkDeserializationError {
    /// Compressed headers take their omitted fields from the previous chunk on the same chunk
    /// stream, so they cannot be the first chunk seen on it
    #[error(
        "Received chunk with non-zero chunk type on csid {csid} prior to receiving a type 0 chunk"
    )]
    NoPreviousChunkOnStream { csid: u32 },

    /// A chunk with a new message header arrived while a message on the same chunk stream was
    /// still incomplete
    #[error("Received a new message header on csid {csid} before the previous message completed")]
    InterruptedMessage { csid: u32 },

    #[error("Message on csid {csid} declared {length} bytes, above the limit of {max_length}")]
    MessageTooLong {
        csid: u32,
        length: u32,
        max_length: usize,
    },

    /// A protocol control message could not be decoded
    #[error("Invalid protocol control message: {0}")]
    InvalidControlMessage(#[from] MessageDeserializationError),

    #[error("{0}")]
    Io(#[from] io::Error),
}

/// Errors raised while splitting messages into chunks
#[derive(Debug, Error)]
pub enum ChunkSerializationError {
    /// A message cannot be longer than its 24 bit length field allows
    #[error("The message has a length of {size} bytes, above the allowed 16777215 bytes")]
    MessageTooLong { size: usize },

    #[error("Chunk stream id {csid} is outside the allowed range of 2 to 65599")]
    InvalidChunkStreamId { csid: u32 },

    #[error("Invalid max chunk size of {chunk_size}, it must be between 1 and 2147483647")]
    InvalidMaxChunkSize { chunk_size: u32 },

    #[error("Failed to create SetChunkSize message: {0}")]
    SetChunkSizeMessageCreationFailure(#[from] MessageSerializationError),

    #[error("{0}")]
    Io(#[from] io::Error),
}
