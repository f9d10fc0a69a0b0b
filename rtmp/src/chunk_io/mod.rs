//! The RTMP chunk stream: splitting messages into interleavable chunks and reassembling them
//! on the receiving side.
//!
//! Each direction of a connection needs its own serializer or deserializer instance, and every
//! byte sent or received must pass through it, since chunk headers are compressed against the
//! headers that came before them on the same chunk stream.

mod chunk_header;
mod deserializer;
mod errors;
mod serializer;

pub use self::deserializer::ChunkDeserializer;
pub use self::errors::{ChunkDeserializationError, ChunkSerializationError};
pub use self::serializer::ChunkSerializer;

use crate::messages::PeerBandwidthLimitType;

pub const DEFAULT_CHUNK_SIZE: u32 = 128;
pub const MAX_CHUNK_SIZE: u32 = 0x7FFF_FFFF;

/// Largest message the 24 bit length field of a chunk header can describe
pub const MAX_MESSAGE_LENGTH: usize = 0x00FF_FFFF;

/// Messages longer than this are rejected by default before any buffer is reserved for them
pub const DEFAULT_MAX_INBOUND_MESSAGE_LENGTH: usize = 8 * 1024 * 1024;

/// Connection wide values negotiated through protocol control messages received from the peer
#[derive(Debug, Clone, PartialEq)]
pub struct SessionParameters {
    /// Maximum payload bytes per chunk the peer sends
    pub inbound_chunk_size: u32,

    /// Bytes we may receive before an acknowledgement is owed to the peer
    pub peer_window_ack_size: Option<u32>,

    pub peer_bandwidth: Option<u32>,
    pub peer_bandwidth_limit_type: Option<PeerBandwidthLimitType>,

    /// Sequence number of the last acknowledgement the peer sent
    pub last_acknowledgement: Option<u32>,
}

impl SessionParameters {
    pub fn new() -> SessionParameters {
        SessionParameters {
            inbound_chunk_size: DEFAULT_CHUNK_SIZE,
            peer_window_ack_size: None,
            peer_bandwidth: None,
            peer_bandwidth_limit_type: None,
            last_acknowledgement: None,
        }
    }
}

impl Default for SessionParameters {
    fn default() -> Self {
        SessionParameters::new()
    }
}
