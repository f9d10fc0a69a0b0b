use super::Codec;
use std::io;
use thiserror::Error;

/// Errors raised while framing a single track's payloads.  They never affect other tracks or
/// the connection carrying them.
#[derive(Debug, Error)]
pub enum TrackError {
    /// The payload header names a codec that cannot be framed
    #[error("Unsupported {kind} codec identifier {id}")]
    UnsupportedCodec { kind: &'static str, id: String },

    /// The payload header names a different codec than the one the track was created with
    #[error("Payload for {received:?} received on a {expected:?} track")]
    CodecMismatch { expected: Codec, received: Codec },

    /// Media of a kind that had no track when reading started
    #[error("No track was set up for this payload")]
    UntrackedPayload,

    #[error("Payload of {length} bytes is too short for its {codec:?} header")]
    PayloadTooShort { codec: Codec, length: usize },

    /// A length prefixed unit claims more bytes than remain in the payload
    #[error("Unit length {length} exceeds the {remaining} bytes remaining in the payload")]
    UnitLengthOverflow { length: usize, remaining: usize },

    #[error("Malformed AV1 OBU: {reason}")]
    MalformedObu { reason: &'static str },

    #[error("Unknown {codec:?} packet type {packet_type}")]
    UnknownPacketType { codec: Codec, packet_type: u8 },

    /// The access unit cannot be carried by this codec's payload format
    #[error("Cannot encode access unit: {reason}")]
    InvalidAccessUnit { reason: &'static str },

    /// pts - dts does not fit in the signed 24 bit composition time field
    #[error("Composition time of {0} ms does not fit in 24 bits")]
    CompositionTimeOutOfRange(i64),

    #[error("{0}")]
    Io(#[from] io::Error),
}
