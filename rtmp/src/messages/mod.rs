/*!
RTMP message types and their conversion to and from raw message payloads.

A `MessagePayload` is a fully assembled message as it travels through the chunk layer: the
header fields plus the undecoded bytes.  `RtmpMessage` is the typed view of a payload.
*/

mod errors;
mod message_payload;
mod types;

pub use self::errors::{MessageDeserializationError, MessageSerializationError};
pub use self::message_payload::MessagePayload;

use crate::time::RtmpTimestamp;
use bytes::Bytes;
use rtmp_amf0::Amf0Value;

pub const SET_CHUNK_SIZE_TYPE_ID: u8 = 1;
pub const ABORT_TYPE_ID: u8 = 2;
pub const ACKNOWLEDGEMENT_TYPE_ID: u8 = 3;
pub const USER_CONTROL_TYPE_ID: u8 = 4;
pub const WINDOW_ACKNOWLEDGEMENT_TYPE_ID: u8 = 5;
pub const SET_PEER_BANDWIDTH_TYPE_ID: u8 = 6;
pub const AUDIO_TYPE_ID: u8 = 8;
pub const VIDEO_TYPE_ID: u8 = 9;
pub const AMF0_DATA_TYPE_ID: u8 = 18;
pub const AMF0_COMMAND_TYPE_ID: u8 = 20;

pub const CONTROL_CHUNK_STREAM_ID: u32 = 2;
pub const COMMAND_CHUNK_STREAM_ID: u32 = 3;
pub const AUDIO_CHUNK_STREAM_ID: u32 = 4;
pub const DATA_CHUNK_STREAM_ID: u32 = 5;
pub const VIDEO_CHUNK_STREAM_ID: u32 = 6;

/// The chunk stream outbound messages of the given type are sent on.  Keeping each kind of
/// message on its own chunk stream lets steady runs of them use compressed headers.
pub fn chunk_stream_id_for_type(type_id: u8) -> u32 {
    match type_id {
        SET_CHUNK_SIZE_TYPE_ID..=SET_PEER_BANDWIDTH_TYPE_ID => CONTROL_CHUNK_STREAM_ID,
        AUDIO_TYPE_ID => AUDIO_CHUNK_STREAM_ID,
        VIDEO_TYPE_ID => VIDEO_CHUNK_STREAM_ID,
        AMF0_DATA_TYPE_ID => DATA_CHUNK_STREAM_ID,
        _ => COMMAND_CHUNK_STREAM_ID,
    }
}

/// Protocol control messages are consumed by the chunk layer and never surface to sessions
pub fn is_protocol_control_type(type_id: u8) -> bool {
    match type_id {
        SET_CHUNK_SIZE_TYPE_ID
        | ABORT_TYPE_ID
        | ACKNOWLEDGEMENT_TYPE_ID
        | WINDOW_ACKNOWLEDGEMENT_TYPE_ID
        | SET_PEER_BANDWIDTH_TYPE_ID => true,
        _ => false,
    }
}

/// How a peer should treat a Set Peer Bandwidth request
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum PeerBandwidthLimitType {
    /// Limit output bandwidth to the window size
    Hard,

    /// Limit output to the window size or the limit already in effect, whichever is smaller
    Soft,

    /// Treated as hard if the previous limit was hard, otherwise ignored
    Dynamic,
}

/// Events carried by user control messages
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum UserControlEventType {
    StreamBegin,
    StreamEof,
    StreamDry,

    /// The client's playback buffer length in milliseconds
    SetBufferLength,
    StreamIsRecorded,
    PingRequest,
    PingResponse,
    BufferEmpty,
    BufferReady,
}

/// Typed view of an RTMP message
#[derive(PartialEq, Debug, Clone)]
pub enum RtmpMessage {
    /// A message whose type id is not otherwise known
    Unknown { type_id: u8, data: Bytes },

    /// Discard the partially received message on the given chunk stream
    Abort { stream_id: u32 },

    /// Total number of bytes received so far
    Acknowledgement { sequence_number: u32 },

    Amf0Command {
        command_name: String,
        transaction_id: f64,
        command_object: Amf0Value,
        additional_arguments: Vec<Amf0Value>,
    },

    Amf0Data { values: Vec<Amf0Value> },
    AudioData { data: Bytes },

    /// The sender's chunks will carry up to `size` payload bytes from now on
    SetChunkSize { size: u32 },

    SetPeerBandwidth {
        size: u32,
        limit_type: PeerBandwidthLimitType,
    },

    UserControl {
        event_type: UserControlEventType,
        stream_id: Option<u32>,
        buffer_length: Option<u32>,
        timestamp: Option<RtmpTimestamp>,
    },

    VideoData { data: Bytes },

    /// Number of bytes the peer may receive before it must send an acknowledgement
    WindowAcknowledgement { size: u32 },
}

impl RtmpMessage {
    pub fn into_message_payload(
        self,
        timestamp: RtmpTimestamp,
        message_stream_id: u32,
    ) -> Result<MessagePayload, MessageSerializationError> {
        MessagePayload::from_rtmp_message(self, timestamp, message_stream_id)
    }

    pub fn get_message_type_id(&self) -> u8 {
        match self {
            RtmpMessage::Unknown { type_id, .. } => *type_id,
            RtmpMessage::Abort { .. } => ABORT_TYPE_ID,
            RtmpMessage::Acknowledgement { .. } => ACKNOWLEDGEMENT_TYPE_ID,
            RtmpMessage::Amf0Command { .. } => AMF0_COMMAND_TYPE_ID,
            RtmpMessage::Amf0Data { .. } => AMF0_DATA_TYPE_ID,
            RtmpMessage::AudioData { .. } => AUDIO_TYPE_ID,
            RtmpMessage::SetChunkSize { .. } => SET_CHUNK_SIZE_TYPE_ID,
            RtmpMessage::SetPeerBandwidth { .. } => SET_PEER_BANDWIDTH_TYPE_ID,
            RtmpMessage::UserControl { .. } => USER_CONTROL_TYPE_ID,
            RtmpMessage::VideoData { .. } => VIDEO_TYPE_ID,
            RtmpMessage::WindowAcknowledgement { .. } => WINDOW_ACKNOWLEDGEMENT_TYPE_ID,
        }
    }
}
