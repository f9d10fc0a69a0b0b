use super::types::{amf0_command, amf0_data, protocol_control, user_control};
use super::*;

/// A fully assembled RTMP message with its payload still encoded
#[derive(PartialEq, Debug, Clone)]
pub struct MessagePayload {
    pub chunk_stream_id: u32,
    pub timestamp: RtmpTimestamp,
    pub type_id: u8,
    pub message_stream_id: u32,
    pub data: Bytes,
}

impl MessagePayload {
    pub fn to_rtmp_message(&self) -> Result<RtmpMessage, MessageDeserializationError> {
        let data = &self.data[..];
        match self.type_id {
            SET_CHUNK_SIZE_TYPE_ID => protocol_control::deserialize_set_chunk_size(data),
            ABORT_TYPE_ID => protocol_control::deserialize_abort(data),
            ACKNOWLEDGEMENT_TYPE_ID => protocol_control::deserialize_acknowledgement(data),
            USER_CONTROL_TYPE_ID => user_control::deserialize(data),
            WINDOW_ACKNOWLEDGEMENT_TYPE_ID => {
                protocol_control::deserialize_window_acknowledgement(data)
            }
            SET_PEER_BANDWIDTH_TYPE_ID => protocol_control::deserialize_set_peer_bandwidth(data),
            AUDIO_TYPE_ID => Ok(RtmpMessage::AudioData {
                data: self.data.clone(),
            }),
            VIDEO_TYPE_ID => Ok(RtmpMessage::VideoData {
                data: self.data.clone(),
            }),
            AMF0_DATA_TYPE_ID => amf0_data::deserialize(data),
            AMF0_COMMAND_TYPE_ID => amf0_command::deserialize(data),
            type_id => Ok(RtmpMessage::Unknown {
                type_id,
                data: self.data.clone(),
            }),
        }
    }

    pub fn from_rtmp_message(
        message: RtmpMessage,
        timestamp: RtmpTimestamp,
        message_stream_id: u32,
    ) -> Result<MessagePayload, MessageSerializationError> {
        let type_id = message.get_message_type_id();
        let data = match message {
            RtmpMessage::Unknown { data, .. } => data,
            RtmpMessage::AudioData { data } => data,
            RtmpMessage::VideoData { data } => data,

            RtmpMessage::Abort { stream_id } => protocol_control::serialize_u32(stream_id).into(),
            RtmpMessage::Acknowledgement { sequence_number } => {
                protocol_control::serialize_u32(sequence_number).into()
            }
            RtmpMessage::SetChunkSize { size } => protocol_control::serialize_u32(size).into(),
            RtmpMessage::WindowAcknowledgement { size } => {
                protocol_control::serialize_u32(size).into()
            }
            RtmpMessage::SetPeerBandwidth { size, limit_type } => {
                protocol_control::serialize_set_peer_bandwidth(size, &limit_type)?.into()
            }

            RtmpMessage::UserControl {
                event_type,
                stream_id,
                buffer_length,
                timestamp,
            } => user_control::serialize(&event_type, stream_id, buffer_length, timestamp)?.into(),

            RtmpMessage::Amf0Command {
                command_name,
                transaction_id,
                command_object,
                additional_arguments,
            } => amf0_command::serialize(
                &command_name,
                transaction_id,
                &command_object,
                &additional_arguments,
            )?
            .into(),

            RtmpMessage::Amf0Data { values } => amf0_data::serialize(&values)?.into(),
        };

        Ok(MessagePayload {
            chunk_stream_id: chunk_stream_id_for_type(type_id),
            timestamp,
            type_id,
            message_stream_id,
            data,
        })
    }
}
