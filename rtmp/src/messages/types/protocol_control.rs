//! Protocol control messages (type ids 1, 2, 3, 5 and 6).  All of them are one or two fixed
//! width big endian fields.

use crate::messages::{MessageDeserializationError, PeerBandwidthLimitType, RtmpMessage};
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use std::io::Cursor;

const CHUNK_SIZE_MASK: u32 = 0x7FFF_FFFF;

pub fn serialize_u32(value: u32) -> Vec<u8> {
    value.to_be_bytes().to_vec()
}

pub fn deserialize_set_chunk_size(data: &[u8]) -> Result<RtmpMessage, MessageDeserializationError> {
    // The first bit is reserved and must be ignored
    let size = read_u32(data)? & CHUNK_SIZE_MASK;
    if size == 0 {
        return Err(MessageDeserializationError::InvalidMessageFormat);
    }

    Ok(RtmpMessage::SetChunkSize { size })
}

pub fn deserialize_abort(data: &[u8]) -> Result<RtmpMessage, MessageDeserializationError> {
    Ok(RtmpMessage::Abort {
        stream_id: read_u32(data)?,
    })
}

pub fn deserialize_acknowledgement(
    data: &[u8],
) -> Result<RtmpMessage, MessageDeserializationError> {
    Ok(RtmpMessage::Acknowledgement {
        sequence_number: read_u32(data)?,
    })
}

pub fn deserialize_window_acknowledgement(
    data: &[u8],
) -> Result<RtmpMessage, MessageDeserializationError> {
    Ok(RtmpMessage::WindowAcknowledgement {
        size: read_u32(data)?,
    })
}

pub fn serialize_set_peer_bandwidth(
    size: u32,
    limit_type: &PeerBandwidthLimitType,
) -> Result<Vec<u8>, std::io::Error> {
    let mut bytes = Vec::with_capacity(5);
    bytes.write_u32::<BigEndian>(size)?;
    bytes.write_u8(match limit_type {
        PeerBandwidthLimitType::Hard => 0,
        PeerBandwidthLimitType::Soft => 1,
        PeerBandwidthLimitType::Dynamic => 2,
    })?;

    Ok(bytes)
}

pub fn deserialize_set_peer_bandwidth(
    data: &[u8],
) -> Result<RtmpMessage, MessageDeserializationError> {
    let mut cursor = Cursor::new(data);
    let size = cursor.read_u32::<BigEndian>()?;
    let limit_type = match cursor.read_u8()? {
        0 => PeerBandwidthLimitType::Hard,
        1 => PeerBandwidthLimitType::Soft,
        2 => PeerBandwidthLimitType::Dynamic,
        limit_type => {
            return Err(MessageDeserializationError::UnknownBandwidthLimitType { limit_type })
        }
    };

    Ok(RtmpMessage::SetPeerBandwidth { size, limit_type })
}

fn read_u32(data: &[u8]) -> Result<u32, MessageDeserializationError> {
    let mut cursor = Cursor::new(data);
    Ok(cursor.read_u32::<BigEndian>()?)
}
