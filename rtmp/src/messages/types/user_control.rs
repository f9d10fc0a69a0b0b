use crate::messages::{MessageDeserializationError, RtmpMessage, UserControlEventType};
use crate::time::RtmpTimestamp;
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use std::io::{self, Cursor};

pub fn serialize(
    event_type: &UserControlEventType,
    stream_id: Option<u32>,
    buffer_length: Option<u32>,
    timestamp: Option<RtmpTimestamp>,
) -> Result<Vec<u8>, io::Error> {
    let mut bytes = Vec::with_capacity(10);
    bytes.write_u16::<BigEndian>(event_id(event_type))?;

    match event_type {
        UserControlEventType::PingRequest | UserControlEventType::PingResponse => {
            bytes.write_u32::<BigEndian>(timestamp.unwrap_or_default().value)?;
        }

        UserControlEventType::SetBufferLength => {
            bytes.write_u32::<BigEndian>(stream_id.unwrap_or(0))?;
            bytes.write_u32::<BigEndian>(buffer_length.unwrap_or(0))?;
        }

        _ => bytes.write_u32::<BigEndian>(stream_id.unwrap_or(0))?,
    }

    Ok(bytes)
}

pub fn deserialize(data: &[u8]) -> Result<RtmpMessage, MessageDeserializationError> {
    let mut cursor = Cursor::new(data);
    let event_type = match cursor.read_u16::<BigEndian>()? {
        0 => UserControlEventType::StreamBegin,
        1 => UserControlEventType::StreamEof,
        2 => UserControlEventType::StreamDry,
        3 => UserControlEventType::SetBufferLength,
        4 => UserControlEventType::StreamIsRecorded,
        6 => UserControlEventType::PingRequest,
        7 => UserControlEventType::PingResponse,
        31 => UserControlEventType::BufferEmpty,
        32 => UserControlEventType::BufferReady,
        event_type => {
            return Err(MessageDeserializationError::UnknownUserControlEvent { event_type })
        }
    };

    let mut stream_id = None;
    let mut buffer_length = None;
    let mut timestamp = None;
    match event_type {
        UserControlEventType::PingRequest | UserControlEventType::PingResponse => {
            timestamp = Some(RtmpTimestamp::new(cursor.read_u32::<BigEndian>()?));
        }

        UserControlEventType::SetBufferLength => {
            stream_id = Some(cursor.read_u32::<BigEndian>()?);
            buffer_length = Some(cursor.read_u32::<BigEndian>()?);
        }

        _ => stream_id = Some(cursor.read_u32::<BigEndian>()?),
    }

    Ok(RtmpMessage::UserControl {
        event_type,
        stream_id,
        buffer_length,
        timestamp,
    })
}

fn event_id(event_type: &UserControlEventType) -> u16 {
    match event_type {
        UserControlEventType::StreamBegin => 0,
        UserControlEventType::StreamEof => 1,
        UserControlEventType::StreamDry => 2,
        UserControlEventType::SetBufferLength => 3,
        UserControlEventType::StreamIsRecorded => 4,
        UserControlEventType::PingRequest => 6,
        UserControlEventType::PingResponse => 7,
        UserControlEventType::BufferEmpty => 31,
        UserControlEventType::BufferReady => 32,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stream_begin_carries_stream_id() {
        let bytes = serialize(&UserControlEventType::StreamBegin, Some(1), None, None).unwrap();
        assert_eq!(bytes, vec![0, 0, 0, 0, 0, 1]);
    }

    #[test]
    fn set_buffer_length_carries_stream_id_and_length() {
        let bytes =
            serialize(&UserControlEventType::SetBufferLength, Some(1), Some(3000), None).unwrap();
        assert_eq!(bytes, vec![0, 3, 0, 0, 0, 1, 0, 0, 0x0B, 0xB8]);

        match deserialize(&bytes).unwrap() {
            RtmpMessage::UserControl {
                event_type: UserControlEventType::SetBufferLength,
                stream_id: Some(1),
                buffer_length: Some(3000),
                timestamp: None,
            } => (),
            x => panic!("Unexpected message {:?}", x),
        }
    }

    #[test]
    fn ping_request_carries_timestamp() {
        let bytes = [0, 6, 0, 0, 0x01, 0x00];
        match deserialize(&bytes).unwrap() {
            RtmpMessage::UserControl {
                event_type: UserControlEventType::PingRequest,
                stream_id: None,
                buffer_length: None,
                timestamp: Some(timestamp),
            } => assert_eq!(timestamp, 256),
            x => panic!("Unexpected message {:?}", x),
        }
    }

    #[test]
    fn unknown_event_type_is_rejected() {
        match deserialize(&[0, 9, 0, 0, 0, 0]) {
            Err(MessageDeserializationError::UnknownUserControlEvent { event_type: 9 }) => (),
            x => panic!("Expected unknown event error, got {:?}", x),
        }
    }
}
