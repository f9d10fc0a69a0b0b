use crate::messages::{MessageDeserializationError, MessageSerializationError, RtmpMessage};
use rtmp_amf0::Amf0Value;
use std::io::Cursor;

pub fn serialize(values: &[Amf0Value]) -> Result<Vec<u8>, MessageSerializationError> {
    Ok(rtmp_amf0::serialize(values)?)
}

pub fn deserialize(data: &[u8]) -> Result<RtmpMessage, MessageDeserializationError> {
    let values = rtmp_amf0::deserialize(&mut Cursor::new(data))?;
    Ok(RtmpMessage::Amf0Data { values })
}
