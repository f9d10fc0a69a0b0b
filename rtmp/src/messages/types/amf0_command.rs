use crate::messages::{MessageDeserializationError, MessageSerializationError, RtmpMessage};
use rtmp_amf0::Amf0Value;
use std::io::Cursor;

/// Commands are the sequence `[name, transaction id, command object, arguments...]`
pub fn serialize(
    command_name: &str,
    transaction_id: f64,
    command_object: &Amf0Value,
    additional_arguments: &[Amf0Value],
) -> Result<Vec<u8>, MessageSerializationError> {
    let mut values = Vec::with_capacity(3 + additional_arguments.len());
    values.push(Amf0Value::Utf8String(command_name.to_string()));
    values.push(Amf0Value::Number(transaction_id));
    values.push(command_object.clone());
    values.extend_from_slice(additional_arguments);

    Ok(rtmp_amf0::serialize(&values)?)
}

pub fn deserialize(data: &[u8]) -> Result<RtmpMessage, MessageDeserializationError> {
    let mut values = rtmp_amf0::deserialize(&mut Cursor::new(data))?.into_iter();

    let command_name = values
        .next()
        .and_then(Amf0Value::get_string)
        .ok_or(MessageDeserializationError::InvalidMessageFormat)?;

    // Some encoders leave off the transaction id and command object on notifications
    let transaction_id = match values.next() {
        None => 0.0,
        Some(Amf0Value::Number(value)) => value,
        Some(_) => return Err(MessageDeserializationError::InvalidMessageFormat),
    };

    let command_object = values.next().unwrap_or(Amf0Value::Null);

    Ok(RtmpMessage::Amf0Command {
        command_name,
        transaction_id,
        command_object,
        additional_arguments: values.collect(),
    })
}
