//! Encoding of `Amf0Value`s into bytes
//! (<http://wwwimages.adobe.com/content/dam/Adobe/en/devnet/amf/pdf/amf0-file-format-specification.pdf>)

use crate::errors::Amf0SerializationError;
use crate::markers;
use crate::Amf0Value;
use byteorder::{BigEndian, WriteBytesExt};
use std::collections::HashMap;

/// Serializes a sequence of values into AMF0 encoded bytes
pub fn serialize(values: &[Amf0Value]) -> Result<Vec<u8>, Amf0SerializationError> {
    let mut bytes = Vec::new();
    for value in values {
        write_value(value, &mut bytes)?;
    }

    Ok(bytes)
}

fn write_value(value: &Amf0Value, bytes: &mut Vec<u8>) -> Result<(), Amf0SerializationError> {
    match value {
        Amf0Value::Number(number) => {
            bytes.push(markers::NUMBER_MARKER);
            bytes.write_f64::<BigEndian>(*number)?;
        }

        Amf0Value::Boolean(boolean) => {
            bytes.push(markers::BOOLEAN_MARKER);
            bytes.push(*boolean as u8);
        }

        Amf0Value::Utf8String(string) => {
            bytes.push(markers::STRING_MARKER);
            write_utf8(string, bytes)?;
        }

        Amf0Value::Object(properties) => {
            bytes.push(markers::OBJECT_MARKER);
            write_properties(properties, bytes)?;
        }

        Amf0Value::EcmaArray(properties) => {
            bytes.push(markers::ECMA_ARRAY_MARKER);
            bytes.write_u32::<BigEndian>(properties.len() as u32)?;
            write_properties(properties, bytes)?;
        }

        Amf0Value::StrictArray(values) => {
            bytes.push(markers::STRICT_ARRAY_MARKER);
            bytes.write_u32::<BigEndian>(values.len() as u32)?;
            for value in values {
                write_value(value, bytes)?;
            }
        }

        Amf0Value::Null => bytes.push(markers::NULL_MARKER),
        Amf0Value::Undefined => bytes.push(markers::UNDEFINED_MARKER),
    }

    Ok(())
}

fn write_utf8(value: &str, bytes: &mut Vec<u8>) -> Result<(), Amf0SerializationError> {
    if value.len() > u16::MAX as usize {
        return Err(Amf0SerializationError::NormalStringTooLong {
            length: value.len(),
        });
    }

    bytes.write_u16::<BigEndian>(value.len() as u16)?;
    bytes.extend(value.as_bytes());
    Ok(())
}

fn write_properties(
    properties: &HashMap<String, Amf0Value>,
    bytes: &mut Vec<u8>,
) -> Result<(), Amf0SerializationError> {
    for (name, value) in properties {
        write_utf8(name, bytes)?;
        write_value(value, bytes)?;
    }

    bytes.write_u16::<BigEndian>(markers::UTF_8_EMPTY_MARKER)?;
    bytes.push(markers::OBJECT_END_MARKER);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::serialize;
    use crate::errors::Amf0SerializationError;
    use crate::markers;
    use crate::{deserialize, Amf0Value};
    use byteorder::{BigEndian, WriteBytesExt};
    use std::collections::HashMap;
    use std::io::Cursor;

    #[test]
    fn can_serialize_number_and_string() {
        let input = vec![
            Amf0Value::Utf8String("play".to_string()),
            Amf0Value::Number(3.0),
        ];
        let result = serialize(&input).unwrap();

        let mut expected = vec![];
        expected.write_u8(markers::STRING_MARKER).unwrap();
        expected.write_u16::<BigEndian>(4).unwrap();
        expected.extend(b"play");
        expected.write_u8(markers::NUMBER_MARKER).unwrap();
        expected.write_f64::<BigEndian>(3.0).unwrap();

        assert_eq!(result, expected);
    }

    #[test]
    fn can_serialize_null_undefined_and_booleans() {
        let input = vec![
            Amf0Value::Null,
            Amf0Value::Undefined,
            Amf0Value::Boolean(true),
            Amf0Value::Boolean(false),
        ];
        let result = serialize(&input).unwrap();

        let expected = vec![
            markers::NULL_MARKER,
            markers::UNDEFINED_MARKER,
            markers::BOOLEAN_MARKER,
            1,
            markers::BOOLEAN_MARKER,
            0,
        ];
        assert_eq!(result, expected);
    }

    #[test]
    fn can_serialize_single_property_object() {
        let mut properties = HashMap::new();
        properties.insert("code".to_string(), Amf0Value::Null);
        let result = serialize(&[Amf0Value::Object(properties)]).unwrap();

        let mut expected = vec![];
        expected.write_u8(markers::OBJECT_MARKER).unwrap();
        expected.write_u16::<BigEndian>(4).unwrap();
        expected.extend(b"code");
        expected.write_u8(markers::NULL_MARKER).unwrap();
        expected.write_u16::<BigEndian>(markers::UTF_8_EMPTY_MARKER).unwrap();
        expected.write_u8(markers::OBJECT_END_MARKER).unwrap();

        assert_eq!(result, expected);
    }

    #[test]
    fn ecma_array_keeps_its_marker_through_a_round_trip() {
        let mut properties = HashMap::new();
        properties.insert("width".to_string(), Amf0Value::Number(1280.0));
        properties.insert("height".to_string(), Amf0Value::Number(720.0));
        properties.insert("stereo".to_string(), Amf0Value::Boolean(true));

        let input = vec![
            Amf0Value::Utf8String("onMetaData".to_string()),
            Amf0Value::EcmaArray(properties),
            Amf0Value::StrictArray(vec![Amf0Value::Number(1.0)]),
        ];

        let bytes = serialize(&input).unwrap();
        assert_eq!(bytes[13], markers::ECMA_ARRAY_MARKER);

        let result = deserialize(&mut Cursor::new(bytes)).unwrap();
        assert_eq!(result, input);
    }

    #[test]
    fn string_longer_than_u16_is_rejected() {
        let long = "a".repeat(u16::MAX as usize + 1);
        match serialize(&[Amf0Value::Utf8String(long)]) {
            Err(Amf0SerializationError::NormalStringTooLong { length }) => {
                assert_eq!(length, u16::MAX as usize + 1)
            }
            x => panic!("Expected NormalStringTooLong, got {:?}", x),
        }
    }
}
