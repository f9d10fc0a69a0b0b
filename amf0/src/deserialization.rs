//! Decoding of AMF0 encoded bytes into `Amf0Value`s
//! (<http://wwwimages.adobe.com/content/dam/Adobe/en/devnet/amf/pdf/amf0-file-format-specification.pdf>)

use crate::errors::Amf0DeserializationError;
use crate::markers;
use crate::Amf0Value;
use byteorder::{BigEndian, ReadBytesExt};
use std::collections::HashMap;
use std::io::Read;

/// Reads AMF0 values from the byte source until it is exhausted
pub fn deserialize<R: Read>(bytes: &mut R) -> Result<Vec<Amf0Value>, Amf0DeserializationError> {
    let mut results = Vec::new();
    while let Some(value) = read_next_value(bytes)? {
        results.push(value);
    }

    Ok(results)
}

fn read_next_value<R: Read>(bytes: &mut R) -> Result<Option<Amf0Value>, Amf0DeserializationError> {
    let mut marker = [0_u8; 1];
    if bytes.read(&mut marker)? == 0 {
        return Ok(None);
    }

    let value = match marker[0] {
        markers::NUMBER_MARKER => Amf0Value::Number(bytes.read_f64::<BigEndian>()?),
        markers::BOOLEAN_MARKER => Amf0Value::Boolean(bytes.read_u8()? != 0),
        markers::STRING_MARKER => Amf0Value::Utf8String(read_utf8(bytes)?),
        markers::OBJECT_MARKER => Amf0Value::Object(read_properties(bytes)?),
        markers::NULL_MARKER => Amf0Value::Null,
        markers::UNDEFINED_MARKER => Amf0Value::Undefined,
        markers::ECMA_ARRAY_MARKER => {
            // The count is advisory only.  Encoders in the wild still terminate the array with
            // the object end sequence, so it is read exactly like an object.
            let _count = bytes.read_u32::<BigEndian>()?;
            Amf0Value::EcmaArray(read_properties(bytes)?)
        }
        markers::STRICT_ARRAY_MARKER => read_strict_array(bytes)?,
        marker => return Err(Amf0DeserializationError::UnknownMarker { marker }),
    };

    Ok(Some(value))
}

fn read_utf8<R: Read>(bytes: &mut R) -> Result<String, Amf0DeserializationError> {
    let length = bytes.read_u16::<BigEndian>()?;
    let mut buffer = vec![0_u8; length as usize];
    bytes.read_exact(&mut buffer)?;

    Ok(String::from_utf8(buffer)?)
}

fn read_properties<R: Read>(
    bytes: &mut R,
) -> Result<HashMap<String, Amf0Value>, Amf0DeserializationError> {
    let mut properties = HashMap::new();

    loop {
        let label = read_utf8(bytes)?;
        if label.is_empty() {
            if bytes.read_u8()? != markers::OBJECT_END_MARKER {
                return Err(Amf0DeserializationError::UnexpectedEmptyObjectPropertyName);
            }

            return Ok(properties);
        }

        match read_next_value(bytes)? {
            Some(value) => properties.insert(label, value),
            None => return Err(Amf0DeserializationError::UnexpectedEof),
        };
    }
}

fn read_strict_array<R: Read>(bytes: &mut R) -> Result<Amf0Value, Amf0DeserializationError> {
    let count = bytes.read_u32::<BigEndian>()?;
    let mut values = Vec::new();

    for _ in 0..count {
        match read_next_value(bytes)? {
            Some(value) => values.push(value),
            None => return Err(Amf0DeserializationError::UnexpectedEof),
        }
    }

    Ok(Amf0Value::StrictArray(values))
}
