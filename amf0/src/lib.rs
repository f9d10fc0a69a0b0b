//! Serialization and deserialization of values encoded with Adobe's Action Message Format 0
//! (AMF0), the encoding RTMP uses for command arguments and stream metadata.
//!
//! Values are always handled as an ordered sequence, since that is how RTMP command and data
//! messages carry them (`[command name, transaction id, command object, ...]`).
//!
//! # Examples
//! ```
//! use std::io::Cursor;
//! use std::collections::HashMap;
//! use rtmp_amf0::{Amf0Value, serialize, deserialize};
//!
//! let mut properties = HashMap::new();
//! properties.insert("app".to_string(), Amf0Value::Utf8String("live".to_string()));
//! properties.insert("objectEncoding".to_string(), Amf0Value::Number(0.0));
//!
//! let input = vec![
//!     Amf0Value::Utf8String("connect".to_string()),
//!     Amf0Value::Number(1.0),
//!     Amf0Value::Object(properties),
//! ];
//!
//! let bytes = serialize(&input).unwrap();
//! let results = deserialize(&mut Cursor::new(bytes)).unwrap();
//!
//! assert_eq!(input, results);
//! ```

mod deserialization;
mod errors;
mod serialization;

pub use crate::deserialization::deserialize;
pub use crate::errors::{Amf0DeserializationError, Amf0SerializationError};
pub use crate::serialization::serialize;

use std::collections::HashMap;

/// The AMF0 value kinds that RTMP peers exchange
#[derive(PartialEq, Debug, Clone)]
pub enum Amf0Value {
    Number(f64),
    Boolean(bool),
    Utf8String(String),
    Object(HashMap<String, Amf0Value>),

    /// An associative array.  Encoders use it (instead of an object) for `onMetaData`, so the
    /// marker is kept to allow metadata to be re-sent in the same shape it was received.
    EcmaArray(HashMap<String, Amf0Value>),
    StrictArray(Vec<Amf0Value>),
    Null,
    Undefined,
}

impl Amf0Value {
    pub fn get_number(self) -> Option<f64> {
        match self {
            Amf0Value::Number(value) => Some(value),
            _ => None,
        }
    }

    pub fn get_boolean(self) -> Option<bool> {
        match self {
            Amf0Value::Boolean(value) => Some(value),
            _ => None,
        }
    }

    pub fn get_string(self) -> Option<String> {
        match self {
            Amf0Value::Utf8String(value) => Some(value),
            _ => None,
        }
    }

    /// Returns the key/value pairs of either an object or an ECMA array
    pub fn get_object_properties(self) -> Option<HashMap<String, Amf0Value>> {
        match self {
            Amf0Value::Object(properties) => Some(properties),
            Amf0Value::EcmaArray(properties) => Some(properties),
            _ => None,
        }
    }

    /// Borrowing lookup of a single property of an object or ECMA array
    pub fn property(&self, name: &str) -> Option<&Amf0Value> {
        match self {
            Amf0Value::Object(properties) => properties.get(name),
            Amf0Value::EcmaArray(properties) => properties.get(name),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Amf0Value::Utf8String(value) => Some(value.as_str()),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match *self {
            Amf0Value::Number(value) => Some(value),
            _ => None,
        }
    }
}

mod markers {
    pub const NUMBER_MARKER: u8 = 0;
    pub const BOOLEAN_MARKER: u8 = 1;
    pub const STRING_MARKER: u8 = 2;
    pub const OBJECT_MARKER: u8 = 3;
    pub const NULL_MARKER: u8 = 5;
    pub const UNDEFINED_MARKER: u8 = 6;
    pub const ECMA_ARRAY_MARKER: u8 = 8;
    pub const OBJECT_END_MARKER: u8 = 9;
    pub const STRICT_ARRAY_MARKER: u8 = 10;
    pub const UTF_8_EMPTY_MARKER: u16 = 0;
}
