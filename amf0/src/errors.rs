use std::{io, string};
use thiserror::Error;

/// Errors that can occur while decoding AMF0 values
#[derive(Debug, Error)]
pub enum Amf0DeserializationError {
    /// A value started with a type marker this crate does not support
    #[error("Encountered unknown AMF0 type marker {marker}")]
    UnknownMarker { marker: u8 },

    /// An object property had an empty name but was not followed by the object end marker
    #[error("Unexpected empty object property name")]
    UnexpectedEmptyObjectPropertyName,

    /// The input ended in the middle of a value
    #[error("Hit end of the byte buffer but was expecting more data")]
    UnexpectedEof,

    #[error("{0}")]
    Io(#[from] io::Error),

    #[error("A string value was not valid UTF-8: {0}")]
    FromUtf8Error(#[from] string::FromUtf8Error),
}

/// Errors that can occur while encoding AMF0 values
#[derive(Debug, Error)]
pub enum Amf0SerializationError {
    /// Normal AMF0 strings (and property names) carry a 16 bit length
    #[error("String length of {length} is greater than 65,535")]
    NormalStringTooLong { length: usize },

    #[error("{0}")]
    Io(#[from] io::Error),
}
