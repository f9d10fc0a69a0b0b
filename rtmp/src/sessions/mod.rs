//! Session abstractions that drive the RTMP command sequence.
//!
//! A session reacts to messages received from the peer with messages to send back and events
//! describing how far the `connect -> createStream -> publish|play` sequence has progressed.
//! Sessions never touch bytes: the connection owning them runs the chunk serializer and
//! deserializer and must send every outbound payload in the order it was returned.

mod client;
mod server;

pub use self::client::{
    ClientSession, ClientSessionConfig, ClientSessionError, ClientSessionEvent,
    ClientSessionResult, ClientState,
};
pub use self::server::{
    ServerSession, ServerSessionConfig, ServerSessionError, ServerSessionEvent,
    ServerSessionResult, ServerState,
};

use rtmp_amf0::Amf0Value;
use std::collections::HashMap;

/// What a client intends to do with the stream it creates
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum StreamMode {
    Publish,
    Play,
}

/// The fields of an `onStatus` info object or a `_result`/`_error` information object
#[derive(PartialEq, Debug, Clone)]
pub struct StatusInfo {
    pub level: String,
    pub code: String,
    pub description: String,
}

impl StatusInfo {
    pub fn new(level: &str, code: &str, description: &str) -> StatusInfo {
        StatusInfo {
            level: level.to_string(),
            code: code.to_string(),
            description: description.to_string(),
        }
    }

    /// Reads the status fields out of an AMF0 object, treating missing fields as empty
    pub fn from_amf0(value: &Amf0Value) -> StatusInfo {
        let field = |name: &str| {
            value
                .property(name)
                .and_then(Amf0Value::as_str)
                .unwrap_or_default()
                .to_string()
        };

        StatusInfo {
            level: field("level"),
            code: field("code"),
            description: field("description"),
        }
    }

    pub fn is_error(&self) -> bool {
        self.level == "error"
    }

    pub fn into_amf0(self) -> Amf0Value {
        let mut properties = HashMap::new();
        properties.insert("level".to_string(), Amf0Value::Utf8String(self.level));
        properties.insert("code".to_string(), Amf0Value::Utf8String(self.code));
        properties.insert(
            "description".to_string(),
            Amf0Value::Utf8String(self.description),
        );

        Amf0Value::Object(properties)
    }
}
