use crate::chunk_io::DEFAULT_MAX_INBOUND_MESSAGE_LENGTH;

/// Configuration options that govern how a RTMP client session should operate
#[derive(Clone, Debug)]
pub struct ClientSessionConfig {
    /// Sent as `flashVer` in the connect request
    pub flash_version: String,

    /// Outbound chunk size requested once the connection is accepted
    pub chunk_size: u32,
    pub window_ack_size: u32,

    /// Sent with a Set Buffer Length user control message when requesting playback
    pub playback_buffer_length_ms: u32,

    /// Inbound messages longer than this are rejected
    pub max_message_length: usize,
}

impl ClientSessionConfig {
    /// Creates a new configuration object with default values
    pub fn new() -> ClientSessionConfig {
        ClientSessionConfig {
            flash_version: "LNX 9,0,124,2".to_string(),
            chunk_size: 4096,
            window_ack_size: 2_500_000,
            playback_buffer_length_ms: 3_000,
            max_message_length: DEFAULT_MAX_INBOUND_MESSAGE_LENGTH,
        }
    }
}

impl Default for ClientSessionConfig {
    fn default() -> Self {
        ClientSessionConfig::new()
    }
}
