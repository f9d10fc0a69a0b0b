use crate::chunk_io::DEFAULT_MAX_INBOUND_MESSAGE_LENGTH;

/// The configuration options that govern how a RTMP server session should operate
#[derive(Clone, Debug)]
pub struct ServerSessionConfig {
    /// Reported as `fmsVer` in the connect result
    pub fms_version: String,

    /// Outbound chunk size announced right before the connect result
    pub chunk_size: u32,
    pub window_ack_size: u32,
    pub peer_bandwidth: u32,

    /// Inbound messages longer than this are rejected
    pub max_message_length: usize,
}

impl ServerSessionConfig {
    /// Creates a new server session config with overridable defaults
    pub fn new() -> ServerSessionConfig {
        ServerSessionConfig {
            fms_version: "FMS/3,0,1,123".to_string(),
            chunk_size: 4096,
            window_ack_size: 2_500_000,
            peer_bandwidth: 2_500_000,
            max_message_length: DEFAULT_MAX_INBOUND_MESSAGE_LENGTH,
        }
    }
}

impl Default for ServerSessionConfig {
    fn default() -> Self {
        ServerSessionConfig::new()
    }
}
