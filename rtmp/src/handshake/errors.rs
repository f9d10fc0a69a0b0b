use std::io;
use thiserror::Error;

/// Errors that abort the RTMP handshake
#[derive(Debug, Error)]
pub enum HandshakeError {
    /// The peer's first byte (C0/S0) announced an RTMP version other than 3
    #[error("First byte of the handshake was {version}, but only version 3 is supported")]
    BadVersionId { version: u8 },

    /// The client side must send C0 and C1 before it can process any bytes from the server
    #[error("Bytes were processed before the outbound C0 and C1 packets were generated")]
    OutboundPacketsNotGenerated,

    /// The outbound C0 and C1 packets can only be generated once
    #[error("The outbound C0 and C1 packets were already generated")]
    OutboundPacketsAlreadyGenerated,

    /// The transport failed or closed before the handshake finished
    #[error("I/O error during handshake: {0}")]
    Io(#[from] io::Error),
}
