//! The RTMP handshake that precedes all chunked traffic.
//!
//! This implements the simple (unsigned) handshake from the RTMP specification.  Each side
//! sends a version byte (P0) followed by a 1536 byte packet (P1) containing a time, four zero
//! bytes and 1528 random bytes, then echoes the peer's P1 back as its P2.  The echoed packet is
//! only length checked, no digest is computed or verified.
//!
//! `Handshake` itself performs no I/O.  Bytes received from the peer are passed to
//! `process_bytes()` and any returned response bytes must be sent to the peer in order.
//! `Handshake::perform()` drives the exchange over a blocking `Read + Write` stream.

mod errors;

pub use self::errors::HandshakeError;

use byteorder::{BigEndian, WriteBytesExt};
use rand::Rng;
use std::io::{self, Read, Write};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::debug;

pub const RTMP_VERSION: u8 = 3;
const RANDOM_DATA_SIZE: usize = 1528;
const PACKET_SIZE: usize = 8 + RANDOM_DATA_SIZE;
const READ_BUFFER_SIZE: usize = 4096;

/// Which side of the connection the handshake is being performed for
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum PeerType {
    /// The peer that opened the connection.  It sends C0 and C1 before reading anything.
    Client,

    /// The peer that accepted the connection.  It waits for C0 and C1, then replies with S0,
    /// S1 and S2 at once.
    Server,
}

/// The outcome of processing bytes received from the peer
#[derive(Eq, PartialEq, Debug)]
pub enum HandshakeProcessResult {
    /// More bytes are required from the peer.  `response_bytes` must still be sent.
    InProgress { response_bytes: Vec<u8> },

    /// The handshake finished.  `remaining_bytes` were received after the peer's last
    /// handshake packet and already belong to the chunk stream.
    Completed {
        response_bytes: Vec<u8>,
        remaining_bytes: Vec<u8>,
    },
}

#[derive(Eq, PartialEq, Debug, Clone, Copy)]
enum Stage {
    Start,
    WaitingForPacket0,
    WaitingForPacket1,
    WaitingForPacket2,
    Complete,
}

pub struct Handshake {
    peer_type: PeerType,
    stage: Stage,
    my_epoch: u32,
    my_random: Vec<u8>,
    sent_p0_and_p1: bool,
    buffer: Vec<u8>,
}

impl Handshake {
    pub fn new(peer_type: PeerType) -> Handshake {
        let mut my_random = vec![0_u8; RANDOM_DATA_SIZE];
        rand::thread_rng().fill(&mut my_random[..]);

        Handshake {
            peer_type,
            stage: Stage::Start,
            my_epoch: current_epoch(),
            my_random,
            sent_p0_and_p1: false,
            buffer: Vec::with_capacity(PACKET_SIZE * 2 + 1),
        }
    }

    /// Creates the P0 and P1 packets (C0 + C1) a client opens the connection with.
    ///
    /// Servers do not need to call this, as S0 and S1 are sent along with S2 once the
    /// client's C1 has been received.
    pub fn generate_outbound_p0_and_p1(&mut self) -> Result<Vec<u8>, HandshakeError> {
        if self.sent_p0_and_p1 {
            return Err(HandshakeError::OutboundPacketsAlreadyGenerated);
        }

        let mut bytes = Vec::with_capacity(PACKET_SIZE + 1);
        self.write_p0_and_p1(&mut bytes)?;
        if self.stage == Stage::Start {
            self.stage = Stage::WaitingForPacket0;
        }

        Ok(bytes)
    }

    pub fn is_completed(&self) -> bool {
        self.stage == Stage::Complete
    }

    /// Processes bytes received from the peer, returning what must be sent back.
    pub fn process_bytes(&mut self, data: &[u8]) -> Result<HandshakeProcessResult, HandshakeError> {
        if self.stage == Stage::Start {
            if self.peer_type == PeerType::Client {
                return Err(HandshakeError::OutboundPacketsNotGenerated);
            }

            self.stage = Stage::WaitingForPacket0;
        }

        self.buffer.extend_from_slice(data);
        let mut response_bytes = Vec::new();

        loop {
            let progressed = match self.stage {
                Stage::Start => unreachable!("start stage is left before parsing"),
                Stage::WaitingForPacket0 => self.parse_p0()?,
                Stage::WaitingForPacket1 => self.parse_p1(&mut response_bytes)?,
                Stage::WaitingForPacket2 => self.parse_p2(),
                Stage::Complete => {
                    let remaining_bytes = self.buffer.drain(..).collect();
                    return Ok(HandshakeProcessResult::Completed {
                        response_bytes,
                        remaining_bytes,
                    });
                }
            };

            if !progressed {
                return Ok(HandshakeProcessResult::InProgress { response_bytes });
            }
        }
    }

    /// Runs the whole handshake over a blocking stream.  Returns any bytes the peer sent after
    /// its final handshake packet, which must be fed to the chunk deserializer.
    pub fn perform<S: Read + Write>(
        stream: &mut S,
        peer_type: PeerType,
    ) -> Result<Vec<u8>, HandshakeError> {
        let mut handshake = Handshake::new(peer_type);
        if peer_type == PeerType::Client {
            let p0_and_p1 = handshake.generate_outbound_p0_and_p1()?;
            stream.write_all(&p0_and_p1)?;
            stream.flush()?;
        }

        let mut buffer = [0_u8; READ_BUFFER_SIZE];
        loop {
            let bytes_read = stream.read(&mut buffer)?;
            if bytes_read == 0 {
                return Err(HandshakeError::Io(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "peer closed the connection during the handshake",
                )));
            }

            match handshake.process_bytes(&buffer[..bytes_read])? {
                HandshakeProcessResult::InProgress { response_bytes } => {
                    if !response_bytes.is_empty() {
                        stream.write_all(&response_bytes)?;
                        stream.flush()?;
                    }
                }

                HandshakeProcessResult::Completed {
                    response_bytes,
                    remaining_bytes,
                } => {
                    if !response_bytes.is_empty() {
                        stream.write_all(&response_bytes)?;
                        stream.flush()?;
                    }

                    debug!(?peer_type, "RTMP handshake completed");
                    return Ok(remaining_bytes);
                }
            }
        }
    }

    fn write_p0_and_p1(&mut self, bytes: &mut Vec<u8>) -> Result<(), HandshakeError> {
        bytes.push(RTMP_VERSION);
        bytes.write_u32::<BigEndian>(self.my_epoch)?;
        bytes.write_u32::<BigEndian>(0)?;
        bytes.extend_from_slice(&self.my_random);
        self.sent_p0_and_p1 = true;
        Ok(())
    }

    fn parse_p0(&mut self) -> Result<bool, HandshakeError> {
        if self.buffer.is_empty() {
            return Ok(false);
        }

        match self.buffer.remove(0) {
            RTMP_VERSION => {
                self.stage = Stage::WaitingForPacket1;
                Ok(true)
            }

            version => Err(HandshakeError::BadVersionId { version }),
        }
    }

    fn parse_p1(&mut self, response_bytes: &mut Vec<u8>) -> Result<bool, HandshakeError> {
        if self.buffer.len() < PACKET_SIZE {
            return Ok(false);
        }

        if !self.sent_p0_and_p1 {
            self.write_p0_and_p1(response_bytes)?;
        }

        // P2 is the peer's P1 echoed back verbatim
        response_bytes.extend(self.buffer.drain(..PACKET_SIZE));
        self.stage = Stage::WaitingForPacket2;
        Ok(true)
    }

    fn parse_p2(&mut self) -> bool {
        if self.buffer.len() < PACKET_SIZE {
            return false;
        }

        self.buffer.drain(..PACKET_SIZE);
        self.stage = Stage::Complete;
        true
    }
}

/// Wall clock milliseconds, truncated to the 32 bit handshake time field
fn current_epoch() -> u32 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u32)
        .unwrap_or(0)
}
