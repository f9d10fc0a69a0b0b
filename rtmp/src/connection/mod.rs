/*!
Blocking RTMP connections over any `Read + Write` byte stream.

`ClientConn::connect()` and `ServerConn::accept()` perform the handshake and the complete
session setup before returning.  Afterwards `read()` returns every message that is not consumed
by the connection itself, and `write()` sends messages on the stream that was set up.

Protocol control messages, ping requests and acknowledgements are handled internally.

```no_run
use rtmp_engine::connection::{ClientConn, Conn, RtmpUrl};
use rtmp_engine::sessions::{ClientSessionConfig, StreamMode};
use std::net::TcpStream;

let url = RtmpUrl::parse("rtmp://127.0.0.1/live/key").unwrap();
let stream = TcpStream::connect(url.address()).unwrap();
let mut connection =
    ClientConn::connect(stream, &url, StreamMode::Play, ClientSessionConfig::new()).unwrap();

let message = connection.read().unwrap();
println!("received message of type {}", message.type_id);
```
*/

mod client;
mod errors;
mod server;
mod url;

pub use self::client::ClientConn;
pub use self::errors::{ProtocolError, RtmpError};
pub use self::server::ServerConn;
pub use self::url::{RtmpUrl, DEFAULT_PORT};

use crate::chunk_io::{ChunkDeserializer, ChunkSerializer};
use crate::messages::{MessagePayload, RtmpMessage, UserControlEventType, USER_CONTROL_TYPE_ID};
use crate::time::RtmpTimestamp;
use std::io::{self, Read, Write};
use tracing::{debug, trace};

const READ_BUFFER_SIZE: usize = 4096;

/// A connection that has completed session setup
pub trait Conn {
    /// Blocks until the next message that is not consumed by the connection has arrived
    fn read(&mut self) -> Result<MessagePayload, RtmpError>;

    fn write(&mut self, message: &MessagePayload) -> Result<(), RtmpError>;

    /// The message stream id media is published or played on
    fn stream_id(&self) -> u32;

    fn bytes_received(&self) -> u64;

    fn bytes_sent(&self) -> u64;
}

/// Moves messages between a byte stream and the chunk layer, answering pings and
/// acknowledging received bytes along the way
pub(crate) struct MessageIo<S> {
    stream: S,
    deserializer: ChunkDeserializer,
    serializer: ChunkSerializer,
    pending_input: Vec<u8>,
    read_buffer: Vec<u8>,
    bytes_received: u64,
    bytes_sent: u64,
    last_acknowledged: u64,
}

impl<S: Read + Write> MessageIo<S> {
    /// `remaining_bytes` are bytes read past the end of the handshake
    pub(crate) fn new(
        stream: S,
        remaining_bytes: Vec<u8>,
        max_message_length: usize,
    ) -> MessageIo<S> {
        let mut deserializer = ChunkDeserializer::new();
        deserializer.set_max_message_length(max_message_length);

        MessageIo {
            stream,
            deserializer,
            serializer: ChunkSerializer::new(),
            bytes_received: remaining_bytes.len() as u64,
            pending_input: remaining_bytes,
            read_buffer: vec![0; READ_BUFFER_SIZE],
            bytes_sent: 0,
            last_acknowledged: 0,
        }
    }

    pub(crate) fn read_message(&mut self) -> Result<MessagePayload, RtmpError> {
        loop {
            let input = std::mem::take(&mut self.pending_input);
            let message = self.deserializer.get_next_message(&input)?;
            self.acknowledge_if_needed()?;

            match message {
                Some(message) => {
                    if !self.answer_ping(&message)? {
                        trace!(
                            type_id = message.type_id,
                            stream_id = message.message_stream_id,
                            length = message.data.len(),
                            "Received message"
                        );

                        return Ok(message);
                    }
                }

                None => self.fill_input()?,
            }
        }
    }

    pub(crate) fn write_message(
        &mut self,
        message: &MessagePayload,
        force_uncompressed: bool,
    ) -> Result<(), RtmpError> {
        let bytes = self.serializer.serialize(message, force_uncompressed)?;
        self.send(&bytes)
    }

    pub(crate) fn set_chunk_size(&mut self, chunk_size: u32) -> Result<(), RtmpError> {
        let bytes = self
            .serializer
            .set_max_chunk_size(chunk_size, RtmpTimestamp::new(0))?;

        debug!(chunk_size, "Outbound chunk size changed");
        self.send(&bytes)
    }

    pub(crate) fn stream(&self) -> &S {
        &self.stream
    }

    pub(crate) fn bytes_received(&self) -> u64 {
        self.bytes_received
    }

    pub(crate) fn bytes_sent(&self) -> u64 {
        self.bytes_sent
    }

    fn fill_input(&mut self) -> Result<(), RtmpError> {
        let bytes_read = self.stream.read(&mut self.read_buffer)?;
        if bytes_read == 0 {
            return Err(RtmpError::Transport(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "peer closed the connection",
            )));
        }

        self.bytes_received += bytes_read as u64;
        self.pending_input
            .extend_from_slice(&self.read_buffer[..bytes_read]);

        Ok(())
    }

    fn send(&mut self, bytes: &[u8]) -> Result<(), RtmpError> {
        self.stream.write_all(bytes)?;
        self.stream.flush()?;
        self.bytes_sent += bytes.len() as u64;
        Ok(())
    }

    /// Sends an acknowledgement each time the received byte count crosses the window size the
    /// peer asked for
    fn acknowledge_if_needed(&mut self) -> Result<(), RtmpError> {
        let window = match self.deserializer.session_parameters().peer_window_ack_size {
            Some(window) if window > 0 => window as u64,
            _ => return Ok(()),
        };

        if self.bytes_received - self.last_acknowledged < window {
            return Ok(());
        }

        self.last_acknowledged = self.bytes_received;
        let acknowledgement = RtmpMessage::Acknowledgement {
            sequence_number: self.bytes_received as u32,
        }
        .into_message_payload(RtmpTimestamp::new(0), 0)?;

        trace!(sequence_number = self.bytes_received as u32, "Sending acknowledgement");
        self.write_message(&acknowledgement, false)
    }

    /// Returns true when the message was a ping request that has been answered
    fn answer_ping(&mut self, message: &MessagePayload) -> Result<bool, RtmpError> {
        if message.type_id != USER_CONTROL_TYPE_ID {
            return Ok(false);
        }

        let timestamp = match message.to_rtmp_message()? {
            RtmpMessage::UserControl {
                event_type: UserControlEventType::PingRequest,
                timestamp,
                ..
            } => timestamp,
            _ => return Ok(false),
        };

        let response = RtmpMessage::UserControl {
            event_type: UserControlEventType::PingResponse,
            stream_id: None,
            buffer_length: None,
            timestamp,
        }
        .into_message_payload(RtmpTimestamp::new(0), 0)?;

        trace!("Answering ping request");
        self.write_message(&response, false)?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::MessageDeserializationError;
    use std::io::Cursor;

    /// Serves canned input and records everything written
    struct MockStream {
        input: Cursor<Vec<u8>>,
        output: Vec<u8>,
    }

    impl Read for MockStream {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            self.input.read(buf)
        }
    }

    impl Write for MockStream {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.output.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn serialize(messages: &[RtmpMessage]) -> Vec<u8> {
        let mut serializer = ChunkSerializer::new();
        let mut bytes = Vec::new();
        for message in messages {
            let payload = message
                .clone()
                .into_message_payload(RtmpTimestamp::new(0), 0)
                .unwrap();

            bytes.extend(serializer.serialize(&payload, false).unwrap());
        }

        bytes
    }

    fn written_messages(output: &[u8]) -> Vec<RtmpMessage> {
        let mut deserializer = ChunkDeserializer::new();
        let mut messages = Vec::new();
        let mut input = output;
        while let Some(payload) = deserializer.get_next_message(input).unwrap() {
            messages.push(payload.to_rtmp_message().unwrap());
            input = &[];
        }

        messages
    }

    fn io_for(input: Vec<u8>) -> MessageIo<MockStream> {
        let stream = MockStream {
            input: Cursor::new(input),
            output: Vec::new(),
        };

        MessageIo::new(stream, Vec::new(), 1024)
    }

    #[test]
    fn ping_requests_are_answered_and_consumed() {
        let input = serialize(&[
            RtmpMessage::UserControl {
                event_type: UserControlEventType::PingRequest,
                stream_id: None,
                buffer_length: None,
                timestamp: Some(RtmpTimestamp::new(777)),
            },
            RtmpMessage::Amf0Data { values: Vec::new() },
        ]);

        let mut io = io_for(input);
        let message = io.read_message().unwrap();
        assert_eq!(
            message.to_rtmp_message().unwrap(),
            RtmpMessage::Amf0Data { values: Vec::new() }
        );

        let written = written_messages(&io.stream.output);
        assert_eq!(
            written,
            vec![RtmpMessage::UserControl {
                event_type: UserControlEventType::PingResponse,
                stream_id: None,
                buffer_length: None,
                timestamp: Some(RtmpTimestamp::new(777)),
            }]
        );
    }

    #[test]
    fn other_user_control_messages_are_surfaced() {
        let input = serialize(&[RtmpMessage::UserControl {
            event_type: UserControlEventType::StreamBegin,
            stream_id: Some(1),
            buffer_length: None,
            timestamp: None,
        }]);

        let mut io = io_for(input);
        let message = io.read_message().unwrap();
        assert_eq!(message.type_id, USER_CONTROL_TYPE_ID);
        assert!(io.stream.output.is_empty());
    }

    #[test]
    fn acknowledgement_sent_when_window_is_crossed() {
        let mut messages = vec![RtmpMessage::WindowAcknowledgement { size: 100 }];
        for _ in 0..3 {
            messages.push(RtmpMessage::Unknown {
                type_id: 30,
                data: bytes::Bytes::from(vec![1_u8; 60]),
            });
        }

        let input = serialize(&messages);
        let total = input.len() as u32;
        let mut io = io_for(input);
        for _ in 0..3 {
            io.read_message().unwrap();
        }

        // acknowledgements are consumed by the receiving deserializer
        let mut deserializer = ChunkDeserializer::new();
        assert_eq!(deserializer.get_next_message(&io.stream.output).unwrap(), None);
        assert_eq!(
            deserializer.session_parameters().last_acknowledgement,
            Some(total)
        );
    }

    #[test]
    fn closed_stream_is_a_transport_error() {
        let mut io = io_for(Vec::new());
        match io.read_message() {
            Err(RtmpError::Transport(ref error)) if error.kind() == io::ErrorKind::UnexpectedEof => (),
            x => panic!("Expected end of file error, got {:?}", x),
        }
    }

    #[test]
    fn malformed_user_control_is_a_protocol_error() {
        let payload = MessagePayload {
            chunk_stream_id: 2,
            timestamp: RtmpTimestamp::new(0),
            type_id: USER_CONTROL_TYPE_ID,
            message_stream_id: 0,
            data: bytes::Bytes::from_static(&[0]),
        };

        let mut serializer = ChunkSerializer::new();
        let input = serializer.serialize(&payload, false).unwrap();
        let mut io = io_for(input);

        match io.read_message() {
            Err(RtmpError::Protocol(ProtocolError::MessageDeserialization(
                MessageDeserializationError::Io(_),
            )))
            | Err(RtmpError::Protocol(ProtocolError::MessageDeserialization(
                MessageDeserializationError::InvalidMessageFormat,
            ))) => (),
            x => panic!("Expected message deserialization error, got {:?}", x),
        }
    }

    #[test]
    fn bytes_after_handshake_are_read_first() {
        let leftover = serialize(&[RtmpMessage::Amf0Data { values: Vec::new() }]);
        let length = leftover.len() as u64;
        let stream = MockStream {
            input: Cursor::new(Vec::new()),
            output: Vec::new(),
        };

        let mut io = MessageIo::new(stream, leftover, 1024);
        assert_eq!(io.read_message().unwrap().type_id, 18);
        assert_eq!(io.bytes_received(), length);
    }
}
