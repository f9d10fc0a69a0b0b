use super::{Conn, MessageIo, RtmpError};
use crate::handshake::{Handshake, PeerType};
use crate::messages::{MessagePayload, AMF0_COMMAND_TYPE_ID};
use crate::sessions::{
    ServerSession, ServerSessionConfig, ServerSessionEvent, ServerSessionResult, StreamMode,
};
use std::collections::VecDeque;
use std::io::{Read, Write};
use tracing::debug;

/// The server end of an RTMP connection, accepted from a publishing or playing client
pub struct ServerConn<S> {
    io: MessageIo<S>,
    session: ServerSession,
    deferred: VecDeque<MessagePayload>,
    stream_finished: bool,
}

impl<S: Read + Write> ServerConn<S> {
    /// Performs the handshake and accepts the client's `connect`, `createStream` and
    /// `publish` or `play` requests
    pub fn accept(mut stream: S, config: ServerSessionConfig) -> Result<ServerConn<S>, RtmpError> {
        let remaining_bytes = Handshake::perform(&mut stream, PeerType::Server)?;
        let io = MessageIo::new(stream, remaining_bytes, config.max_message_length);

        let mut session = ServerSession::new(config);
        session.handshake_completed()?;

        let mut connection = ServerConn {
            io,
            session,
            deferred: VecDeque::new(),
            stream_finished: false,
        };

        while !connection.session.is_setup_complete() {
            let message = connection.io.read_message()?;
            let results = connection.session.handle_message(message)?;
            connection.process_results(results, true)?;
        }

        debug!(
            app = connection.app_name(),
            stream_key = connection.stream_key(),
            mode = ?connection.mode(),
            "Server connection set up"
        );

        Ok(connection)
    }

    /// Whether the client is publishing or playing
    pub fn mode(&self) -> StreamMode {
        self.session.mode().unwrap_or(StreamMode::Publish)
    }

    pub fn is_publishing(&self) -> bool {
        self.mode() == StreamMode::Publish
    }

    pub fn app_name(&self) -> &str {
        self.session.app_name().unwrap_or_default()
    }

    /// The stream key requested by the client.  Empty once the client has finished the stream.
    pub fn stream_key(&self) -> &str {
        self.session.stream_key().unwrap_or_default()
    }

    /// True once the client closed or deleted the stream it set up
    pub fn is_stream_finished(&self) -> bool {
        self.stream_finished
    }

    /// The underlying stream, e.g. to adjust socket timeouts
    pub fn get_ref(&self) -> &S {
        self.io.stream()
    }

    fn process_results(
        &mut self,
        results: Vec<ServerSessionResult>,
        during_setup: bool,
    ) -> Result<(), RtmpError> {
        for result in results {
            match result {
                ServerSessionResult::OutboundResponse(message) => {
                    self.io.write_message(&message, during_setup)?
                }

                ServerSessionResult::SetOutboundChunkSize(chunk_size) => {
                    self.io.set_chunk_size(chunk_size)?
                }

                ServerSessionResult::RaisedEvent(event) => {
                    if let ServerSessionEvent::StreamFinished { .. } = event {
                        self.stream_finished = true;
                    }

                    debug!(?event, "Server session event raised");
                }

                ServerSessionResult::UnhandleableMessageReceived(message) => {
                    self.deferred.push_back(message)
                }
            }
        }

        Ok(())
    }
}

impl<S: Read + Write> Conn for ServerConn<S> {
    /// Commands keep flowing through the session after setup.  Ones it consumes, such as
    /// `FCUnpublish`, are not returned, while `deleteStream` and `closeStream` are returned
    /// after marking the stream as finished.
    fn read(&mut self) -> Result<MessagePayload, RtmpError> {
        loop {
            if let Some(message) = self.deferred.pop_front() {
                return Ok(message);
            }

            let message = self.io.read_message()?;
            if message.type_id != AMF0_COMMAND_TYPE_ID {
                return Ok(message);
            }

            let was_finished = self.stream_finished;
            let results = self.session.handle_message(message.clone())?;
            self.process_results(results, false)?;
            if self.stream_finished && !was_finished {
                return Ok(message);
            }
        }
    }

    fn write(&mut self, message: &MessagePayload) -> Result<(), RtmpError> {
        self.io.write_message(message, false)
    }

    fn stream_id(&self) -> u32 {
        self.session.stream_id().unwrap_or(0)
    }

    fn bytes_received(&self) -> u64 {
        self.io.bytes_received()
    }

    fn bytes_sent(&self) -> u64 {
        self.io.bytes_sent()
    }
}
