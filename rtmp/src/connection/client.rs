use super::{Conn, MessageIo, RtmpError, RtmpUrl};
use crate::handshake::{Handshake, PeerType};
use crate::messages::MessagePayload;
use crate::sessions::{ClientSession, ClientSessionConfig, ClientSessionResult, StreamMode};
use std::collections::VecDeque;
use std::io::{Read, Write};
use tracing::debug;

/// The client end of an RTMP connection that is publishing or playing a stream
pub struct ClientConn<S> {
    io: MessageIo<S>,
    session: ClientSession,
    mode: StreamMode,
    stream_id: u32,
    deferred: VecDeque<MessagePayload>,
}

impl<S: Read + Write> ClientConn<S> {
    /// Performs the handshake and the `connect`, `createStream` and `publish` or `play`
    /// sequence for the url's application and stream key.  Messages received during setup
    /// that play no part in it are returned by the first calls to `read()`.
    pub fn connect(
        mut stream: S,
        url: &RtmpUrl,
        mode: StreamMode,
        config: ClientSessionConfig,
    ) -> Result<ClientConn<S>, RtmpError> {
        let remaining_bytes = Handshake::perform(&mut stream, PeerType::Client)?;
        let io = MessageIo::new(stream, remaining_bytes, config.max_message_length);

        let mut session = ClientSession::new(config);
        session.handshake_completed()?;
        let results =
            session.request_connection(&url.app, &url.tc_url(), &url.stream_key, mode)?;

        let mut connection = ClientConn {
            io,
            session,
            mode,
            stream_id: 0,
            deferred: VecDeque::new(),
        };

        connection.process_results(results)?;
        while !connection.session.is_setup_complete() {
            let message = connection.io.read_message()?;
            let results = connection.session.handle_message(message)?;
            connection.process_results(results)?;
        }

        connection.stream_id = connection.session.stream_id().unwrap_or(0);
        debug!(
            app = %url.app,
            stream_key = %url.stream_key,
            ?mode,
            stream_id = connection.stream_id,
            "Client connection set up"
        );

        Ok(connection)
    }

    pub fn mode(&self) -> StreamMode {
        self.mode
    }

    /// The underlying stream, e.g. to adjust socket timeouts
    pub fn get_ref(&self) -> &S {
        self.io.stream()
    }

    fn process_results(&mut self, results: Vec<ClientSessionResult>) -> Result<(), RtmpError> {
        for result in results {
            match result {
                ClientSessionResult::OutboundResponse(message) => {
                    self.io.write_message(&message, true)?
                }

                ClientSessionResult::SetOutboundChunkSize(chunk_size) => {
                    self.io.set_chunk_size(chunk_size)?
                }

                ClientSessionResult::RaisedEvent(event) => {
                    debug!(?event, "Client session event raised")
                }

                ClientSessionResult::UnhandleableMessageReceived(message) => {
                    self.deferred.push_back(message)
                }
            }
        }

        Ok(())
    }
}

impl<S: Read + Write> Conn for ClientConn<S> {
    fn read(&mut self) -> Result<MessagePayload, RtmpError> {
        match self.deferred.pop_front() {
            Some(message) => Ok(message),
            None => self.io.read_message(),
        }
    }

    fn write(&mut self, message: &MessagePayload) -> Result<(), RtmpError> {
        self.io.write_message(message, false)
    }

    fn stream_id(&self) -> u32 {
        self.stream_id
    }

    fn bytes_received(&self) -> u64 {
        self.io.bytes_received()
    }

    fn bytes_sent(&self) -> u64 {
        self.io.bytes_sent()
    }
}
