mod config;
mod errors;
mod events;
mod result;
mod state;


pub use self::config::ClientSessionConfig;
pub use self::errors::ClientSessionError;
pub use self::events::ClientSessionEvent;
pub use self::result::ClientSessionResult;
pub use self::state::ClientState;

use super::{StatusInfo, StreamMode};
use crate::messages::{
    MessagePayload, RtmpMessage, UserControlEventType, AMF0_COMMAND_TYPE_ID, AMF0_DATA_TYPE_ID,
};
use crate::time::RtmpTimestamp;
use rtmp_amf0::Amf0Value;
use std::collections::HashMap;
use tracing::debug;

/// Codecs advertised through the Enhanced RTMP `fourCcList` connect property
const FOUR_CC_LIST: [&str; 6] = ["av01", "vp09", "hvc1", "avc1", "Opus", "ac-3"];

#[derive(Eq, PartialEq, Debug, Clone, Copy)]
enum OutstandingRequest {
    Connect,
    CreateStream,
}

impl OutstandingRequest {
    fn command_name(self) -> &'static str {
        match self {
            OutstandingRequest::Connect => "connect",
            OutstandingRequest::CreateStream => "createStream",
        }
    }
}

/// The client side of the RTMP command sequence.
///
/// Once `request_connection()` is called the session walks through `connect`, `createStream`
/// and then `publish` or `play` on its own as the server's answers are passed to
/// `handle_message()`.  Setup is complete once the state is `Publishing` or `Playing`.
pub struct ClientSession {
    config: ClientSessionConfig,
    state: ClientState,
    mode: StreamMode,
    stream_key: String,
    next_transaction_id: f64,
    outstanding_request: Option<(f64, OutstandingRequest)>,
    stream_id: Option<u32>,
}

impl ClientSession {
    pub fn new(config: ClientSessionConfig) -> ClientSession {
        ClientSession {
            config,
            state: ClientState::Idle,
            mode: StreamMode::Publish,
            stream_key: String::new(),
            next_transaction_id: 1.0,
            outstanding_request: None,
            stream_id: None,
        }
    }

    pub fn state(&self) -> ClientState {
        self.state
    }

    /// The message stream id the server created for publishing or playback
    pub fn stream_id(&self) -> Option<u32> {
        self.stream_id
    }

    pub fn is_setup_complete(&self) -> bool {
        self.state == ClientState::Publishing || self.state == ClientState::Playing
    }

    pub fn handshake_completed(&mut self) -> Result<(), ClientSessionError> {
        if self.state != ClientState::Idle {
            return Err(ClientSessionError::SessionInInvalidState {
                action: "complete the handshake",
                state: self.state,
            });
        }

        self.set_state(ClientState::HandshakeDone);
        Ok(())
    }

    /// Starts the command sequence by sending `connect` for the given application.
    /// `stream_key` and `mode` are used once the stream has been created.
    pub fn request_connection(
        &mut self,
        app_name: &str,
        tc_url: &str,
        stream_key: &str,
        mode: StreamMode,
    ) -> Result<Vec<ClientSessionResult>, ClientSessionError> {
        if self.state != ClientState::HandshakeDone {
            return Err(ClientSessionError::SessionInInvalidState {
                action: "request a connection",
                state: self.state,
            });
        }

        self.mode = mode;
        self.stream_key = stream_key.to_string();

        let mut properties = HashMap::new();
        let mut add = |name: &str, value: Amf0Value| properties.insert(name.to_string(), value);
        add("app", Amf0Value::Utf8String(app_name.to_string()));
        add("flashVer", Amf0Value::Utf8String(self.config.flash_version.clone()));
        add("tcUrl", Amf0Value::Utf8String(tc_url.to_string()));
        add("fpad", Amf0Value::Boolean(false));
        add("capabilities", Amf0Value::Number(15.0));
        add("audioCodecs", Amf0Value::Number(4071.0));
        add("videoCodecs", Amf0Value::Number(252.0));
        add("videoFunction", Amf0Value::Number(1.0));
        add("objectEncoding", Amf0Value::Number(0.0));
        add(
            "fourCcList",
            Amf0Value::StrictArray(
                FOUR_CC_LIST
                    .iter()
                    .map(|x| Amf0Value::Utf8String(x.to_string()))
                    .collect(),
            ),
        );

        let transaction_id = self.start_request(OutstandingRequest::Connect);
        let connect = self.command(
            "connect",
            transaction_id,
            Amf0Value::Object(properties),
            Vec::new(),
            0,
        )?;

        self.set_state(ClientState::ConnectSent);
        Ok(vec![connect])
    }

    /// Processes a message received from the server.  Messages that play no part in the
    /// command sequence are handed back as `UnhandleableMessageReceived`.
    pub fn handle_message(
        &mut self,
        payload: MessagePayload,
    ) -> Result<Vec<ClientSessionResult>, ClientSessionError> {
        match payload.type_id {
            AMF0_COMMAND_TYPE_ID => match payload.to_rtmp_message()? {
                RtmpMessage::Amf0Command {
                    command_name,
                    transaction_id,
                    additional_arguments,
                    ..
                } => self.handle_command(
                    payload,
                    &command_name,
                    transaction_id,
                    additional_arguments,
                ),
                _ => Ok(vec![ClientSessionResult::UnhandleableMessageReceived(payload)]),
            },

            AMF0_DATA_TYPE_ID => match payload.to_rtmp_message()? {
                RtmpMessage::Amf0Data { ref values }
                    if values.first().and_then(Amf0Value::as_str) == Some("|RtmpSampleAccess") =>
                {
                    Ok(Vec::new())
                }
                _ => Ok(vec![ClientSessionResult::UnhandleableMessageReceived(payload)]),
            },

            _ => Ok(vec![ClientSessionResult::UnhandleableMessageReceived(payload)]),
        }
    }

    fn handle_command(
        &mut self,
        payload: MessagePayload,
        command_name: &str,
        transaction_id: f64,
        arguments: Vec<Amf0Value>,
    ) -> Result<Vec<ClientSessionResult>, ClientSessionError> {
        match command_name {
            "_result" => match self.finish_request(command_name, transaction_id)? {
                OutstandingRequest::Connect => self.handle_connect_result(),
                OutstandingRequest::CreateStream => self.handle_create_stream_result(&arguments),
            },

            "_error" => {
                let request = self.finish_request(command_name, transaction_id)?;
                let info = status_argument(&arguments);
                Err(ClientSessionError::CommandRejected {
                    command: request.command_name().to_string(),
                    description: info.description,
                })
            }

            "onStatus" => self.handle_status(status_argument(&arguments)),

            "onBWDone" | "onFCPublish" | "onFCUnpublish" | "onFCSubscribe" | "_checkbw" => {
                debug!(command = command_name, "Ignoring server notification");
                Ok(Vec::new())
            }

            _ => Ok(vec![ClientSessionResult::UnhandleableMessageReceived(payload)]),
        }
    }

    fn handle_connect_result(&mut self) -> Result<Vec<ClientSessionResult>, ClientSessionError> {
        self.set_state(ClientState::ConnectAcked);

        let window_ack = RtmpMessage::WindowAcknowledgement {
            size: self.config.window_ack_size,
        }
        .into_message_payload(RtmpTimestamp::new(0), 0)?;

        let transaction_id = self.start_request(OutstandingRequest::CreateStream);
        let create_stream =
            self.command("createStream", transaction_id, Amf0Value::Null, Vec::new(), 0)?;

        self.set_state(ClientState::CreateStreamSent);
        Ok(vec![
            ClientSessionResult::RaisedEvent(ClientSessionEvent::ConnectionRequestAccepted),
            ClientSessionResult::SetOutboundChunkSize(self.config.chunk_size),
            ClientSessionResult::OutboundResponse(window_ack),
            create_stream,
        ])
    }

    fn handle_create_stream_result(
        &mut self,
        arguments: &[Amf0Value],
    ) -> Result<Vec<ClientSessionResult>, ClientSessionError> {
        let stream_id = arguments
            .first()
            .and_then(Amf0Value::as_number)
            .ok_or(ClientSessionError::CreateStreamResponseHadNoStreamNumber)?
            as u32;

        self.stream_id = Some(stream_id);
        self.set_state(ClientState::StreamCreated);

        let mut results = vec![ClientSessionResult::RaisedEvent(
            ClientSessionEvent::StreamCreated { stream_id },
        )];

        let key = Amf0Value::Utf8String(self.stream_key.clone());
        let transaction_id = self.next_transaction_id();
        match self.mode {
            StreamMode::Publish => {
                let arguments = vec![key, Amf0Value::Utf8String("live".to_string())];
                let publish =
                    self.command("publish", transaction_id, Amf0Value::Null, arguments, stream_id)?;

                results.push(publish);
                self.set_state(ClientState::PublishSent);
            }

            StreamMode::Play => {
                let arguments = vec![key, Amf0Value::Number(-2000.0)];
                let play =
                    self.command("play", transaction_id, Amf0Value::Null, arguments, stream_id)?;

                results.push(play);

                let buffer_length = RtmpMessage::UserControl {
                    event_type: UserControlEventType::SetBufferLength,
                    stream_id: Some(stream_id),
                    buffer_length: Some(self.config.playback_buffer_length_ms),
                    timestamp: None,
                }
                .into_message_payload(RtmpTimestamp::new(0), 0)?;

                results.push(ClientSessionResult::OutboundResponse(buffer_length));
                self.set_state(ClientState::PlaySent);
            }
        }

        Ok(results)
    }

    fn handle_status(
        &mut self,
        info: StatusInfo,
    ) -> Result<Vec<ClientSessionResult>, ClientSessionError> {
        if info.is_error() {
            return Err(ClientSessionError::StatusError {
                code: info.code,
                description: info.description,
            });
        }

        let stream_id = self.stream_id.unwrap_or(0);
        match (self.state, info.code.as_str()) {
            (ClientState::PublishSent, "NetStream.Publish.Start") => {
                self.set_state(ClientState::Publishing);
                Ok(vec![ClientSessionResult::RaisedEvent(
                    ClientSessionEvent::PublishRequestAccepted { stream_id },
                )])
            }

            (ClientState::PlaySent, "NetStream.Play.Start") => {
                self.set_state(ClientState::Playing);
                Ok(vec![ClientSessionResult::RaisedEvent(
                    ClientSessionEvent::PlaybackRequestAccepted { stream_id },
                )])
            }

            (_, code @ "NetStream.Play.Reset")
            | (ClientState::Publishing, code)
            | (ClientState::Playing, code) => {
                debug!(code, "Ignoring status notification");
                Ok(Vec::new())
            }

            (state, code) => Err(ClientSessionError::UnexpectedStatus {
                code: code.to_string(),
                state,
            }),
        }
    }

    fn next_transaction_id(&mut self) -> f64 {
        let id = self.next_transaction_id;
        self.next_transaction_id += 1.0;
        id
    }

    fn start_request(&mut self, request: OutstandingRequest) -> f64 {
        let transaction_id = self.next_transaction_id();
        self.outstanding_request = Some((transaction_id, request));
        transaction_id
    }

    fn finish_request(
        &mut self,
        command_name: &str,
        transaction_id: f64,
    ) -> Result<OutstandingRequest, ClientSessionError> {
        match self.outstanding_request {
            Some((expected, request)) if expected == transaction_id => {
                self.outstanding_request = None;
                Ok(request)
            }

            outstanding => Err(ClientSessionError::UnexpectedTransaction {
                command: command_name.to_string(),
                expected: outstanding.map(|(id, _)| id),
                received: transaction_id,
            }),
        }
    }

    fn command(
        &self,
        command_name: &str,
        transaction_id: f64,
        command_object: Amf0Value,
        additional_arguments: Vec<Amf0Value>,
        message_stream_id: u32,
    ) -> Result<ClientSessionResult, ClientSessionError> {
        let payload = RtmpMessage::Amf0Command {
            command_name: command_name.to_string(),
            transaction_id,
            command_object,
            additional_arguments,
        }
        .into_message_payload(RtmpTimestamp::new(0), message_stream_id)?;

        Ok(ClientSessionResult::OutboundResponse(payload))
    }

    fn set_state(&mut self, state: ClientState) {
        debug!(from = ?self.state, to = ?state, "Client session state changed");
        self.state = state;
    }
}

fn status_argument(arguments: &[Amf0Value]) -> StatusInfo {
    arguments
        .first()
        .map(StatusInfo::from_amf0)
        .unwrap_or_else(|| StatusInfo::new("", "", ""))
}
