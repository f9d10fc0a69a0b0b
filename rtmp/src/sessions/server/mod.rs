mod config;
mod errors;
mod events;
mod result;
mod state;


pub use self::config::ServerSessionConfig;
pub use self::errors::ServerSessionError;
pub use self::events::ServerSessionEvent;
pub use self::result::ServerSessionResult;
pub use self::state::ServerState;

use super::{StatusInfo, StreamMode};
use crate::messages::{
    MessagePayload, PeerBandwidthLimitType, RtmpMessage, UserControlEventType,
    AMF0_COMMAND_TYPE_ID,
};
use crate::time::RtmpTimestamp;
use rtmp_amf0::Amf0Value;
use std::collections::HashMap;
use tracing::debug;

/// The server side of the RTMP command sequence.
///
/// The session accepts the first `connect`, `createStream` and `publish` or `play` request it
/// receives, in that order.  Encoder bookkeeping commands sent around those requests
/// (`releaseStream`, `FCPublish` and friends) are ignored.  Setup is complete once the state is
/// `Publishing` or `Playing`.
pub struct ServerSession {
    config: ServerSessionConfig,
    state: ServerState,
    app_name: Option<String>,
    stream_key: Option<String>,
    stream_id: Option<u32>,
    mode: Option<StreamMode>,
    next_stream_id: u32,
}

impl ServerSession {
    pub fn new(config: ServerSessionConfig) -> ServerSession {
        ServerSession {
            config,
            state: ServerState::Idle,
            app_name: None,
            stream_key: None,
            stream_id: None,
            mode: None,
            next_stream_id: 1,
        }
    }

    pub fn state(&self) -> ServerState {
        self.state
    }

    pub fn app_name(&self) -> Option<&str> {
        self.app_name.as_deref()
    }

    pub fn stream_key(&self) -> Option<&str> {
        self.stream_key.as_deref()
    }

    /// The message stream id the client publishes or plays on
    pub fn stream_id(&self) -> Option<u32> {
        self.stream_id
    }

    /// Whether the client asked to publish or to play
    pub fn mode(&self) -> Option<StreamMode> {
        self.mode
    }

    pub fn is_setup_complete(&self) -> bool {
        self.state == ServerState::Publishing || self.state == ServerState::Playing
    }

    pub fn handshake_completed(&mut self) -> Result<(), ServerSessionError> {
        if self.state != ServerState::Idle {
            return Err(ServerSessionError::SessionInInvalidState {
                action: "complete the handshake",
                state: self.state,
            });
        }

        self.set_state(ServerState::HandshakeDone);
        self.set_state(ServerState::AwaitConnect);
        Ok(())
    }

    /// Processes a message received from the client.  Messages that play no part in the
    /// command sequence are handed back as `UnhandleableMessageReceived`.
    pub fn handle_message(
        &mut self,
        payload: MessagePayload,
    ) -> Result<Vec<ServerSessionResult>, ServerSessionError> {
        if payload.type_id != AMF0_COMMAND_TYPE_ID {
            return Ok(vec![ServerSessionResult::UnhandleableMessageReceived(payload)]);
        }

        match payload.to_rtmp_message()? {
            RtmpMessage::Amf0Command {
                command_name,
                transaction_id,
                command_object,
                additional_arguments,
            } => match command_name.as_str() {
                "connect" => self.handle_connect(transaction_id, &command_object),
                "createStream" => self.handle_create_stream(transaction_id),
                "publish" => self.handle_publish(&additional_arguments, payload.message_stream_id),
                "play" => self.handle_play(&additional_arguments, payload.message_stream_id),
                "deleteStream" | "closeStream" => self.handle_stream_closed(&command_name),

                "releaseStream" | "FCPublish" | "FCUnpublish" | "FCSubscribe" | "_checkbw"
                | "getStreamLength" => {
                    debug!(command = %command_name, "Ignoring client bookkeeping command");
                    Ok(Vec::new())
                }

                _ => Ok(vec![ServerSessionResult::UnhandleableMessageReceived(payload)]),
            },

            _ => Ok(vec![ServerSessionResult::UnhandleableMessageReceived(payload)]),
        }
    }

    fn handle_connect(
        &mut self,
        transaction_id: f64,
        command_object: &Amf0Value,
    ) -> Result<Vec<ServerSessionResult>, ServerSessionError> {
        self.expect_state(ServerState::AwaitConnect, "connect")?;

        let app_name = command_object
            .property("app")
            .and_then(Amf0Value::as_str)
            .map(|app| app.trim_end_matches('/').to_string())
            .ok_or(ServerSessionError::NoAppNameForConnectionRequest)?;

        self.app_name = Some(app_name.clone());
        self.set_state(ServerState::ConnectAcked);

        let window_ack = RtmpMessage::WindowAcknowledgement {
            size: self.config.window_ack_size,
        }
        .into_message_payload(RtmpTimestamp::new(0), 0)?;

        let peer_bandwidth = RtmpMessage::SetPeerBandwidth {
            size: self.config.peer_bandwidth,
            limit_type: PeerBandwidthLimitType::Dynamic,
        }
        .into_message_payload(RtmpTimestamp::new(0), 0)?;

        let mut properties = HashMap::new();
        properties.insert(
            "fmsVer".to_string(),
            Amf0Value::Utf8String(self.config.fms_version.clone()),
        );
        properties.insert("capabilities".to_string(), Amf0Value::Number(31.0));

        let mut information = match StatusInfo::new(
            "status",
            "NetConnection.Connect.Success",
            "Connection succeeded.",
        )
        .into_amf0()
        {
            Amf0Value::Object(information) => information,
            _ => HashMap::new(),
        };
        information.insert("objectEncoding".to_string(), Amf0Value::Number(0.0));

        let connect_result = command(
            "_result",
            transaction_id,
            Amf0Value::Object(properties),
            vec![Amf0Value::Object(information)],
            0,
        )?;

        self.set_state(ServerState::AwaitCreateStream);
        Ok(vec![
            ServerSessionResult::OutboundResponse(window_ack),
            ServerSessionResult::OutboundResponse(peer_bandwidth),
            ServerSessionResult::SetOutboundChunkSize(self.config.chunk_size),
            ServerSessionResult::OutboundResponse(connect_result),
            ServerSessionResult::RaisedEvent(ServerSessionEvent::ConnectionAccepted { app_name }),
        ])
    }

    fn handle_create_stream(
        &mut self,
        transaction_id: f64,
    ) -> Result<Vec<ServerSessionResult>, ServerSessionError> {
        self.expect_state(ServerState::AwaitCreateStream, "createStream")?;

        let stream_id = self.next_stream_id;
        self.next_stream_id += 1;
        self.stream_id = Some(stream_id);
        self.set_state(ServerState::StreamCreated);

        let result = command(
            "_result",
            transaction_id,
            Amf0Value::Null,
            vec![Amf0Value::Number(stream_id as f64)],
            0,
        )?;

        self.set_state(ServerState::AwaitPublishOrPlay);
        Ok(vec![
            ServerSessionResult::OutboundResponse(result),
            ServerSessionResult::RaisedEvent(ServerSessionEvent::StreamCreated { stream_id }),
        ])
    }

    fn handle_publish(
        &mut self,
        arguments: &[Amf0Value],
        stream_id: u32,
    ) -> Result<Vec<ServerSessionResult>, ServerSessionError> {
        self.expect_state(ServerState::AwaitPublishOrPlay, "publish")?;
        let stream_key = read_stream_key(arguments, "publish")?;

        let begin = stream_begin(stream_id)?;
        let status = on_status(
            StatusInfo::new(
                "status",
                "NetStream.Publish.Start",
                &format!("{} is now published.", stream_key),
            ),
            stream_id,
        )?;

        self.start_stream(StreamMode::Publish, &stream_key, stream_id);
        let event = ServerSessionEvent::PublishStarted {
            app_name: self.app_name.clone().unwrap_or_default(),
            stream_key,
            stream_id,
        };

        Ok(vec![
            ServerSessionResult::OutboundResponse(begin),
            ServerSessionResult::OutboundResponse(status),
            ServerSessionResult::RaisedEvent(event),
        ])
    }

    fn handle_play(
        &mut self,
        arguments: &[Amf0Value],
        stream_id: u32,
    ) -> Result<Vec<ServerSessionResult>, ServerSessionError> {
        self.expect_state(ServerState::AwaitPublishOrPlay, "play")?;
        let stream_key = read_stream_key(arguments, "play")?;

        let begin = stream_begin(stream_id)?;
        let reset = on_status(
            StatusInfo::new(
                "status",
                "NetStream.Play.Reset",
                &format!("Playing and resetting {}.", stream_key),
            ),
            stream_id,
        )?;

        let start = on_status(
            StatusInfo::new(
                "status",
                "NetStream.Play.Start",
                &format!("Started playing {}.", stream_key),
            ),
            stream_id,
        )?;

        let sample_access = RtmpMessage::Amf0Data {
            values: vec![
                Amf0Value::Utf8String("|RtmpSampleAccess".to_string()),
                Amf0Value::Boolean(true),
                Amf0Value::Boolean(true),
            ],
        }
        .into_message_payload(RtmpTimestamp::new(0), stream_id)?;

        self.start_stream(StreamMode::Play, &stream_key, stream_id);
        let event = ServerSessionEvent::PlaybackStarted {
            app_name: self.app_name.clone().unwrap_or_default(),
            stream_key,
            stream_id,
        };

        Ok(vec![
            ServerSessionResult::OutboundResponse(begin),
            ServerSessionResult::OutboundResponse(reset),
            ServerSessionResult::OutboundResponse(start),
            ServerSessionResult::OutboundResponse(sample_access),
            ServerSessionResult::RaisedEvent(event),
        ])
    }

    fn handle_stream_closed(
        &mut self,
        command_name: &str,
    ) -> Result<Vec<ServerSessionResult>, ServerSessionError> {
        if !self.is_setup_complete() {
            debug!(command = command_name, "Ignoring close of a stream that was never started");
            return Ok(Vec::new());
        }

        let event = ServerSessionEvent::StreamFinished {
            stream_key: self.stream_key.take().unwrap_or_default(),
            stream_id: self.stream_id.unwrap_or(0),
        };

        self.mode = None;
        self.set_state(ServerState::AwaitPublishOrPlay);
        Ok(vec![ServerSessionResult::RaisedEvent(event)])
    }

    fn start_stream(&mut self, mode: StreamMode, stream_key: &str, stream_id: u32) {
        self.stream_key = Some(stream_key.to_string());
        self.stream_id = Some(stream_id);
        self.mode = Some(mode);
        self.set_state(match mode {
            StreamMode::Publish => ServerState::Publishing,
            StreamMode::Play => ServerState::Playing,
        });
    }

    fn expect_state(&self, expected: ServerState, command: &str) -> Result<(), ServerSessionError> {
        if self.state != expected {
            return Err(ServerSessionError::UnexpectedCommand {
                command: command.to_string(),
                state: self.state,
            });
        }

        Ok(())
    }

    fn set_state(&mut self, state: ServerState) {
        debug!(from = ?self.state, to = ?state, "Server session state changed");
        self.state = state;
    }
}

/// The stream name argument of `publish` and `play`.  It may be empty when the application
/// name alone identifies the stream.
fn read_stream_key(arguments: &[Amf0Value], command: &str) -> Result<String, ServerSessionError> {
    arguments
        .first()
        .and_then(Amf0Value::as_str)
        .map(|key| key.to_string())
        .ok_or_else(|| ServerSessionError::NoStreamKey {
            command: command.to_string(),
        })
}

fn command(
    command_name: &str,
    transaction_id: f64,
    command_object: Amf0Value,
    additional_arguments: Vec<Amf0Value>,
    message_stream_id: u32,
) -> Result<MessagePayload, ServerSessionError> {
    let payload = RtmpMessage::Amf0Command {
        command_name: command_name.to_string(),
        transaction_id,
        command_object,
        additional_arguments,
    }
    .into_message_payload(RtmpTimestamp::new(0), message_stream_id)?;

    Ok(payload)
}

fn on_status(info: StatusInfo, stream_id: u32) -> Result<MessagePayload, ServerSessionError> {
    command("onStatus", 0.0, Amf0Value::Null, vec![info.into_amf0()], stream_id)
}

fn stream_begin(stream_id: u32) -> Result<MessagePayload, ServerSessionError> {
    let payload = RtmpMessage::UserControl {
        event_type: UserControlEventType::StreamBegin,
        stream_id: Some(stream_id),
        buffer_length: None,
        timestamp: None,
    }
    .into_message_payload(RtmpTimestamp::new(0), 0)?;

    Ok(payload)
}
