/*!
Track level reading of a published or played stream.

`Reader::initialize()` reads from the connection until every track announced in the stream
metadata has been seen with its decoder configuration, or until `analyze_message_limit`
messages have been read.  Media consumed while doing so is replayed by `read()` in the order it
was received.
*/

use crate::connection::{Conn, ProtocolError, RtmpError};
use crate::media::{detect_codec, AccessUnit, MediaKind, Track, TrackError};
use crate::messages::{MessagePayload, RtmpMessage, AMF0_DATA_TYPE_ID};
use rtmp_amf0::Amf0Value;
use std::collections::{HashMap, HashSet, VecDeque};
use tracing::{debug, warn};

#[derive(Clone, Debug)]
pub struct ReaderConfig {
    /// Most messages read while looking for tracks before giving up on the missing ones
    pub analyze_message_limit: usize,
}

impl ReaderConfig {
    pub fn new() -> ReaderConfig {
        ReaderConfig {
            analyze_message_limit: 64,
        }
    }
}

impl Default for ReaderConfig {
    fn default() -> Self {
        ReaderConfig::new()
    }
}

#[derive(PartialEq, Debug)]
pub enum ReaderEvent {
    AccessUnit { kind: MediaKind, unit: AccessUnit },

    /// Stream metadata sent with `onMetaData`
    Metadata(HashMap<String, Amf0Value>),

    /// Any other message, handed over untouched
    Message(MessagePayload),
}

pub struct Reader<C> {
    conn: C,
    tracks: Vec<Track>,
    unsupported: HashSet<(u32, MediaKind)>,
    metadata: Option<HashMap<String, Amf0Value>>,
    replay: VecDeque<MessagePayload>,
}

impl<C: Conn> Reader<C> {
    pub fn initialize(conn: C, config: ReaderConfig) -> Result<Reader<C>, RtmpError> {
        let mut reader = Reader {
            conn,
            tracks: Vec::new(),
            unsupported: HashSet::new(),
            metadata: None,
            replay: VecDeque::new(),
        };

        let mut messages_read = 0;
        while !reader.all_tracks_found() && messages_read < config.analyze_message_limit {
            let message = reader.conn.read()?;
            messages_read += 1;

            if let Some(properties) = metadata_properties(&message) {
                reader.metadata = Some(properties);
                continue;
            }

            match MediaKind::from_type_id(message.type_id) {
                Some(kind) => reader.analyze_media(kind, message),
                None => reader.replay.push_back(message),
            }
        }

        if reader.tracks.is_empty() {
            return Err(ProtocolError::NoTracks {
                messages: messages_read,
            }
            .into());
        }

        debug!(
            tracks = ?reader.tracks.iter().map(Track::codec).collect::<Vec<_>>(),
            messages_read,
            "Reader initialized"
        );

        Ok(reader)
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    /// The track of the given kind, preferring the one on the connection's message stream
    pub fn track(&self, kind: MediaKind) -> Option<&Track> {
        let stream_id = self.conn.stream_id();
        self.tracks
            .iter()
            .find(|track| track.kind() == kind && track.message_stream_id() == stream_id)
            .or_else(|| self.tracks.iter().find(|track| track.kind() == kind))
    }

    /// The most recent stream metadata, if any was received
    pub fn metadata(&self) -> Option<&HashMap<String, Amf0Value>> {
        self.metadata.as_ref()
    }

    pub fn get_ref(&self) -> &C {
        &self.conn
    }

    pub fn into_inner(self) -> C {
        self.conn
    }

    /// Returns the next access unit or other message.  Errors framing a payload are returned
    /// as `RtmpError::Track` and leave the reader usable.
    pub fn read(&mut self) -> Result<ReaderEvent, RtmpError> {
        loop {
            let message = match self.replay.pop_front() {
                Some(message) => message,
                None => self.conn.read()?,
            };

            if let Some(properties) = metadata_properties(&message) {
                self.metadata = Some(properties.clone());
                return Ok(ReaderEvent::Metadata(properties));
            }

            let kind = match MediaKind::from_type_id(message.type_id) {
                Some(kind) => kind,
                None => return Ok(ReaderEvent::Message(message)),
            };

            let track = match self.track_index(message.message_stream_id, kind) {
                Some(index) => &mut self.tracks[index],
                None => {
                    let source = match detect_codec(kind, &message.data) {
                        Err(error) => error,
                        Ok(_) => TrackError::UntrackedPayload,
                    };

                    return Err(RtmpError::Track { kind, source });
                }
            };

            match track.decode(&message) {
                Ok(Some(unit)) => return Ok(ReaderEvent::AccessUnit { kind, unit }),
                Ok(None) => continue,
                Err(source) => return Err(RtmpError::Track { kind, source }),
            }
        }
    }

    fn all_tracks_found(&self) -> bool {
        let resolved = |kind: MediaKind| {
            self.unsupported.iter().any(|(_, unsupported)| *unsupported == kind)
                || self
                    .tracks
                    .iter()
                    .any(|track| track.kind() == kind && track.is_ready())
        };

        match &self.metadata {
            Some(properties) => {
                let has_video = properties.contains_key("videocodecid");
                let has_audio = properties.contains_key("audiocodecid");
                (has_video || has_audio)
                    && (!has_video || resolved(MediaKind::Video))
                    && (!has_audio || resolved(MediaKind::Audio))
            }

            None => resolved(MediaKind::Video) && resolved(MediaKind::Audio),
        }
    }

    /// Media is routed by message stream and kind
    fn track_index(&self, message_stream_id: u32, kind: MediaKind) -> Option<usize> {
        self.tracks.iter().position(|track| {
            track.kind() == kind && track.message_stream_id() == message_stream_id
        })
    }

    fn analyze_media(&mut self, kind: MediaKind, message: MessagePayload) {
        let route = (message.message_stream_id, kind);
        if self.unsupported.contains(&route) {
            return;
        }

        let index = match self.track_index(message.message_stream_id, kind) {
            Some(index) => index,
            None => match detect_codec(kind, &message.data) {
                Ok(codec) => {
                    debug!(?codec, "Found {} track", kind);
                    self.tracks.push(Track::new(codec, message.message_stream_id));
                    self.tracks.len() - 1
                }

                Err(error) => {
                    warn!(%kind, %error, "Ignoring track with unsupported codec");
                    self.unsupported.insert(route);
                    return;
                }
            },
        };

        // configuration packets are applied now, everything else is decoded when replayed
        match self.tracks[index].decode(&message) {
            Ok(None) => (),
            _ => self.replay.push_back(message),
        }
    }
}

/// Properties of an `onMetaData` data message, sent directly or wrapped in `@setDataFrame`
fn metadata_properties(message: &MessagePayload) -> Option<HashMap<String, Amf0Value>> {
    if message.type_id != AMF0_DATA_TYPE_ID {
        return None;
    }

    let values = match message.to_rtmp_message() {
        Ok(RtmpMessage::Amf0Data { values }) => values,
        _ => return None,
    };

    let mut values = values.into_iter().peekable();
    if values.peek().and_then(Amf0Value::as_str) == Some("@setDataFrame") {
        values.next();
    }

    if values.next()?.as_str() != Some("onMetaData") {
        return None;
    }

    values.next()?.get_object_properties()
}
