//! Track level writing of a stream: metadata and sequence headers first, then access units.

use crate::connection::{Conn, ProtocolError, RtmpError};
use crate::media::{AccessUnit, MediaKind, Track};
use crate::messages::RtmpMessage;
use crate::time::RtmpTimestamp;
use rtmp_amf0::Amf0Value;
use std::collections::HashMap;
use tracing::debug;

pub struct Writer<C> {
    conn: C,
    tracks: Vec<Track>,
}

impl<C: Conn> Writer<C> {
    /// Announces the tracks with an `onMetaData` message and sends the sequence start packet
    /// of every track whose configuration is known.  The tracks are moved onto the
    /// connection's message stream.
    pub fn initialize(mut conn: C, tracks: Vec<Track>) -> Result<Writer<C>, RtmpError> {
        let stream_id = conn.stream_id();
        let tracks: Vec<Track> = tracks
            .into_iter()
            .map(|track| track.with_message_stream_id(stream_id))
            .collect();

        let metadata = RtmpMessage::Amf0Data {
            values: vec![
                Amf0Value::Utf8String("@setDataFrame".to_string()),
                Amf0Value::Utf8String("onMetaData".to_string()),
                Amf0Value::EcmaArray(metadata_properties(&tracks)),
            ],
        }
        .into_message_payload(RtmpTimestamp::new(0), stream_id)?;

        conn.write(&metadata)?;
        for track in &tracks {
            if let Some(config) = track.encode_config(RtmpTimestamp::new(0)) {
                conn.write(&config)?;
            }
        }

        debug!(
            tracks = ?tracks.iter().map(Track::codec).collect::<Vec<_>>(),
            stream_id,
            "Writer initialized"
        );

        Ok(Writer { conn, tracks })
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn get_ref(&self) -> &C {
        &self.conn
    }

    pub fn into_inner(self) -> C {
        self.conn
    }

    /// Sends an access unit of the announced track with the same codec as `track`
    pub fn write(&mut self, track: &Track, unit: &AccessUnit) -> Result<(), RtmpError> {
        let kind = track.kind();
        let announced = self
            .tracks
            .iter()
            .find(|announced| announced.codec() == track.codec())
            .ok_or(ProtocolError::TrackNotAnnounced { kind })?;

        let message = announced
            .encode(unit)
            .map_err(|source| RtmpError::Track { kind, source })?;

        self.conn.write(&message)
    }
}

fn metadata_properties(tracks: &[Track]) -> HashMap<String, Amf0Value> {
    let mut properties = HashMap::new();
    for track in tracks {
        let name = match track.kind() {
            MediaKind::Video => "videocodecid",
            MediaKind::Audio => "audiocodecid",
        };

        properties.insert(
            name.to_string(),
            Amf0Value::Number(track.codec().metadata_id()),
        );
    }

    properties
}
