/*!
Conversion between audio/video message payloads and codec access units.

Each track owns a `TrackFramer` for its codec.  Decoding a payload either yields an
`AccessUnit` or, for sequence start packets, stores the decoder configuration so it can be
exposed through `Track::config()` and re-sent ahead of the first access unit by a writer.

Failures are reported as `TrackError` and only concern the track they happened on.

```
use bytes::Bytes;
use rtmp_engine::media::{AccessUnit, Codec, Track};
use rtmp_engine::time::RtmpTimestamp;

let track = Track::new(Codec::H264, 1);
let unit = AccessUnit {
    pts: RtmpTimestamp::new(100),
    dts: RtmpTimestamp::new(90),
    keyframe: true,
    units: vec![Bytes::from_static(&[0x65, 0x88])],
};

let payload = track.encode(&unit).unwrap();
assert_eq!(payload.timestamp, RtmpTimestamp::new(90));

let mut receiver = Track::new(Codec::H264, 1);
assert_eq!(receiver.decode(&payload).unwrap(), Some(unit));
```
*/

mod audio;
mod av1;
mod avc;
mod errors;
mod tags;
mod vp9;

pub use self::audio::AudioFramer;
pub use self::av1::Av1Framer;
pub use self::avc::AvcFramer;
pub use self::errors::TrackError;
pub use self::vp9::Vp9Framer;

use crate::messages::{
    MessagePayload, AUDIO_CHUNK_STREAM_ID, AUDIO_TYPE_ID, VIDEO_CHUNK_STREAM_ID, VIDEO_TYPE_ID,
};
use crate::time::RtmpTimestamp;
use bytes::Bytes;
use std::fmt;

#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash)]
pub enum MediaKind {
    Video,
    Audio,
}

impl MediaKind {
    /// The kind of media carried by a message type, if any
    pub fn from_type_id(type_id: u8) -> Option<MediaKind> {
        match type_id {
            VIDEO_TYPE_ID => Some(MediaKind::Video),
            AUDIO_TYPE_ID => Some(MediaKind::Audio),
            _ => None,
        }
    }

    pub fn type_id(self) -> u8 {
        match self {
            MediaKind::Video => VIDEO_TYPE_ID,
            MediaKind::Audio => AUDIO_TYPE_ID,
        }
    }

    fn chunk_stream_id(self) -> u32 {
        match self {
            MediaKind::Video => VIDEO_CHUNK_STREAM_ID,
            MediaKind::Audio => AUDIO_CHUNK_STREAM_ID,
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaKind::Video => write!(f, "video"),
            MediaKind::Audio => write!(f, "audio"),
        }
    }
}

/// Every codec the framers know how to carry
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash)]
pub enum Codec {
    H264,
    H265,
    Av1,
    Vp9,
    Aac,
    Mpeg1Audio,
    G711ALaw,
    G711MuLaw,
    Lpcm,
    Opus,
    Ac3,
}

impl Codec {
    pub fn kind(self) -> MediaKind {
        match self {
            Codec::H264 | Codec::H265 | Codec::Av1 | Codec::Vp9 => MediaKind::Video,
            _ => MediaKind::Audio,
        }
    }

    /// The Enhanced RTMP identifier of the codec, for codecs that have one
    pub fn fourcc(self) -> Option<[u8; 4]> {
        match self {
            Codec::H264 => Some(tags::AVC_FOURCC),
            Codec::H265 => Some(tags::HEVC_FOURCC),
            Codec::Av1 => Some(tags::AV1_FOURCC),
            Codec::Vp9 => Some(tags::VP9_FOURCC),
            Codec::Opus => Some(tags::OPUS_FOURCC),
            Codec::Ac3 => Some(tags::AC3_FOURCC),
            _ => None,
        }
    }

    /// The `videocodecid`/`audiocodecid` value announced in stream metadata
    pub fn metadata_id(self) -> f64 {
        match self {
            Codec::H264 => tags::AVC_CODEC_ID as f64,
            Codec::Aac => tags::SOUND_FORMAT_AAC as f64,
            Codec::Mpeg1Audio => tags::SOUND_FORMAT_MP3 as f64,
            Codec::Lpcm => tags::SOUND_FORMAT_LPCM_LITTLE_ENDIAN as f64,
            Codec::G711ALaw => tags::SOUND_FORMAT_G711_A_LAW as f64,
            Codec::G711MuLaw => tags::SOUND_FORMAT_G711_MU_LAW as f64,
            _ => match self.fourcc() {
                Some(fourcc) => u32::from_be_bytes(fourcc) as f64,
                None => 0.0,
            },
        }
    }

    /// Whether a decoder for this codec needs a sequence start packet before any frame
    pub fn requires_config(self) -> bool {
        match self {
            Codec::H264 | Codec::H265 | Codec::Av1 | Codec::Aac => true,
            _ => false,
        }
    }
}

/// Identifies the codec of an audio or video payload from its header
pub fn detect_codec(kind: MediaKind, payload: &[u8]) -> Result<Codec, TrackError> {
    match kind {
        MediaKind::Video => Ok(tags::read_video_header(payload)?.codec),
        MediaKind::Audio => Ok(tags::read_audio_header(payload)?.codec),
    }
}

/// A decoded unit of media: the NAL units of one picture, the OBUs of one temporal unit, or a
/// single audio frame.  Audio access units always hold exactly one unit and have `pts == dts`.
#[derive(PartialEq, Debug, Clone)]
pub struct AccessUnit {
    pub pts: RtmpTimestamp,
    pub dts: RtmpTimestamp,
    pub keyframe: bool,
    pub units: Vec<Bytes>,
}

impl AccessUnit {
    fn composition_time(&self) -> Result<i32, TrackError> {
        let offset = self.pts.signed_delta_from(self.dts);
        if offset < -(1 << 23) || offset >= (1 << 23) {
            return Err(TrackError::CompositionTimeOutOfRange(offset));
        }

        Ok(offset as i32)
    }

    fn single_unit(&self) -> Result<&Bytes, TrackError> {
        match self.units.as_slice() {
            [unit] => Ok(unit),
            _ => Err(TrackError::InvalidAccessUnit {
                reason: "exactly one unit is required",
            }),
        }
    }
}

/// Per-codec payload framing, one variant per codec family
#[derive(Debug, Clone)]
pub enum TrackFramer {
    Avc(AvcFramer),
    Av1(Av1Framer),
    Vp9(Vp9Framer),
    Audio(AudioFramer),
}

impl TrackFramer {
    pub fn new(codec: Codec) -> TrackFramer {
        match codec {
            Codec::H264 | Codec::H265 => TrackFramer::Avc(AvcFramer::new(codec)),
            Codec::Av1 => TrackFramer::Av1(Av1Framer::new()),
            Codec::Vp9 => TrackFramer::Vp9(Vp9Framer::new()),
            _ => TrackFramer::Audio(AudioFramer::new(codec)),
        }
    }

    pub fn codec(&self) -> Codec {
        match self {
            TrackFramer::Avc(framer) => framer.codec(),
            TrackFramer::Av1(_) => Codec::Av1,
            TrackFramer::Vp9(_) => Codec::Vp9,
            TrackFramer::Audio(framer) => framer.codec(),
        }
    }

    pub fn config(&self) -> Option<&Bytes> {
        match self {
            TrackFramer::Avc(framer) => framer.config.as_ref(),
            TrackFramer::Av1(framer) => framer.config.as_ref(),
            TrackFramer::Vp9(framer) => framer.config.as_ref(),
            TrackFramer::Audio(framer) => framer.config.as_ref(),
        }
    }

    pub fn set_config(&mut self, config: Bytes) {
        match self {
            TrackFramer::Avc(framer) => framer.config = Some(config),
            TrackFramer::Av1(framer) => framer.config = Some(config),
            TrackFramer::Vp9(framer) => framer.config = Some(config),
            TrackFramer::Audio(framer) => framer.config = Some(config),
        }
    }

    /// Decodes one payload received at `timestamp`.  Sequence start and end packets update
    /// the framer's state and yield `None`.
    pub fn decode(
        &mut self,
        timestamp: RtmpTimestamp,
        payload: &Bytes,
    ) -> Result<Option<AccessUnit>, TrackError> {
        match self {
            TrackFramer::Avc(framer) => framer.decode(timestamp, payload),
            TrackFramer::Av1(framer) => framer.decode(timestamp, payload),
            TrackFramer::Vp9(framer) => framer.decode(timestamp, payload),
            TrackFramer::Audio(framer) => framer.decode(timestamp, payload),
        }
    }

    /// Encodes an access unit into a payload to be sent with the unit's dts as timestamp
    pub fn encode(&self, unit: &AccessUnit) -> Result<Bytes, TrackError> {
        match self {
            TrackFramer::Avc(framer) => framer.encode(unit),
            TrackFramer::Av1(framer) => framer.encode(unit),
            TrackFramer::Vp9(framer) => framer.encode(unit),
            TrackFramer::Audio(framer) => framer.encode(unit),
        }
    }

    /// The sequence start payload carrying the stored configuration, if there is one
    pub fn encode_config(&self) -> Option<Bytes> {
        match self {
            TrackFramer::Avc(framer) => framer.encode_config(),
            TrackFramer::Av1(framer) => framer.encode_config(),
            TrackFramer::Vp9(framer) => framer.encode_config(),
            TrackFramer::Audio(framer) => framer.encode_config(),
        }
    }
}

/// A single audio or video track of a stream
#[derive(Debug, Clone)]
pub struct Track {
    message_stream_id: u32,
    framer: TrackFramer,
}

impl Track {
    pub fn new(codec: Codec, message_stream_id: u32) -> Track {
        Track {
            message_stream_id,
            framer: TrackFramer::new(codec),
        }
    }

    /// Creates a track whose decoder configuration is already known, as when publishing
    pub fn with_config(codec: Codec, message_stream_id: u32, config: Bytes) -> Track {
        let mut track = Track::new(codec, message_stream_id);
        track.framer.set_config(config);
        track
    }

    pub fn codec(&self) -> Codec {
        self.framer.codec()
    }

    /// The same track, carried on another message stream
    pub fn with_message_stream_id(mut self, message_stream_id: u32) -> Track {
        self.message_stream_id = message_stream_id;
        self
    }

    pub fn kind(&self) -> MediaKind {
        self.codec().kind()
    }

    pub fn message_stream_id(&self) -> u32 {
        self.message_stream_id
    }

    /// The decoder configuration from the most recent sequence start packet
    pub fn config(&self) -> Option<&Bytes> {
        self.framer.config()
    }

    /// Whether the track has everything a decoder needs to start
    pub fn is_ready(&self) -> bool {
        !self.codec().requires_config() || self.config().is_some()
    }

    pub fn framer(&self) -> &TrackFramer {
        &self.framer
    }

    pub fn decode(&mut self, payload: &MessagePayload) -> Result<Option<AccessUnit>, TrackError> {
        self.framer.decode(payload.timestamp, &payload.data)
    }

    pub fn encode(&self, unit: &AccessUnit) -> Result<MessagePayload, TrackError> {
        let data = self.framer.encode(unit)?;
        Ok(self.payload(unit.dts, data))
    }

    /// The message announcing the track's configuration, sent before its first access unit
    pub fn encode_config(&self, timestamp: RtmpTimestamp) -> Option<MessagePayload> {
        self.framer
            .encode_config()
            .map(|data| self.payload(timestamp, data))
    }

    fn payload(&self, timestamp: RtmpTimestamp, data: Bytes) -> MessagePayload {
        let kind = self.kind();
        MessagePayload {
            chunk_stream_id: kind.chunk_stream_id(),
            timestamp,
            type_id: kind.type_id(),
            message_stream_id: self.message_stream_id,
            data,
        }
    }
}
