//! The one to five byte headers that open every audio and video message payload.
//!
//! Legacy headers identify the codec with a 4 bit id.  Enhanced RTMP headers set the high bit
//! of the video byte (or use sound format 9 for audio) and follow it with a FourCC.

use super::{Codec, TrackError};

pub const AVC_CODEC_ID: u8 = 7;
pub const HEVC_CODEC_ID: u8 = 12;

pub const SOUND_FORMAT_MP3: u8 = 2;
pub const SOUND_FORMAT_LPCM_LITTLE_ENDIAN: u8 = 3;
pub const SOUND_FORMAT_G711_A_LAW: u8 = 7;
pub const SOUND_FORMAT_G711_MU_LAW: u8 = 8;
pub const SOUND_FORMAT_EX_HEADER: u8 = 9;
pub const SOUND_FORMAT_AAC: u8 = 10;

pub const AVC_FOURCC: [u8; 4] = *b"avc1";
pub const HEVC_FOURCC: [u8; 4] = *b"hvc1";
pub const AV1_FOURCC: [u8; 4] = *b"av01";
pub const VP9_FOURCC: [u8; 4] = *b"vp09";
pub const OPUS_FOURCC: [u8; 4] = *b"Opus";
pub const AC3_FOURCC: [u8; 4] = *b"ac-3";

const EX_VIDEO_HEADER_FLAG: u8 = 0x80;
const KEY_FRAME_TYPE: u8 = 1;
const INTER_FRAME_TYPE: u8 = 2;

/// Packet types shared by the legacy AVC/HEVC packet type byte and the enhanced header.
/// Legacy headers only use the first three.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum PacketType {
    SequenceStart,
    CodedFrames,
    SequenceEnd,

    /// Coded frames without a composition time field
    CodedFramesX,
}

impl PacketType {
    fn from_u8(codec: Codec, value: u8) -> Result<PacketType, TrackError> {
        match value {
            0 => Ok(PacketType::SequenceStart),
            1 => Ok(PacketType::CodedFrames),
            2 => Ok(PacketType::SequenceEnd),
            3 => Ok(PacketType::CodedFramesX),
            _ => Err(TrackError::UnknownPacketType {
                codec,
                packet_type: value,
            }),
        }
    }

    fn to_u8(self) -> u8 {
        match self {
            PacketType::SequenceStart => 0,
            PacketType::CodedFrames => 1,
            PacketType::SequenceEnd => 2,
            PacketType::CodedFramesX => 3,
        }
    }
}

#[derive(PartialEq, Debug, Clone)]
pub struct VideoTagHeader {
    pub codec: Codec,
    pub enhanced: bool,

    /// The raw 3 bit frame type
    pub frame_type: u8,
    pub keyframe: bool,
    pub packet_type: PacketType,

    /// Bytes taken by the header, the legacy packet type byte included
    pub length: usize,
}

pub fn read_video_header(payload: &[u8]) -> Result<VideoTagHeader, TrackError> {
    let first = match payload.first() {
        Some(byte) => *byte,
        None => {
            return Err(TrackError::UnsupportedCodec {
                kind: "video",
                id: "<empty payload>".to_string(),
            })
        }
    };

    let frame_type = (first >> 4) & 0x07;
    let keyframe = frame_type == KEY_FRAME_TYPE;
    if first & EX_VIDEO_HEADER_FLAG != 0 {
        if payload.len() < 5 {
            return Err(TrackError::UnsupportedCodec {
                kind: "video",
                id: "<truncated fourcc>".to_string(),
            });
        }

        let codec = match &payload[1..5] {
            fourcc if fourcc == AVC_FOURCC => Codec::H264,
            fourcc if fourcc == HEVC_FOURCC => Codec::H265,
            fourcc if fourcc == AV1_FOURCC => Codec::Av1,
            fourcc if fourcc == VP9_FOURCC => Codec::Vp9,
            fourcc => {
                return Err(TrackError::UnsupportedCodec {
                    kind: "video",
                    id: String::from_utf8_lossy(fourcc).into_owned(),
                })
            }
        };

        return Ok(VideoTagHeader {
            codec,
            enhanced: true,
            frame_type,
            keyframe,
            packet_type: PacketType::from_u8(codec, first & 0x0F)?,
            length: 5,
        });
    }

    let codec = match first & 0x0F {
        AVC_CODEC_ID => Codec::H264,
        HEVC_CODEC_ID => Codec::H265,
        id => {
            return Err(TrackError::UnsupportedCodec {
                kind: "video",
                id: id.to_string(),
            })
        }
    };

    if payload.len() < 2 {
        return Err(TrackError::PayloadTooShort {
            codec,
            length: payload.len(),
        });
    }

    let packet_type = match PacketType::from_u8(codec, payload[1])? {
        PacketType::CodedFramesX => {
            return Err(TrackError::UnknownPacketType {
                codec,
                packet_type: payload[1],
            })
        }
        packet_type => packet_type,
    };

    Ok(VideoTagHeader {
        codec,
        enhanced: false,
        frame_type,
        keyframe,
        packet_type,
        length: 2,
    })
}

/// The shape of the video headers a peer sends on a track.  Payloads re-encoded from a
/// decoded access unit keep that shape, so they come out byte for byte as received.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub struct VideoHeaderForm {
    pub enhanced: bool,

    /// Frame type of the most recent coded frame
    pub frame_type: u8,

    /// Coded frames without a composition time are sent as `CodedFramesX`
    pub compact: bool,
}

impl VideoHeaderForm {
    /// Legacy headers for H.264, enhanced headers with `CodedFramesX` for every other codec
    pub fn new(codec: Codec) -> VideoHeaderForm {
        let enhanced = codec != Codec::H264;
        VideoHeaderForm {
            enhanced,
            frame_type: INTER_FRAME_TYPE,
            compact: enhanced,
        }
    }

    pub fn observe(&mut self, header: &VideoTagHeader) {
        self.enhanced = header.enhanced;
        match header.packet_type {
            PacketType::CodedFrames => {
                self.frame_type = header.frame_type;
                self.compact = false;
            }

            PacketType::CodedFramesX => {
                self.frame_type = header.frame_type;
                self.compact = true;
            }

            PacketType::SequenceStart | PacketType::SequenceEnd => (),
        }
    }

    /// The last seen frame type if it agrees with `keyframe`, otherwise the plain key or
    /// inter frame type
    pub fn frame_type_for(&self, keyframe: bool) -> u8 {
        match (self.frame_type == KEY_FRAME_TYPE, keyframe) {
            (was_key, is_key) if was_key == is_key => self.frame_type,
            (_, true) => KEY_FRAME_TYPE,
            (_, false) => INTER_FRAME_TYPE,
        }
    }

    /// Sequence start packets are always sent as key frames
    pub fn write_sequence_start(&self, buffer: &mut Vec<u8>, codec: Codec) {
        write_video_header(
            buffer,
            codec,
            self.enhanced,
            KEY_FRAME_TYPE,
            PacketType::SequenceStart,
        );
    }
}

/// Writes an enhanced header with the codec's FourCC, or a legacy header with its codec id.
/// Only H.264 and H.265 have a legacy form.
pub fn write_video_header(
    buffer: &mut Vec<u8>,
    codec: Codec,
    enhanced: bool,
    frame_type: u8,
    packet_type: PacketType,
) {
    let frame_type = frame_type & 0x07;
    let legacy_id = match codec {
        Codec::H264 => Some(AVC_CODEC_ID),
        Codec::H265 => Some(HEVC_CODEC_ID),
        _ => None,
    };

    match (enhanced, legacy_id) {
        (false, Some(codec_id)) => {
            buffer.push((frame_type << 4) | codec_id);
            buffer.push(packet_type.to_u8());
        }

        _ => {
            buffer.push(EX_VIDEO_HEADER_FLAG | (frame_type << 4) | packet_type.to_u8());
            buffer.extend_from_slice(&codec.fourcc().unwrap_or([0; 4]));
        }
    }
}

#[derive(PartialEq, Debug, Clone)]
pub struct AudioTagHeader {
    pub codec: Codec,

    /// The complete first byte, carrying sample rate, size and channel flags for legacy formats
    pub flags: u8,

    /// Only AAC and enhanced headers carry a packet type
    pub packet_type: Option<PacketType>,
    pub length: usize,
}

pub fn read_audio_header(payload: &[u8]) -> Result<AudioTagHeader, TrackError> {
    let first = match payload.first() {
        Some(byte) => *byte,
        None => {
            return Err(TrackError::UnsupportedCodec {
                kind: "audio",
                id: "<empty payload>".to_string(),
            })
        }
    };

    let sound_format = first >> 4;
    let codec = match sound_format {
        SOUND_FORMAT_AAC => Codec::Aac,
        SOUND_FORMAT_MP3 => Codec::Mpeg1Audio,
        SOUND_FORMAT_LPCM_LITTLE_ENDIAN => Codec::Lpcm,
        SOUND_FORMAT_G711_A_LAW => Codec::G711ALaw,
        SOUND_FORMAT_G711_MU_LAW => Codec::G711MuLaw,
        SOUND_FORMAT_EX_HEADER => {
            if payload.len() < 5 {
                return Err(TrackError::UnsupportedCodec {
                    kind: "audio",
                    id: "<truncated fourcc>".to_string(),
                });
            }

            let codec = match &payload[1..5] {
                fourcc if fourcc == OPUS_FOURCC => Codec::Opus,
                fourcc if fourcc == AC3_FOURCC => Codec::Ac3,
                fourcc => {
                    return Err(TrackError::UnsupportedCodec {
                        kind: "audio",
                        id: String::from_utf8_lossy(fourcc).into_owned(),
                    })
                }
            };

            let packet_type = match PacketType::from_u8(codec, first & 0x0F)? {
                PacketType::CodedFramesX => {
                    return Err(TrackError::UnknownPacketType {
                        codec,
                        packet_type: first & 0x0F,
                    })
                }
                packet_type => packet_type,
            };

            return Ok(AudioTagHeader {
                codec,
                flags: first,
                packet_type: Some(packet_type),
                length: 5,
            });
        }

        id => {
            return Err(TrackError::UnsupportedCodec {
                kind: "audio",
                id: id.to_string(),
            })
        }
    };

    if codec != Codec::Aac {
        return Ok(AudioTagHeader {
            codec,
            flags: first,
            packet_type: None,
            length: 1,
        });
    }

    let packet_type = match payload.get(1) {
        Some(0) => PacketType::SequenceStart,
        Some(1) => PacketType::CodedFrames,
        Some(value) => {
            return Err(TrackError::UnknownPacketType {
                codec,
                packet_type: *value,
            })
        }
        None => {
            return Err(TrackError::PayloadTooShort {
                codec,
                length: payload.len(),
            })
        }
    };

    Ok(AudioTagHeader {
        codec,
        flags: first,
        packet_type: Some(packet_type),
        length: 2,
    })
}

/// Writes the audio header.  `flags` is the first byte of a legacy header and is ignored for
/// enhanced codecs.
pub fn write_audio_header(
    buffer: &mut Vec<u8>,
    codec: Codec,
    flags: u8,
    packet_type: PacketType,
) {
    match codec {
        Codec::Opus | Codec::Ac3 => {
            buffer.push((SOUND_FORMAT_EX_HEADER << 4) | packet_type.to_u8());
            buffer.extend_from_slice(&codec.fourcc().unwrap_or([0; 4]));
        }

        Codec::Aac => {
            buffer.push(flags);
            buffer.push(packet_type.to_u8());
        }

        _ => buffer.push(flags),
    }
}

/// The first byte sent for legacy audio formats when no header was received to copy it from
pub fn default_audio_flags(codec: Codec) -> u8 {
    match codec {
        // 44 kHz, 16 bit, stereo
        Codec::Aac => (SOUND_FORMAT_AAC << 4) | 0x0F,
        Codec::Mpeg1Audio => (SOUND_FORMAT_MP3 << 4) | 0x0F,
        Codec::Lpcm => (SOUND_FORMAT_LPCM_LITTLE_ENDIAN << 4) | 0x0F,

        // 8 kHz mono is signalled with the lowest rate bits
        Codec::G711ALaw => (SOUND_FORMAT_G711_A_LAW << 4) | 0x02,
        Codec::G711MuLaw => (SOUND_FORMAT_G711_MU_LAW << 4) | 0x02,
        _ => SOUND_FORMAT_EX_HEADER << 4,
    }
}
