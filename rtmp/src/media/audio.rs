//! Audio payloads.  Every format carries exactly one frame per message behind its header.

use super::tags::{default_audio_flags, read_audio_header, write_audio_header, PacketType};
use super::{AccessUnit, Codec, TrackError};
use crate::time::RtmpTimestamp;
use bytes::Bytes;

#[derive(Debug, Clone)]
pub struct AudioFramer {
    codec: Codec,

    /// First header byte of legacy formats, copied from the last received payload
    flags: u8,
    pub(super) config: Option<Bytes>,
}

impl AudioFramer {
    pub fn new(codec: Codec) -> AudioFramer {
        AudioFramer {
            codec,
            flags: default_audio_flags(codec),
            config: None,
        }
    }

    pub fn codec(&self) -> Codec {
        self.codec
    }

    pub fn decode(
        &mut self,
        timestamp: RtmpTimestamp,
        payload: &Bytes,
    ) -> Result<Option<AccessUnit>, TrackError> {
        let header = read_audio_header(payload)?;
        if header.codec != self.codec {
            return Err(TrackError::CodecMismatch {
                expected: self.codec,
                received: header.codec,
            });
        }

        if header.length == 1 || self.codec == Codec::Aac {
            self.flags = header.flags;
        }

        let body = payload.slice(header.length..);
        match header.packet_type {
            Some(PacketType::SequenceStart) => {
                self.config = Some(body);
                Ok(None)
            }

            Some(PacketType::SequenceEnd) => Ok(None),

            _ => Ok(Some(AccessUnit {
                pts: timestamp,
                dts: timestamp,
                keyframe: true,
                units: vec![body],
            })),
        }
    }

    pub fn encode(&self, unit: &AccessUnit) -> Result<Bytes, TrackError> {
        let frame = unit.single_unit()?;
        let mut buffer = Vec::with_capacity(frame.len() + 5);
        write_audio_header(&mut buffer, self.codec, self.flags, PacketType::CodedFrames);
        buffer.extend_from_slice(frame);
        Ok(Bytes::from(buffer))
    }

    /// Only AAC, Opus and AC-3 have a sequence start packet
    pub fn encode_config(&self) -> Option<Bytes> {
        match self.codec {
            Codec::Aac | Codec::Opus | Codec::Ac3 => (),
            _ => return None,
        }

        let config = self.config.as_ref()?;
        let mut buffer = Vec::with_capacity(config.len() + 5);
        write_audio_header(&mut buffer, self.codec, self.flags, PacketType::SequenceStart);
        buffer.extend_from_slice(config);
        Some(Bytes::from(buffer))
    }
}
