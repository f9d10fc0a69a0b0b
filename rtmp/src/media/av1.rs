//! AV1 temporal units sent with the `av01` enhanced header.  The payload holds the OBUs of
//! one temporal unit back to back, each carrying its own size field.

use super::tags::{read_video_header, write_video_header, PacketType, VideoHeaderForm};
use super::{AccessUnit, Codec, TrackError};
use crate::time::RtmpTimestamp;
use bytes::Bytes;

const OBU_EXTENSION_FLAG: u8 = 0x04;
const OBU_HAS_SIZE_FIELD: u8 = 0x02;
const OBU_FORBIDDEN_BIT: u8 = 0x80;

#[derive(Debug, Clone)]
pub struct Av1Framer {
    form: VideoHeaderForm,
    pub(super) config: Option<Bytes>,
}

impl Default for Av1Framer {
    fn default() -> Self {
        Av1Framer::new()
    }
}

impl Av1Framer {
    pub fn new() -> Av1Framer {
        Av1Framer {
            form: VideoHeaderForm::new(Codec::Av1),
            config: None,
        }
    }

    pub fn decode(
        &mut self,
        timestamp: RtmpTimestamp,
        payload: &Bytes,
    ) -> Result<Option<AccessUnit>, TrackError> {
        let header = read_video_header(payload)?;
        if header.codec != Codec::Av1 {
            return Err(TrackError::CodecMismatch {
                expected: Codec::Av1,
                received: header.codec,
            });
        }

        self.form.observe(&header);
        let body = payload.slice(header.length..);
        match header.packet_type {
            PacketType::SequenceStart => {
                self.config = Some(body);
                Ok(None)
            }

            PacketType::SequenceEnd => Ok(None),

            PacketType::CodedFrames | PacketType::CodedFramesX => Ok(Some(AccessUnit {
                pts: timestamp,
                dts: timestamp,
                keyframe: header.keyframe,
                units: split_obus(&body)?,
            })),
        }
    }

    pub fn encode(&self, unit: &AccessUnit) -> Result<Bytes, TrackError> {
        let mut buffer = Vec::new();
        write_video_header(
            &mut buffer,
            Codec::Av1,
            true,
            self.form.frame_type_for(unit.keyframe),
            self.coded_frames_type(),
        );

        for (index, obu) in unit.units.iter().enumerate() {
            let has_size = obu.first().map_or(false, |b| b & OBU_HAS_SIZE_FIELD != 0);
            if !has_size && index + 1 != unit.units.len() {
                return Err(TrackError::InvalidAccessUnit {
                    reason: "only the last OBU of a temporal unit may omit its size field",
                });
            }

            buffer.extend_from_slice(obu);
        }

        Ok(Bytes::from(buffer))
    }

    pub fn encode_config(&self) -> Option<Bytes> {
        let config = self.config.as_ref()?;
        let mut buffer = Vec::with_capacity(config.len() + 5);
        self.form.write_sequence_start(&mut buffer, Codec::Av1);
        buffer.extend_from_slice(config);
        Some(Bytes::from(buffer))
    }

    /// Neither packet type carries a composition time, the peer's choice is kept
    fn coded_frames_type(&self) -> PacketType {
        if self.form.compact {
            PacketType::CodedFramesX
        } else {
            PacketType::CodedFrames
        }
    }
}

/// Splits a temporal unit into whole OBUs, headers included.  An OBU without a size field
/// runs to the end of the data.
fn split_obus(data: &Bytes) -> Result<Vec<Bytes>, TrackError> {
    let mut obus = Vec::new();
    let mut position = 0;
    while position < data.len() {
        let header = data[position];
        if header & OBU_FORBIDDEN_BIT != 0 {
            return Err(TrackError::MalformedObu {
                reason: "forbidden bit is set",
            });
        }

        let mut header_length = 1;
        if header & OBU_EXTENSION_FLAG != 0 {
            header_length += 1;
        }

        if position + header_length > data.len() {
            return Err(TrackError::MalformedObu {
                reason: "header is truncated",
            });
        }

        let end = if header & OBU_HAS_SIZE_FIELD != 0 {
            let (size, size_length) = read_leb128(&data[position + header_length..])?;
            let payload_start = position + header_length + size_length;
            let remaining = data.len() - payload_start;
            if size > remaining as u64 {
                return Err(TrackError::UnitLengthOverflow {
                    length: size as usize,
                    remaining,
                });
            }

            payload_start + size as usize
        } else {
            data.len()
        };

        obus.push(data.slice(position..end));
        position = end;
    }

    Ok(obus)
}

/// Returns the value and the number of bytes it was encoded in
fn read_leb128(data: &[u8]) -> Result<(u64, usize), TrackError> {
    let mut value = 0_u64;
    for (index, byte) in data.iter().take(8).enumerate() {
        value |= ((byte & 0x7F) as u64) << (index * 7);
        if byte & 0x80 == 0 {
            return Ok((value, index + 1));
        }
    }

    Err(TrackError::MalformedObu {
        reason: "size field is truncated or longer than 8 bytes",
    })
}
