//! H.264 and H.265 payloads: a video header, an optional signed 24 bit composition time and
//! NAL units each prefixed with a 4 byte big endian length.

use super::tags::{read_video_header, write_video_header, PacketType, VideoHeaderForm};
use super::{AccessUnit, Codec, TrackError};
use crate::time::RtmpTimestamp;
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use bytes::Bytes;
use std::io::Cursor;

const NAL_LENGTH_SIZE: usize = 4;

#[derive(Debug, Clone)]
pub struct AvcFramer {
    codec: Codec,
    form: VideoHeaderForm,
    pub(super) config: Option<Bytes>,
}

impl AvcFramer {
    pub fn new(codec: Codec) -> AvcFramer {
        AvcFramer {
            codec,
            form: VideoHeaderForm::new(codec),
            config: None,
        }
    }

    pub fn codec(&self) -> Codec {
        self.codec
    }

    /// Accepts legacy headers for both codecs as well as `avc1` and `hvc1` enhanced headers
    pub fn decode(
        &mut self,
        timestamp: RtmpTimestamp,
        payload: &Bytes,
    ) -> Result<Option<AccessUnit>, TrackError> {
        let header = read_video_header(payload)?;
        if header.codec != self.codec {
            return Err(TrackError::CodecMismatch {
                expected: self.codec,
                received: header.codec,
            });
        }

        self.form.observe(&header);
        let has_composition_time =
            !header.enhanced || header.packet_type == PacketType::CodedFrames;

        let mut body_start = header.length;
        let mut composition_time = 0;
        if has_composition_time {
            if payload.len() < body_start + 3 {
                return Err(TrackError::PayloadTooShort {
                    codec: self.codec,
                    length: payload.len(),
                });
            }

            let mut cursor = Cursor::new(&payload[body_start..body_start + 3]);
            composition_time = cursor.read_i24::<BigEndian>()?;
            body_start += 3;
        }

        let body = payload.slice(body_start..);
        match header.packet_type {
            PacketType::SequenceStart => {
                self.config = Some(body);
                Ok(None)
            }

            PacketType::SequenceEnd => Ok(None),

            PacketType::CodedFrames | PacketType::CodedFramesX => Ok(Some(AccessUnit {
                pts: RtmpTimestamp::new(timestamp.value.wrapping_add(composition_time as u32)),
                dts: timestamp,
                keyframe: header.keyframe,
                units: split_length_prefixed(&body)?,
            })),
        }
    }

    /// Payloads follow the header form last received on the track.  Until one is received,
    /// H.264 is sent with the legacy header and H.265 with the `hvc1` enhanced header, which
    /// drops the composition time field when it is zero.
    pub fn encode(&self, unit: &AccessUnit) -> Result<Bytes, TrackError> {
        let composition_time = unit.composition_time()?;
        let packet_type = if self.form.enhanced && self.form.compact && composition_time == 0 {
            PacketType::CodedFramesX
        } else {
            PacketType::CodedFrames
        };

        let body_length: usize = unit
            .units
            .iter()
            .map(|nal| nal.len() + NAL_LENGTH_SIZE)
            .sum();

        let mut buffer = Vec::with_capacity(8 + body_length);
        write_video_header(
            &mut buffer,
            self.codec,
            self.form.enhanced,
            self.form.frame_type_for(unit.keyframe),
            packet_type,
        );

        if packet_type == PacketType::CodedFrames {
            buffer.write_i24::<BigEndian>(composition_time)?;
        }

        for nal in &unit.units {
            buffer.write_u32::<BigEndian>(nal.len() as u32)?;
            buffer.extend_from_slice(nal);
        }

        Ok(Bytes::from(buffer))
    }

    /// Legacy sequence start packets carry a zero composition time, enhanced ones do not
    pub fn encode_config(&self) -> Option<Bytes> {
        let config = self.config.as_ref()?;
        let mut buffer = Vec::with_capacity(config.len() + 8);
        self.form.write_sequence_start(&mut buffer, self.codec);
        if !self.form.enhanced {
            buffer.extend_from_slice(&[0, 0, 0]);
        }

        buffer.extend_from_slice(config);
        Some(Bytes::from(buffer))
    }
}

fn split_length_prefixed(body: &Bytes) -> Result<Vec<Bytes>, TrackError> {
    let mut units = Vec::new();
    let mut position = 0;
    while position < body.len() {
        let remaining = body.len() - position;
        if remaining < NAL_LENGTH_SIZE {
            return Err(TrackError::UnitLengthOverflow {
                length: NAL_LENGTH_SIZE,
                remaining,
            });
        }

        let mut cursor = Cursor::new(&body[position..position + NAL_LENGTH_SIZE]);
        let length = cursor.read_u32::<BigEndian>()? as usize;
        position += NAL_LENGTH_SIZE;

        if length > body.len() - position {
            return Err(TrackError::UnitLengthOverflow {
                length,
                remaining: body.len() - position,
            });
        }

        units.push(body.slice(position..position + length));
        position += length;
    }

    Ok(units)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit(pts: u32, dts: u32, keyframe: bool, nals: &[&'static [u8]]) -> AccessUnit {
        AccessUnit {
            pts: RtmpTimestamp::new(pts),
            dts: RtmpTimestamp::new(dts),
            keyframe,
            units: nals.iter().map(|nal| Bytes::from_static(nal)).collect(),
        }
    }

    #[test]
    fn h264_access_unit_layout() {
        let framer = AvcFramer::new(Codec::H264);
        let payload = framer
            .encode(&unit(100, 90, true, &[&[0x65, 0xAA], &[0x06]]))
            .unwrap();

        assert_eq!(
            &payload[..],
            &[
                0x17, 0x01, 0x00, 0x00, 0x0A, // header with 10 ms composition time
                0x00, 0x00, 0x00, 0x02, 0x65, 0xAA, // first NAL unit
                0x00, 0x00, 0x00, 0x01, 0x06, // second NAL unit
            ][..]
        );
    }

    #[test]
    fn h264_access_unit_decodes_back() {
        let mut framer = AvcFramer::new(Codec::H264);
        let input = unit(100, 90, true, &[&[0x65, 0xAA], &[0x06]]);
        let payload = framer.encode(&input).unwrap();

        let output = framer.decode(RtmpTimestamp::new(90), &payload).unwrap();
        assert_eq!(output, Some(input));
    }

    #[test]
    fn negative_composition_time_decodes() {
        let mut framer = AvcFramer::new(Codec::H264);
        let payload = Bytes::from_static(&[0x27, 0x01, 0xFF, 0xFF, 0xF6, 0, 0, 0, 1, 0x41]);

        let output = framer
            .decode(RtmpTimestamp::new(100), &payload)
            .unwrap()
            .unwrap();

        assert_eq!(output.pts, RtmpTimestamp::new(90));
        assert_eq!(output.dts, RtmpTimestamp::new(100));
        assert!(!output.keyframe);
    }

    #[test]
    fn sequence_start_is_stored_as_config() {
        let mut framer = AvcFramer::new(Codec::H264);
        let payload = Bytes::from_static(&[0x17, 0x00, 0, 0, 0, 0x01, 0x64, 0x00, 0x1F]);

        assert_eq!(framer.decode(RtmpTimestamp::new(0), &payload).unwrap(), None);
        assert_eq!(framer.config, Some(Bytes::from_static(&[0x01, 0x64, 0x00, 0x1F])));
        assert_eq!(framer.encode_config(), Some(payload));
    }

    #[test]
    fn end_of_sequence_is_ignored() {
        let mut framer = AvcFramer::new(Codec::H264);
        let payload = Bytes::from_static(&[0x17, 0x02, 0, 0, 0]);
        assert_eq!(framer.decode(RtmpTimestamp::new(0), &payload).unwrap(), None);
    }

    #[test]
    fn nal_length_past_payload_end_is_rejected() {
        let mut framer = AvcFramer::new(Codec::H264);
        let payload = Bytes::from_static(&[0x17, 0x01, 0, 0, 0, 0, 0, 0, 5, 0x65, 0x01]);

        match framer.decode(RtmpTimestamp::new(0), &payload) {
            Err(TrackError::UnitLengthOverflow {
                length: 5,
                remaining: 2,
            }) => (),
            x => panic!("Expected unit length overflow, got {:?}", x),
        }
    }

    #[test]
    fn legacy_hevc_payload_decodes() {
        let mut framer = AvcFramer::new(Codec::H265);
        let payload = Bytes::from_static(&[0x1C, 0x01, 0, 0, 0, 0, 0, 0, 2, 0x26, 0x01]);

        let output = framer
            .decode(RtmpTimestamp::new(40), &payload)
            .unwrap()
            .unwrap();

        assert_eq!(output.units, vec![Bytes::from_static(&[0x26, 0x01])]);
        assert!(output.keyframe);
    }

    #[test]
    fn hevc_is_encoded_with_enhanced_header() {
        let mut framer = AvcFramer::new(Codec::H265);

        let without_offset = framer.encode(&unit(40, 40, false, &[&[0x02, 0x01]])).unwrap();
        assert_eq!(&without_offset[..5], &[0xA3, b'h', b'v', b'c', b'1'][..]);
        assert_eq!(without_offset.len(), 5 + 4 + 2);

        let input = unit(80, 40, true, &[&[0x26, 0x01]]);
        let with_offset = framer.encode(&input).unwrap();
        assert_eq!(&with_offset[..8], &[0x91, b'h', b'v', b'c', b'1', 0, 0, 40][..]);

        let output = framer.decode(RtmpTimestamp::new(40), &with_offset).unwrap();
        assert_eq!(output, Some(input));
    }

    #[test]
    fn payload_for_other_codec_is_rejected() {
        let mut framer = AvcFramer::new(Codec::H265);
        let payload = Bytes::from_static(&[0x17, 0x01, 0, 0, 0]);

        match framer.decode(RtmpTimestamp::new(0), &payload) {
            Err(TrackError::CodecMismatch {
                expected: Codec::H265,
                received: Codec::H264,
            }) => (),
            x => panic!("Expected codec mismatch, got {:?}", x),
        }
    }

    fn assert_payload_round_trips(codec: Codec, timestamp: u32, payloads: &[&'static [u8]]) {
        let mut framer = AvcFramer::new(codec);
        for payload in payloads {
            let payload = Bytes::from_static(*payload);
            match framer.decode(RtmpTimestamp::new(timestamp), &payload).unwrap() {
                Some(unit) => assert_eq!(framer.encode(&unit).unwrap(), payload),
                None => assert_eq!(framer.encode_config().unwrap(), payload),
            }
        }
    }

    #[test]
    fn legacy_payloads_are_re_encoded_unchanged() {
        assert_payload_round_trips(
            Codec::H264,
            90,
            &[
                &[0x17, 0x00, 0, 0, 0, 0x01, 0x64],
                &[0x17, 0x01, 0, 0, 10, 0, 0, 0, 1, 0x65],
                &[0x37, 0x01, 0, 0, 0, 0, 0, 0, 2, 0x01, 0x9A],
                &[0x27, 0x01, 0xFF, 0xFF, 0xF6, 0, 0, 0, 1, 0x41],
            ],
        );

        assert_payload_round_trips(
            Codec::H265,
            40,
            &[
                &[0x1C, 0x00, 0, 0, 0, 0x01, 0x22],
                &[0x1C, 0x01, 0, 0, 0, 0, 0, 0, 2, 0x26, 0x01],
            ],
        );
    }

    #[test]
    fn enhanced_payloads_are_re_encoded_unchanged() {
        assert_payload_round_trips(
            Codec::H264,
            90,
            &[
                &[0x90, b'a', b'v', b'c', b'1', 0x01, 0x64],
                &[0x91, b'a', b'v', b'c', b'1', 0, 0, 10, 0, 0, 0, 1, 0x65],
                &[0xA1, b'a', b'v', b'c', b'1', 0, 0, 0, 0, 0, 0, 1, 0x41],
            ],
        );

        assert_payload_round_trips(
            Codec::H265,
            40,
            &[
                &[0x90, b'h', b'v', b'c', b'1', 0x01, 0x22],
                &[0x91, b'h', b'v', b'c', b'1', 0, 0, 0, 0, 0, 0, 2, 0x26, 0x01],
                &[0xA3, b'h', b'v', b'c', b'1', 0, 0, 0, 1, 0x02],
                &[0xA1, b'h', b'v', b'c', b'1', 0, 0, 20, 0, 0, 0, 1, 0x02],
            ],
        );
    }
}
