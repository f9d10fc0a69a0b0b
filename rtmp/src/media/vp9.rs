//! VP9 frames sent with the `vp09` enhanced header, one frame per payload.

use super::tags::{read_video_header, write_video_header, PacketType, VideoHeaderForm};
use super::{AccessUnit, Codec, TrackError};
use crate::time::RtmpTimestamp;
use bytes::Bytes;

#[derive(Debug, Clone)]
pub struct Vp9Framer {
    form: VideoHeaderForm,
    pub(super) config: Option<Bytes>,
}

impl Default for Vp9Framer {
    fn default() -> Self {
        Vp9Framer::new()
    }
}

impl Vp9Framer {
    pub fn new() -> Vp9Framer {
        Vp9Framer {
            form: VideoHeaderForm::new(Codec::Vp9),
            config: None,
        }
    }

    pub fn decode(
        &mut self,
        timestamp: RtmpTimestamp,
        payload: &Bytes,
    ) -> Result<Option<AccessUnit>, TrackError> {
        let header = read_video_header(payload)?;
        if header.codec != Codec::Vp9 {
            return Err(TrackError::CodecMismatch {
                expected: Codec::Vp9,
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
                units: vec![body],
            })),
        }
    }

    pub fn encode(&self, unit: &AccessUnit) -> Result<Bytes, TrackError> {
        let frame = unit.single_unit()?;
        let mut buffer = Vec::with_capacity(frame.len() + 5);
        write_video_header(
            &mut buffer,
            Codec::Vp9,
            true,
            self.form.frame_type_for(unit.keyframe),
            self.coded_frames_type(),
        );

        buffer.extend_from_slice(frame);
        Ok(Bytes::from(buffer))
    }

    pub fn encode_config(&self) -> Option<Bytes> {
        let config = self.config.as_ref()?;
        let mut buffer = Vec::with_capacity(config.len() + 5);
        self.form.write_sequence_start(&mut buffer, Codec::Vp9);
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_round_trips() {
        let mut framer = Vp9Framer::new();
        let input = AccessUnit {
            pts: RtmpTimestamp::new(66),
            dts: RtmpTimestamp::new(66),
            keyframe: false,
            units: vec![Bytes::from_static(&[0x86, 0x00, 0x40, 0x92])],
        };

        let payload = framer.encode(&input).unwrap();
        assert_eq!(&payload[..5], &[0xA3, b'v', b'p', b'0', b'9'][..]);

        let output = framer.decode(RtmpTimestamp::new(66), &payload).unwrap();
        assert_eq!(output, Some(input));
    }

    #[test]
    fn frame_with_composition_time_packet_type_decodes() {
        let mut framer = Vp9Framer::new();
        let payload = Bytes::from_static(&[0x91, b'v', b'p', b'0', b'9', 0x82, 0x49]);

        let output = framer
            .decode(RtmpTimestamp::new(10), &payload)
            .unwrap()
            .unwrap();

        assert!(output.keyframe);
        assert_eq!(output.units, vec![Bytes::from_static(&[0x82, 0x49])]);
    }

    #[test]
    fn multiple_frames_cannot_be_encoded() {
        let framer = Vp9Framer::new();
        let input = AccessUnit {
            pts: RtmpTimestamp::new(0),
            dts: RtmpTimestamp::new(0),
            keyframe: true,
            units: vec![Bytes::from_static(&[1]), Bytes::from_static(&[2])],
        };

        match framer.encode(&input) {
            Err(TrackError::InvalidAccessUnit { .. }) => (),
            x => panic!("Expected invalid access unit error, got {:?}", x),
        }
    }

    #[test]
    fn payloads_are_re_encoded_unchanged() {
        let mut framer = Vp9Framer::new();
        let payloads: [&'static [u8]; 4] = [
            &[0x90, b'v', b'p', b'0', b'9', 0x01, 0x00, 0x0A],
            &[0x91, b'v', b'p', b'0', b'9', 0x82, 0x49],
            &[0xB1, b'v', b'p', b'0', b'9', 0x86, 0x00],
            &[0xA3, b'v', b'p', b'0', b'9', 0x86, 0x01],
        ];

        for payload in payloads.iter() {
            let payload = Bytes::from_static(*payload);
            match framer.decode(RtmpTimestamp::new(66), &payload).unwrap() {
                Some(unit) => assert_eq!(framer.encode(&unit).unwrap(), payload),
                None => assert_eq!(framer.encode_config().unwrap(), payload),
            }
        }
    }
}
