use super::chunk_header::{
    read_basic_header, ChunkHeaderFormat, ChunkStreamState, MAX_TIMESTAMP_FIELD,
};
use super::{ChunkDeserializationError, SessionParameters, DEFAULT_MAX_INBOUND_MESSAGE_LENGTH};
use crate::messages::{is_protocol_control_type, MessagePayload, RtmpMessage};
use crate::time::RtmpTimestamp;
use byteorder::{BigEndian, LittleEndian, ReadBytesExt};
use bytes::{Buf, BytesMut};
use std::cmp::min;
use std::collections::HashMap;
use std::io::Cursor;
use tracing::{debug, trace};

#[derive(Default)]
struct InboundChunkStream {
    header: ChunkStreamState,
    payload: BytesMut,
}

enum ChunkReadResult {
    NotEnoughBytes,
    MessageIncomplete,
    MessageCompleted(MessagePayload),
}

/// Reassembles RTMP chunks into message payloads.
///
/// Every byte received from the peer after the handshake must be passed to the same
/// deserializer, since chunk headers only carry what changed since the previous chunk on their
/// chunk stream.  Chunks from different chunk streams may be interleaved freely, each chunk
/// stream assembles its current message in its own buffer.
///
/// Protocol control messages (set chunk size, abort, acknowledgement, window acknowledgement
/// size and set peer bandwidth) are applied as soon as they complete and are never returned.
/// Their effects are visible through `session_parameters()`.
pub struct ChunkDeserializer {
    buffer: BytesMut,
    chunk_streams: HashMap<u32, InboundChunkStream>,
    parameters: SessionParameters,
    max_message_length: usize,
}

impl ChunkDeserializer {
    pub fn new() -> ChunkDeserializer {
        ChunkDeserializer {
            buffer: BytesMut::with_capacity(4096),
            chunk_streams: HashMap::new(),
            parameters: SessionParameters::new(),
            max_message_length: DEFAULT_MAX_INBOUND_MESSAGE_LENGTH,
        }
    }

    /// Messages declaring a length above this value are rejected
    pub fn set_max_message_length(&mut self, max_message_length: usize) {
        self.max_message_length = max_message_length;
    }

    pub fn session_parameters(&self) -> &SessionParameters {
        &self.parameters
    }

    /// Adds the passed in bytes to the internal buffer and returns the next complete non-control
    /// message, if the buffered bytes contain one.
    ///
    /// Bytes must only be passed in once.  Since one call returns at most one message, callers
    /// should keep calling with an empty slice until `Ok(None)` is returned.
    ///
    /// ```
    /// use bytes::Bytes;
    /// use rtmp_engine::chunk_io::{ChunkDeserializer, ChunkSerializer};
    /// use rtmp_engine::messages::MessagePayload;
    /// use rtmp_engine::time::RtmpTimestamp;
    ///
    /// let input = MessagePayload {
    ///     chunk_stream_id: 6,
    ///     timestamp: RtmpTimestamp::new(55),
    ///     type_id: 9,
    ///     message_stream_id: 1,
    ///     data: Bytes::from(vec![7_u8; 300]),
    /// };
    ///
    /// let mut serializer = ChunkSerializer::new();
    /// let bytes = serializer.serialize(&input, false).unwrap();
    ///
    /// let mut deserializer = ChunkDeserializer::new();
    /// assert_eq!(deserializer.get_next_message(&bytes).unwrap(), Some(input));
    /// assert_eq!(deserializer.get_next_message(&[]).unwrap(), None);
    /// ```
    pub fn get_next_message(
        &mut self,
        bytes: &[u8],
    ) -> Result<Option<MessagePayload>, ChunkDeserializationError> {
        self.buffer.extend_from_slice(bytes);

        loop {
            match self.read_chunk()? {
                ChunkReadResult::NotEnoughBytes => return Ok(None),
                ChunkReadResult::MessageIncomplete => continue,
                ChunkReadResult::MessageCompleted(message) => {
                    if is_protocol_control_type(message.type_id) {
                        self.apply_control_message(&message)?;
                        continue;
                    }

                    trace!(
                        csid = message.chunk_stream_id,
                        type_id = message.type_id,
                        length = message.data.len(),
                        timestamp = message.timestamp.value,
                        "Received message"
                    );

                    return Ok(Some(message));
                }
            }
        }
    }

    /// Parses one whole chunk from the front of the buffer.  Nothing is consumed and no state
    /// changes unless the complete chunk is available.
    fn read_chunk(&mut self) -> Result<ChunkReadResult, ChunkDeserializationError> {
        let (format, csid, basic_header_length) = match read_basic_header(&self.buffer) {
            Some(header) => header,
            None => return Ok(ChunkReadResult::NotEnoughBytes),
        };

        let header_end = basic_header_length + format.message_header_length();
        if self.buffer.len() < header_end {
            return Ok(ChunkReadResult::NotEnoughBytes);
        }

        let (received, mut header) = match self.chunk_streams.get(&csid) {
            Some(stream) => (stream.payload.len(), stream.header.clone()),
            None => (0, ChunkStreamState::default()),
        };

        if format != ChunkHeaderFormat::Full && !header.initialized {
            return Err(ChunkDeserializationError::NoPreviousChunkOnStream { csid });
        }

        let continuation = received > 0;
        if continuation && format != ChunkHeaderFormat::Empty {
            return Err(ChunkDeserializationError::InterruptedMessage { csid });
        }

        let mut cursor = Cursor::new(&self.buffer[basic_header_length..header_end]);
        let mut timestamp_field = None;
        if format != ChunkHeaderFormat::Empty {
            let field = cursor.read_u24::<BigEndian>()?;
            header.has_extended_timestamp = field == MAX_TIMESTAMP_FIELD;
            timestamp_field = Some(field);
        }

        if format == ChunkHeaderFormat::Full
            || format == ChunkHeaderFormat::TimeDeltaWithoutMessageStreamId
        {
            header.message_length = cursor.read_u24::<BigEndian>()?;
            header.message_type_id = cursor.read_u8()?;
        }

        if format == ChunkHeaderFormat::Full {
            header.message_stream_id = cursor.read_u32::<LittleEndian>()?;
        }

        let mut payload_start = header_end;
        if header.has_extended_timestamp {
            if self.buffer.len() < header_end + 4 {
                return Ok(ChunkReadResult::NotEnoughBytes);
            }

            let mut cursor = Cursor::new(&self.buffer[header_end..header_end + 4]);
            let extended = cursor.read_u32::<BigEndian>()?;
            if timestamp_field.is_some() {
                timestamp_field = Some(extended);
            }

            payload_start += 4;
        }

        if !continuation {
            if header.message_length as usize > self.max_message_length {
                return Err(ChunkDeserializationError::MessageTooLong {
                    csid,
                    length: header.message_length,
                    max_length: self.max_message_length,
                });
            }

            match (format, timestamp_field) {
                (ChunkHeaderFormat::Full, Some(timestamp)) => {
                    header.timestamp = RtmpTimestamp::new(timestamp);
                    header.timestamp_delta = timestamp;
                }

                (_, Some(delta)) => {
                    header.timestamp = header.timestamp + delta;
                    header.timestamp_delta = delta;
                }

                (_, None) => header.timestamp = header.timestamp + header.timestamp_delta,
            }

            header.initialized = true;
        }

        let remaining = header.message_length as usize - received;
        let chunk_length = min(remaining, self.parameters.inbound_chunk_size as usize);
        if self.buffer.len() < payload_start + chunk_length {
            return Ok(ChunkReadResult::NotEnoughBytes);
        }

        self.buffer.advance(payload_start);
        let data = self.buffer.split_to(chunk_length);

        let stream = self.chunk_streams.entry(csid).or_default();
        if !continuation {
            stream.payload.reserve(header.message_length as usize);
        }

        stream.payload.extend_from_slice(&data);
        stream.header = header;

        if stream.payload.len() < stream.header.message_length as usize {
            return Ok(ChunkReadResult::MessageIncomplete);
        }

        Ok(ChunkReadResult::MessageCompleted(MessagePayload {
            chunk_stream_id: csid,
            timestamp: stream.header.timestamp,
            type_id: stream.header.message_type_id,
            message_stream_id: stream.header.message_stream_id,
            data: stream.payload.split().freeze(),
        }))
    }

    fn apply_control_message(
        &mut self,
        message: &MessagePayload,
    ) -> Result<(), ChunkDeserializationError> {
        match message.to_rtmp_message()? {
            RtmpMessage::SetChunkSize { size } => {
                debug!(size, "Peer changed its chunk size");
                self.parameters.inbound_chunk_size = size;
            }

            RtmpMessage::Abort { stream_id } => {
                if let Some(stream) = self.chunk_streams.get_mut(&stream_id) {
                    debug!(csid = stream_id, "Peer aborted message");
                    stream.payload.clear();
                }
            }

            RtmpMessage::Acknowledgement { sequence_number } => {
                self.parameters.last_acknowledgement = Some(sequence_number);
            }

            RtmpMessage::WindowAcknowledgement { size } => {
                debug!(size, "Peer set window acknowledgement size");
                self.parameters.peer_window_ack_size = Some(size);
            }

            RtmpMessage::SetPeerBandwidth { size, limit_type } => {
                debug!(size, ?limit_type, "Peer set bandwidth");
                self.parameters.peer_bandwidth = Some(size);
                self.parameters.peer_bandwidth_limit_type = Some(limit_type);
            }

            _ => (),
        }

        Ok(())
    }
}

impl Default for ChunkDeserializer {
    fn default() -> Self {
        ChunkDeserializer::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk_io::ChunkSerializer;
    use crate::messages::PeerBandwidthLimitType;
    use byteorder::WriteBytesExt;
    use bytes::Bytes;

    fn full_header(csid: u8, timestamp: u32, length: u32, type_id: u8, stream_id: u32) -> Vec<u8> {
        let mut bytes = vec![csid];
        bytes.write_u24::<BigEndian>(timestamp).unwrap();
        bytes.write_u24::<BigEndian>(length).unwrap();
        bytes.write_u8(type_id).unwrap();
        bytes.write_u32::<LittleEndian>(stream_id).unwrap();
        bytes
    }

    fn payload(csid: u32, timestamp: u32, type_id: u8, data: Vec<u8>) -> MessagePayload {
        MessagePayload {
            chunk_stream_id: csid,
            timestamp: RtmpTimestamp::new(timestamp),
            type_id,
            message_stream_id: 1,
            data: Bytes::from(data),
        }
    }

    #[test]
    fn round_trips_across_chunk_sizes() {
        let data: Vec<u8> = (0..1000_u32).map(|x| (x % 251) as u8).collect();
        let length = data.len() as u32;

        for &chunk_size in &[1, 128, 4096, length, length + 1] {
            let mut serializer = ChunkSerializer::new();
            let mut deserializer = ChunkDeserializer::new();

            let mut bytes = serializer
                .set_max_chunk_size(chunk_size, RtmpTimestamp::new(0))
                .unwrap();

            let first = payload(6, 10, 9, data.clone());
            let second = payload(6, 20, 9, data.clone());
            bytes.extend(serializer.serialize(&first, false).unwrap());
            bytes.extend(serializer.serialize(&second, false).unwrap());

            let result1 = deserializer.get_next_message(&bytes).unwrap();
            let result2 = deserializer.get_next_message(&[]).unwrap();
            let result3 = deserializer.get_next_message(&[]).unwrap();

            assert_eq!(result1, Some(first), "Chunk size {}", chunk_size);
            assert_eq!(result2, Some(second), "Chunk size {}", chunk_size);
            assert_eq!(result3, None, "Chunk size {}", chunk_size);
            assert_eq!(
                deserializer.session_parameters().inbound_chunk_size,
                chunk_size
            );
        }
    }

    #[test]
    fn messages_can_be_fed_one_byte_at_a_time() {
        let mut serializer = ChunkSerializer::new();
        let input = payload(4, 1000, 8, vec![3_u8; 300]);
        let bytes = serializer.serialize(&input, false).unwrap();

        let mut deserializer = ChunkDeserializer::new();
        let mut results = Vec::new();
        for byte in bytes {
            if let Some(message) = deserializer.get_next_message(&[byte]).unwrap() {
                results.push(message);
            }
        }

        assert_eq!(results, vec![input]);
    }

    #[test]
    fn interleaved_chunk_streams_assemble_independently() {
        let audio = vec![4_u8; 200];
        let video = vec![6_u8; 150];

        let mut bytes = full_header(4, 10, 200, 8, 1);
        bytes.extend_from_slice(&audio[..128]);
        bytes.extend(full_header(6, 20, 150, 9, 1));
        bytes.extend_from_slice(&video[..128]);
        bytes.push(0b1100_0100);
        bytes.extend_from_slice(&audio[128..]);
        bytes.push(0b1100_0110);
        bytes.extend_from_slice(&video[128..]);

        let mut deserializer = ChunkDeserializer::new();
        let first = deserializer.get_next_message(&bytes).unwrap().unwrap();
        let second = deserializer.get_next_message(&[]).unwrap().unwrap();

        assert_eq!(first.chunk_stream_id, 4);
        assert_eq!(first.timestamp, 10);
        assert_eq!(&first.data[..], &audio[..]);
        assert_eq!(second.chunk_stream_id, 6);
        assert_eq!(second.timestamp, 20);
        assert_eq!(&second.data[..], &video[..]);
    }

    #[test]
    fn new_header_during_unfinished_message_is_an_error() {
        let mut bytes = full_header(4, 10, 200, 8, 1);
        bytes.extend_from_slice(&[0_u8; 128]);
        bytes.extend_from_slice(&[0b0100_0100, 0, 0, 10, 0, 0, 5, 8]);
        bytes.extend_from_slice(&[0_u8; 5]);

        let mut deserializer = ChunkDeserializer::new();
        match deserializer.get_next_message(&bytes) {
            Err(ChunkDeserializationError::InterruptedMessage { csid: 4 }) => (),
            x => panic!("Expected InterruptedMessage error, got {:?}", x),
        }
    }

    #[test]
    fn compressed_header_on_unknown_chunk_stream_is_an_error() {
        let mut deserializer = ChunkDeserializer::new();
        match deserializer.get_next_message(&[0b1000_0101, 0, 0, 10]) {
            Err(ChunkDeserializationError::NoPreviousChunkOnStream { csid: 5 }) => (),
            x => panic!("Expected NoPreviousChunkOnStream error, got {:?}", x),
        }

        assert!(deserializer.chunk_streams.is_empty());
    }

    #[test]
    fn highest_chunk_stream_id_holds_a_single_state() {
        let mut serializer = ChunkSerializer::new();
        let mut deserializer = ChunkDeserializer::new();

        let input = payload(65599, 0, 9, vec![1, 2, 3]);
        let bytes = serializer.serialize(&input, false).unwrap();
        assert_eq!(&bytes[0..3], &[0b0000_0001, 0xFF, 0xFF]);

        let result = deserializer.get_next_message(&bytes).unwrap();
        assert_eq!(result, Some(input));
        assert_eq!(deserializer.chunk_streams.len(), 1);
        assert!(deserializer.chunk_streams.contains_key(&65599));
    }

    #[test]
    fn oversized_message_is_rejected_from_its_header() {
        let mut deserializer = ChunkDeserializer::new();
        deserializer.set_max_message_length(1000);

        let bytes = full_header(6, 0, 1001, 9, 1);
        match deserializer.get_next_message(&bytes) {
            Err(ChunkDeserializationError::MessageTooLong {
                csid: 6,
                length: 1001,
                max_length: 1000,
            }) => (),
            x => panic!("Expected MessageTooLong error, got {:?}", x),
        }
    }

    #[test]
    fn abort_discards_partial_message() {
        let mut bytes = full_header(4, 10, 200, 8, 1);
        bytes.extend_from_slice(&[1_u8; 128]);
        bytes.extend(full_header(2, 0, 4, 2, 0));
        bytes.extend_from_slice(&[0, 0, 0, 4]);
        bytes.extend(full_header(4, 30, 3, 8, 1));
        bytes.extend_from_slice(&[9, 9, 9]);

        let mut deserializer = ChunkDeserializer::new();
        let message = deserializer.get_next_message(&bytes).unwrap().unwrap();
        assert_eq!(message.timestamp, 30);
        assert_eq!(&message.data[..], &[9, 9, 9]);
    }

    #[test]
    fn control_messages_update_session_parameters() {
        let mut bytes = full_header(2, 0, 4, 5, 0);
        bytes.extend_from_slice(&[0x00, 0x26, 0x25, 0xA0]);
        bytes.extend(full_header(2, 0, 5, 6, 0));
        bytes.extend_from_slice(&[0x00, 0x26, 0x25, 0xA0, 2]);
        bytes.extend(full_header(2, 0, 4, 3, 0));
        bytes.extend_from_slice(&[0, 0, 0x10, 0]);

        let mut deserializer = ChunkDeserializer::new();
        assert_eq!(deserializer.get_next_message(&bytes).unwrap(), None);

        let parameters = deserializer.session_parameters();
        assert_eq!(parameters.peer_window_ack_size, Some(2_500_000));
        assert_eq!(parameters.peer_bandwidth, Some(2_500_000));
        assert_eq!(
            parameters.peer_bandwidth_limit_type,
            Some(PeerBandwidthLimitType::Dynamic)
        );
        assert_eq!(parameters.last_acknowledgement, Some(4096));
    }

    #[test]
    fn type_3_message_after_type_0_reuses_timestamp_as_delta() {
        let mut bytes = full_header(3, 10, 2, 20, 0);
        bytes.extend_from_slice(&[1, 2]);
        bytes.push(0b1100_0011);
        bytes.extend_from_slice(&[3, 4]);
        bytes.extend_from_slice(&[0b1000_0011, 0, 0, 5]);
        bytes.extend_from_slice(&[5, 6]);

        let mut deserializer = ChunkDeserializer::new();
        let first = deserializer.get_next_message(&bytes).unwrap().unwrap();
        let second = deserializer.get_next_message(&[]).unwrap().unwrap();
        let third = deserializer.get_next_message(&[]).unwrap().unwrap();

        assert_eq!(first.timestamp, 10);
        assert_eq!(second.timestamp, 20);
        assert_eq!(third.timestamp, 25);
        assert_eq!(&third.data[..], &[5, 6]);
    }

    #[test]
    fn extended_timestamp_is_read_on_every_chunk_of_the_message() {
        let timestamp = 0x0100_0000_u32;
        let mut bytes = full_header(6, MAX_TIMESTAMP_FIELD, 130, 9, 1);
        bytes.write_u32::<BigEndian>(timestamp).unwrap();
        bytes.extend_from_slice(&[1_u8; 128]);
        bytes.push(0b1100_0110);
        bytes.write_u32::<BigEndian>(timestamp).unwrap();
        bytes.extend_from_slice(&[2_u8; 2]);

        let mut deserializer = ChunkDeserializer::new();
        let message = deserializer.get_next_message(&bytes).unwrap().unwrap();
        assert_eq!(message.timestamp, timestamp);
        assert_eq!(message.data.len(), 130);
        assert_eq!(&message.data[128..], &[2, 2]);
    }

    #[test]
    fn extended_timestamps_and_deltas_round_trip() {
        let timestamps = [0, 0xFF_FFFF, 0x1FF_FFFE, 0x2FF_FFFD, 0xFFFF_FFFF, 5];
        let mut serializer = ChunkSerializer::new();
        let mut deserializer = ChunkDeserializer::new();

        for (index, &timestamp) in timestamps.iter().enumerate() {
            let input = payload(6, timestamp, 9, vec![index as u8; 3]);
            let bytes = serializer.serialize(&input, false).unwrap();

            match index {
                0 => assert_eq!(bytes[0] >> 6, 0),
                1 => assert_eq!(bytes[0] >> 6, 2, "saturated delta"),
                2 | 3 => assert_eq!(bytes[0] >> 6, 3, "repeated extended delta"),
                _ => (),
            }

            let output = deserializer.get_next_message(&bytes).unwrap();
            assert_eq!(output, Some(input), "timestamp {:#x}", timestamp);
        }
    }
}
