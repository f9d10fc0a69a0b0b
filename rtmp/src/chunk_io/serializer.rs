use super::chunk_header::{
    write_basic_header, ChunkHeaderFormat, ChunkStreamState, MAX_CHUNK_STREAM_ID,
    MAX_TIMESTAMP_FIELD, MIN_CHUNK_STREAM_ID,
};
use super::{ChunkSerializationError, DEFAULT_CHUNK_SIZE, MAX_CHUNK_SIZE, MAX_MESSAGE_LENGTH};
use crate::messages::{MessagePayload, RtmpMessage};
use crate::time::RtmpTimestamp;
use byteorder::{BigEndian, LittleEndian, WriteBytesExt};
use std::cmp::min;
use std::collections::HashMap;
use tracing::{debug, trace};

/// Splits message payloads into RTMP chunks.
///
/// The same serializer must be used for every message sent to a peer, since each header is
/// compressed against the last header sent on the same chunk stream.
pub struct ChunkSerializer {
    chunk_streams: HashMap<u32, ChunkStreamState>,
    max_chunk_size: u32,
}

impl ChunkSerializer {
    /// Creates a serializer using the default chunk size of 128 bytes
    pub fn new() -> ChunkSerializer {
        ChunkSerializer {
            chunk_streams: HashMap::new(),
            max_chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    pub fn max_chunk_size(&self) -> u32 {
        self.max_chunk_size
    }

    /// Changes the outbound chunk size.
    ///
    /// The returned bytes hold the Set Chunk Size message announcing the change.  They must be
    /// sent before any bytes serialized after this call, as only those use the new size.
    pub fn set_max_chunk_size(
        &mut self,
        new_size: u32,
        time: RtmpTimestamp,
    ) -> Result<Vec<u8>, ChunkSerializationError> {
        if new_size == 0 || new_size > MAX_CHUNK_SIZE {
            return Err(ChunkSerializationError::InvalidMaxChunkSize {
                chunk_size: new_size,
            });
        }

        let payload = RtmpMessage::SetChunkSize { size: new_size }.into_message_payload(time, 0)?;
        let bytes = self.serialize(&payload, true)?;

        debug!(size = new_size, "Outbound chunk size changed");
        self.max_chunk_size = new_size;
        Ok(bytes)
    }

    /// Splits the message into chunks on the message's chunk stream.
    ///
    /// The first chunk uses the smallest header that the receiver can resolve from the
    /// previous message on the same chunk stream, and every following chunk uses a format 3
    /// header.  `force_uncompressed` always sends a full (format 0) header, which some peers
    /// expect for the first messages of a session.
    pub fn serialize(
        &mut self,
        message: &MessagePayload,
        force_uncompressed: bool,
    ) -> Result<Vec<u8>, ChunkSerializationError> {
        let length = message.data.len();
        if length > MAX_MESSAGE_LENGTH {
            return Err(ChunkSerializationError::MessageTooLong { size: length });
        }

        let csid = message.chunk_stream_id;
        if csid < MIN_CHUNK_STREAM_ID || csid > MAX_CHUNK_STREAM_ID {
            return Err(ChunkSerializationError::InvalidChunkStreamId { csid });
        }

        let previous = self.chunk_streams.entry(csid).or_default();
        let format = choose_format(previous, message, force_uncompressed);
        let timestamp_field = match format {
            ChunkHeaderFormat::Full => message.timestamp.value,
            ChunkHeaderFormat::Empty => previous.timestamp_delta,
            _ => (message.timestamp - previous.timestamp).value,
        };

        let has_extended_timestamp = match format {
            ChunkHeaderFormat::Empty => previous.has_extended_timestamp,
            _ => timestamp_field >= MAX_TIMESTAMP_FIELD,
        };

        let header = ChunkStreamState {
            initialized: true,
            timestamp: message.timestamp,
            timestamp_delta: timestamp_field,
            message_length: length as u32,
            message_type_id: message.type_id,
            message_stream_id: message.message_stream_id,
            has_extended_timestamp,
        };

        let chunk_size = self.max_chunk_size as usize;
        let chunk_count = (length + chunk_size - 1) / chunk_size;
        let mut bytes = Vec::with_capacity(length + 18 + chunk_count * 7);

        let mut offset = 0;
        let mut chunk_format = format;
        loop {
            let end = min(offset + chunk_size, length);
            write_basic_header(&mut bytes, chunk_format, csid);
            write_message_header(&mut bytes, chunk_format, &header)?;
            bytes.extend_from_slice(&message.data[offset..end]);

            offset = end;
            chunk_format = ChunkHeaderFormat::Empty;
            if offset >= length {
                break;
            }
        }

        trace!(
            csid,
            type_id = message.type_id,
            length,
            ?format,
            timestamp = message.timestamp.value,
            "Serialized message"
        );

        self.chunk_streams.insert(csid, header);
        Ok(bytes)
    }
}

impl Default for ChunkSerializer {
    fn default() -> Self {
        ChunkSerializer::new()
    }
}

fn choose_format(
    previous: &ChunkStreamState,
    message: &MessagePayload,
    force_uncompressed: bool,
) -> ChunkHeaderFormat {
    if force_uncompressed
        || !previous.initialized
        || previous.message_stream_id != message.message_stream_id
        || message.timestamp.signed_delta_from(previous.timestamp) < 0
    {
        return ChunkHeaderFormat::Full;
    }

    if previous.message_length as usize != message.data.len()
        || previous.message_type_id != message.type_id
    {
        return ChunkHeaderFormat::TimeDeltaWithoutMessageStreamId;
    }

    if (message.timestamp - previous.timestamp).value != previous.timestamp_delta {
        return ChunkHeaderFormat::TimeDeltaOnly;
    }

    ChunkHeaderFormat::Empty
}

fn write_message_header(
    bytes: &mut Vec<u8>,
    format: ChunkHeaderFormat,
    header: &ChunkStreamState,
) -> Result<(), ChunkSerializationError> {
    if format != ChunkHeaderFormat::Empty {
        bytes.write_u24::<BigEndian>(min(header.timestamp_delta, MAX_TIMESTAMP_FIELD))?;
    }

    if format == ChunkHeaderFormat::Full
        || format == ChunkHeaderFormat::TimeDeltaWithoutMessageStreamId
    {
        bytes.write_u24::<BigEndian>(header.message_length)?;
        bytes.write_u8(header.message_type_id)?;
    }

    if format == ChunkHeaderFormat::Full {
        bytes.write_u32::<LittleEndian>(header.message_stream_id)?;
    }

    if header.has_extended_timestamp {
        bytes.write_u32::<BigEndian>(header.timestamp_delta)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn video(timestamp: u32, data: Vec<u8>) -> MessagePayload {
        MessagePayload {
            chunk_stream_id: 6,
            timestamp: RtmpTimestamp::new(timestamp),
            type_id: 9,
            message_stream_id: 1,
            data: Bytes::from(data),
        }
    }

    fn format_of(bytes: &[u8]) -> u8 {
        bytes[0] >> 6
    }

    #[test]
    fn first_message_uses_full_header() {
        let mut serializer = ChunkSerializer::new();
        let bytes = serializer.serialize(&video(10, vec![1, 2, 3]), false).unwrap();

        let expected = vec![
            0b0000_0110, // format 0, csid 6
            0, 0, 10, // timestamp
            0, 0, 3, // length
            9, // type id
            1, 0, 0, 0, // message stream id, little endian
            1, 2, 3,
        ];
        assert_eq!(bytes, expected);
    }

    #[test]
    fn steady_run_compresses_to_type_3_headers() {
        let mut serializer = ChunkSerializer::new();
        let first = serializer.serialize(&video(10, vec![1; 5]), false).unwrap();
        let second = serializer.serialize(&video(20, vec![2; 5]), false).unwrap();
        let third = serializer.serialize(&video(30, vec![3; 5]), false).unwrap();

        assert_eq!(format_of(&first), 0);
        assert_eq!(format_of(&second), 3);
        assert_eq!(second.len(), 6, "Type 3 header should be one byte");
        assert_eq!(format_of(&third), 3);
    }

    #[test]
    fn length_or_type_change_forces_type_1() {
        let mut serializer = ChunkSerializer::new();
        serializer.serialize(&video(10, vec![1; 5]), false).unwrap();
        let bytes = serializer.serialize(&video(20, vec![1; 6]), false).unwrap();
        assert_eq!(format_of(&bytes), 1);
        assert_eq!(&bytes[1..8], &[0, 0, 10, 0, 0, 6, 9]);

        let mut audio = video(30, vec![1; 6]);
        audio.type_id = 8;
        let bytes = serializer.serialize(&audio, false).unwrap();
        assert_eq!(format_of(&bytes), 1);
    }

    #[test]
    fn delta_change_uses_type_2() {
        let mut serializer = ChunkSerializer::new();
        serializer.serialize(&video(10, vec![1; 5]), false).unwrap();
        serializer.serialize(&video(20, vec![1; 5]), false).unwrap();
        let bytes = serializer.serialize(&video(50, vec![1; 5]), false).unwrap();

        assert_eq!(format_of(&bytes), 2);
        assert_eq!(&bytes[1..4], &[0, 0, 30]);
    }

    #[test]
    fn stream_id_change_or_backwards_time_uses_type_0() {
        let mut serializer = ChunkSerializer::new();
        serializer.serialize(&video(100, vec![1; 5]), false).unwrap();

        let bytes = serializer.serialize(&video(50, vec![1; 5]), false).unwrap();
        assert_eq!(format_of(&bytes), 0);

        let mut other_stream = video(60, vec![1; 5]);
        other_stream.message_stream_id = 2;
        let bytes = serializer.serialize(&other_stream, false).unwrap();
        assert_eq!(format_of(&bytes), 0);
    }

    #[test]
    fn force_uncompressed_always_uses_type_0() {
        let mut serializer = ChunkSerializer::new();
        serializer.serialize(&video(10, vec![1; 5]), false).unwrap();
        let bytes = serializer.serialize(&video(20, vec![1; 5]), true).unwrap();
        assert_eq!(format_of(&bytes), 0);
    }

    #[test]
    fn continuation_chunks_use_type_3_headers() {
        let mut serializer = ChunkSerializer::new();
        let bytes = serializer.serialize(&video(10, vec![7; 300]), false).unwrap();

        assert_eq!(bytes.len(), 12 + 128 + 1 + 128 + 1 + 44);
        assert_eq!(bytes[12 + 128], 0b1100_0110);
        assert_eq!(bytes[12 + 128 + 1 + 128], 0b1100_0110);
    }

    #[test]
    fn extended_timestamp_is_written_after_saturated_field() {
        let mut serializer = ChunkSerializer::new();
        let bytes = serializer
            .serialize(&video(0x0100_0000, vec![1; 130]), false)
            .unwrap();

        assert_eq!(&bytes[1..4], &[0xFF, 0xFF, 0xFF]);
        assert_eq!(&bytes[12..16], &[0x01, 0, 0, 0]);

        // The continuation chunk repeats the extended field
        let continuation = 16 + 128;
        assert_eq!(bytes[continuation], 0b1100_0110);
        assert_eq!(&bytes[continuation + 1..continuation + 5], &[0x01, 0, 0, 0]);
    }

    #[test]
    fn large_chunk_stream_ids_use_wider_basic_headers() {
        let mut serializer = ChunkSerializer::new();
        let mut message = video(0, vec![1]);
        message.chunk_stream_id = 320;
        let bytes = serializer.serialize(&message, false).unwrap();
        assert_eq!(&bytes[0..3], &[0b0000_0001, 0, 1]);
        assert_eq!(serializer.chunk_streams.len(), 1);
    }

    #[test]
    fn out_of_range_chunk_stream_ids_are_rejected() {
        let mut serializer = ChunkSerializer::new();
        for &csid in &[0_u32, 1, 65600] {
            let mut message = video(0, vec![1]);
            message.chunk_stream_id = csid;
            match serializer.serialize(&message, false) {
                Err(ChunkSerializationError::InvalidChunkStreamId { csid: x }) => {
                    assert_eq!(x, csid)
                }
                x => panic!("Expected InvalidChunkStreamId, got {:?}", x),
            }
        }
    }

    #[test]
    fn message_over_24_bit_length_is_rejected() {
        let mut serializer = ChunkSerializer::new();
        let message = video(0, vec![0; MAX_MESSAGE_LENGTH + 1]);
        match serializer.serialize(&message, false) {
            Err(ChunkSerializationError::MessageTooLong { size }) => {
                assert_eq!(size, MAX_MESSAGE_LENGTH + 1)
            }
            x => panic!("Expected MessageTooLong, got {:?}", x),
        }
    }

    #[test]
    fn set_max_chunk_size_emits_message_and_applies_afterwards() {
        let mut serializer = ChunkSerializer::new();
        let bytes = serializer
            .set_max_chunk_size(4096, RtmpTimestamp::new(0))
            .unwrap();

        assert_eq!(bytes[0], 0b0000_0010, "Expected type 0 header on csid 2");
        assert_eq!(bytes[7], 1, "Expected set chunk size type id");
        assert_eq!(&bytes[12..], &[0, 0, 0x10, 0]);
        assert_eq!(serializer.max_chunk_size(), 4096);

        let bytes = serializer.serialize(&video(0, vec![1; 300]), false).unwrap();
        assert_eq!(bytes.len(), 12 + 300, "Expected a single chunk");
    }

    #[test]
    fn invalid_chunk_sizes_are_rejected() {
        let mut serializer = ChunkSerializer::new();
        for &size in &[0_u32, 0x8000_0000] {
            match serializer.set_max_chunk_size(size, RtmpTimestamp::new(0)) {
                Err(ChunkSerializationError::InvalidMaxChunkSize { chunk_size }) => {
                    assert_eq!(chunk_size, size)
                }
                x => panic!("Expected InvalidMaxChunkSize, got {:?}", x),
            }
        }
    }
}
