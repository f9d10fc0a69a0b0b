//! The parts of a chunk header shared by both directions: the format id, the variable width
//! basic header and the per chunk stream state that compressed headers refer back to.

use crate::time::RtmpTimestamp;

/// Largest value the 24 bit timestamp field can hold.  This value itself signals that the real
/// value follows in a 4 byte extended timestamp field.
pub const MAX_TIMESTAMP_FIELD: u32 = 0x00FF_FFFF;

pub const MIN_CHUNK_STREAM_ID: u32 = 2;
pub const MAX_CHUNK_STREAM_ID: u32 = 65599;

const FORMAT_MASK: u8 = 0b1100_0000;
const CSID_MASK: u8 = 0b0011_1111;

#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum ChunkHeaderFormat {
    Full,                            // Format 0
    TimeDeltaWithoutMessageStreamId, // Format 1
    TimeDeltaOnly,                   // Format 2
    Empty,                           // Format 3
}

impl ChunkHeaderFormat {
    fn from_basic_header_byte(byte: u8) -> ChunkHeaderFormat {
        match (byte & FORMAT_MASK) >> 6 {
            0 => ChunkHeaderFormat::Full,
            1 => ChunkHeaderFormat::TimeDeltaWithoutMessageStreamId,
            2 => ChunkHeaderFormat::TimeDeltaOnly,
            _ => ChunkHeaderFormat::Empty,
        }
    }

    fn format_bits(self) -> u8 {
        match self {
            ChunkHeaderFormat::Full => 0b0000_0000,
            ChunkHeaderFormat::TimeDeltaWithoutMessageStreamId => 0b0100_0000,
            ChunkHeaderFormat::TimeDeltaOnly => 0b1000_0000,
            ChunkHeaderFormat::Empty => 0b1100_0000,
        }
    }

    /// Size of the message header that follows the basic header, excluding any extended
    /// timestamp
    pub fn message_header_length(self) -> usize {
        match self {
            ChunkHeaderFormat::Full => 11,
            ChunkHeaderFormat::TimeDeltaWithoutMessageStreamId => 7,
            ChunkHeaderFormat::TimeDeltaOnly => 3,
            ChunkHeaderFormat::Empty => 0,
        }
    }
}

/// Header values last seen (or sent) on one chunk stream.  Compressed headers take the fields
/// they omit from here.
#[derive(Debug, Default, Clone)]
pub struct ChunkStreamState {
    pub initialized: bool,
    pub timestamp: RtmpTimestamp,
    pub timestamp_delta: u32,
    pub message_length: u32,
    pub message_type_id: u8,
    pub message_stream_id: u32,

    /// Whether the last header with a timestamp field saturated it, in which case every
    /// format 3 chunk on this stream carries the extended field too
    pub has_extended_timestamp: bool,
}

/// Parses a basic header from the start of `bytes`.  Returns `None` if more bytes are needed,
/// otherwise the format, chunk stream id and the number of bytes the basic header used.
pub fn read_basic_header(bytes: &[u8]) -> Option<(ChunkHeaderFormat, u32, usize)> {
    let first = *bytes.first()?;
    let format = ChunkHeaderFormat::from_basic_header_byte(first);

    match first & CSID_MASK {
        0 => {
            let second = *bytes.get(1)?;
            Some((format, second as u32 + 64, 2))
        }

        1 => {
            let second = *bytes.get(1)?;
            let third = *bytes.get(2)?;
            Some((format, (third as u32) * 256 + second as u32 + 64, 3))
        }

        csid => Some((format, csid as u32, 1)),
    }
}

/// Appends a basic header.  The chunk stream id must already be known to be in range.
pub fn write_basic_header(bytes: &mut Vec<u8>, format: ChunkHeaderFormat, csid: u32) {
    let format_bits = format.format_bits();
    match csid {
        0..=63 => bytes.push(format_bits | csid as u8),
        64..=319 => {
            bytes.push(format_bits);
            bytes.push((csid - 64) as u8);
        }
        _ => {
            let id = csid - 64;
            bytes.push(format_bits | 1);
            bytes.push((id & 0xFF) as u8);
            bytes.push((id >> 8) as u8);
        }
    }
}
