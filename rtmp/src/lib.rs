/*!
An RTMP protocol engine.

The lower layers are sans-IO and can be driven by any transport:

* `handshake` negotiates the connection's opening packets
* `chunk_io` splits messages into chunks and reassembles them, tracking the chunk size,
acknowledgement window and peer bandwidth announced by the remote peer
* `messages` converts chunk payloads to and from typed RTMP messages
* `sessions` holds the client and server state machines for the `connect`, `createStream`
and `publish` / `play` exchanges
* `media` frames H.264, H.265, AV1, VP9 and audio access units as message payloads, in both
the legacy and the Enhanced RTMP formats

`connection` ties these together over a blocking `Read + Write` stream, and `Reader` and
`Writer` work on whole tracks on top of an established connection.
*/

#[cfg(test)]
#[macro_use]
mod test_utils;

pub mod chunk_io;
pub mod connection;
pub mod handshake;
pub mod media;
pub mod messages;
pub mod sessions;
pub mod time;

mod reader;
mod writer;

pub use crate::reader::{Reader, ReaderConfig, ReaderEvent};
pub use crate::writer::Writer;
