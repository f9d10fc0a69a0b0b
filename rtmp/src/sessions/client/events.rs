/// Progress notifications raised by a client session
#[derive(PartialEq, Debug, Clone)]
pub enum ClientSessionEvent {
    /// The server accepted the `connect` request
    ConnectionRequestAccepted,

    /// The server created a stream for the client to publish or play on
    StreamCreated { stream_id: u32 },

    /// The server answered `publish` with `NetStream.Publish.Start`
    PublishRequestAccepted { stream_id: u32 },

    /// The server answered `play` with `NetStream.Play.Start`
    PlaybackRequestAccepted { stream_id: u32 },
}
