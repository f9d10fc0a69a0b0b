/// Progress notifications raised by a server session
#[derive(PartialEq, Debug, Clone)]
pub enum ServerSessionEvent {
    /// The client connected to the given application
    ConnectionAccepted { app_name: String },

    StreamCreated { stream_id: u32 },

    /// The client started publishing on the stream key
    PublishStarted {
        app_name: String,
        stream_key: String,
        stream_id: u32,
    },

    /// The client started playback of the stream key
    PlaybackStarted {
        app_name: String,
        stream_key: String,
        stream_id: u32,
    },

    /// The client closed or deleted the stream it was publishing or playing on
    StreamFinished { stream_key: String, stream_id: u32 },
}
