/// Where the server is in the command sequence
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum ServerState {
    Idle,
    HandshakeDone,
    AwaitConnect,
    ConnectAcked,
    AwaitCreateStream,
    StreamCreated,
    AwaitPublishOrPlay,
    Publishing,
    Playing,
}
