/// Where the client is in the command sequence
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum ClientState {
    Idle,
    HandshakeDone,
    ConnectSent,
    ConnectAcked,
    CreateStreamSent,
    StreamCreated,
    PublishSent,
    Publishing,
    PlaySent,
    Playing,
}
