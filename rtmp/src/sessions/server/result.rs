use super::events::ServerSessionEvent;
use crate::messages::MessagePayload;

/// A single result of the server session processing a message
#[derive(PartialEq, Debug)]
pub enum ServerSessionResult {
    /// A message that must be sent to the client, in the order returned
    OutboundResponse(MessagePayload),

    /// The outbound chunk size must change to the given value before any following
    /// `OutboundResponse` is sent
    SetOutboundChunkSize(u32),

    RaisedEvent(ServerSessionEvent),

    /// A message the session has no use for, handed back so the caller can surface it
    UnhandleableMessageReceived(MessagePayload),
}
