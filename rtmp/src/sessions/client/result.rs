use super::events::ClientSessionEvent;
use crate::messages::MessagePayload;

/// A single result of the client session processing a message or request
#[derive(PartialEq, Debug)]
pub enum ClientSessionResult {
    /// A message that must be sent to the server, in the order returned
    OutboundResponse(MessagePayload),

    /// The outbound chunk size must change to the given value before any following
    /// `OutboundResponse` is sent
    SetOutboundChunkSize(u32),

    RaisedEvent(ClientSessionEvent),

    /// A message the session has no use for, handed back so the caller can surface it
    UnhandleableMessageReceived(MessagePayload),
}
