use serde::{Deserialize, Serialize};

/// Message type discriminator carried by remote procedure call requests.
pub const REMOTING_MESSAGE_TYPE: &str = "flex.messaging.messages.RemotingMessage";

/// Inbound remote-call request, reduced to the fields dispatch needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemotingRequest {
    /// Message type discriminator used to scope destination lookup.
    pub message_type: String,
    /// Destination id the client addressed.
    pub destination: String,
    /// Name of the operation to invoke on the service.
    pub operation: String,
}

impl RemotingRequest {
    pub fn new(
        message_type: impl Into<String>,
        destination: impl Into<String>,
        operation: impl Into<String>,
    ) -> Self {
        Self {
            message_type: message_type.into(),
            destination: destination.into(),
            operation: operation.into(),
        }
    }

    /// A remoting request with the standard message type.
    pub fn remoting(destination: impl Into<String>, operation: impl Into<String>) -> Self {
        Self::new(REMOTING_MESSAGE_TYPE, destination, operation)
    }
}
