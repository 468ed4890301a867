//! The unit of routing between the application and sessions.

use bytes::Bytes;

/// A tagged, opaque payload.
///
/// The tag selects the destination sessions (outbound) or the listener set
/// (inbound). The payload is never interpreted by the relay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    tag: String,
    data: Bytes,
}

impl Message {
    /// Create a new message.
    pub fn new(tag: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            tag: tag.into(),
            data: data.into(),
        }
    }

    /// Tag this message is routed by.
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Payload bytes.
    pub fn data(&self) -> &Bytes {
        &self.data
    }

    /// Consume the message into its tag and payload.
    pub fn into_parts(self) -> (String, Bytes) {
        (self.tag, self.data)
    }
}
