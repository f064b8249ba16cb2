use std::fmt;

/// Position of a message in its log.
///
/// Offset-addressed logs commit by offset; Redis Streams acknowledge by entry id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MessageId {
    Offset(u64),
    Entry(String),
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageId::Offset(offset) => write!(f, "offset:{}", offset),
            MessageId::Entry(id) => f.write_str(id),
        }
    }
}

/// A raw message as fetched from the broker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamMessage {
    pub id: MessageId,
    pub key: Option<String>,
    pub payload: Vec<u8>,
}

impl StreamMessage {
    pub fn new(id: MessageId, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            id,
            key: None,
            payload: payload.into(),
        }
    }

    /// Payload as UTF-8, lossy. For logging only.
    pub fn payload_lossy(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_id_display() {
        assert_eq!(MessageId::Offset(7).to_string(), "offset:7");
        assert_eq!(MessageId::Entry("1700000000000-0".into()).to_string(), "1700000000000-0");
    }
}
