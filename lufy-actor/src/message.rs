//! Opaque actor messages.

use bytes::Bytes;

/// An opaque message delivered to an actor's mailbox.
///
/// A message carries a tag identifying its kind to the receiving handler and
/// an immutable payload. The runtime never inspects the payload; decoding it
/// into a concrete type is the handler's responsibility.
#[derive(Debug, Clone)]
pub struct Message {
    tag: String,
    payload: Bytes,
}

impl Message {
    /// Construct a new message. The message is immutable after this call.
    pub fn new(tag: impl Into<String>, payload: impl Into<Bytes>) -> Self {
        Self {
            tag: tag.into(),
            payload: payload.into(),
        }
    }

    /// The message's tag.
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// The message's payload bytes.
    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    /// Consume the message, returning its parts.
    pub fn into_parts(self) -> (String, Bytes) {
        (self.tag, self.payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_exposes_tag_and_payload() {
        let msg = Message::new("login", Bytes::from_static(b"hello"));
        assert_eq!(msg.tag(), "login");
        assert_eq!(msg.payload().as_ref(), b"hello");
    }

    #[test]
    fn into_parts_round_trips() {
        let msg = Message::new("ping", Bytes::from_static(b"x"));
        let (tag, payload) = msg.into_parts();
        assert_eq!(tag, "ping");
        assert_eq!(payload.as_ref(), b"x");
    }
}
