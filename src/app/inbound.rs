//! Inbound messages to the application service.
//!
//! One [`InboundMessage`] is one delivery from the bus.  The dispatcher
//! hands them to the [`AppService`](super::service::AppService) strictly
//! one at a time, in arrival order.

/// A single bus delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub topic: String,
    pub payload: Vec<u8>,
}

impl InboundMessage {
    pub fn new(topic: impl Into<String>, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            topic: topic.into(),
            payload: payload.into(),
        }
    }
}

/// What happened to a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Normalised and fully processed.
    Processed,
    /// Topic not subscribed by this service.
    UnknownTopic,
    /// Payload unparsable or carried no usable number.
    Malformed,
}
