//! Subscription filters.
//!
//! A filter is sent to the server inside a `SUBSCRIBE` frame, telling it which
//! messages to forward to this client.  The same filter is also evaluated
//! locally by the application thread to route decoded messages to the right
//! subscription callback.
//!
//! Wire format:
//! ```text
//! TOPIC     [0:1][topic:string]
//! OID       [1:1][topic:string][oid:int64]
//! RESPONSE  [2:1][topic:string]
//! ```

use std::fmt;

use crate::domain::Oid;
use crate::protocol::codec::{Buffer, CodecError};
use crate::protocol::message::{Message, RESPONSE_TOPIC};

/// Filter type byte values.
pub mod filter_type {
    pub const TOPIC: u8 = 0;
    pub const OID: u8 = 1;
    pub const RESPONSE: u8 = 2;
}

/// Predicate selecting which inbound messages belong to a subscription.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MessageFilter {
    /// Every message on `topic`.
    Topic { topic: String },
    /// Messages on `topic` addressed to one object.
    Oid { topic: String, oid: Oid },
    /// Responses delivered on `topic` (normally [`RESPONSE_TOPIC`]).
    Response { topic: String },
}

impl MessageFilter {
    pub fn topic(topic: impl Into<String>) -> Self {
        MessageFilter::Topic {
            topic: topic.into(),
        }
    }

    pub fn oid(topic: impl Into<String>, oid: Oid) -> Self {
        MessageFilter::Oid {
            topic: topic.into(),
            oid,
        }
    }

    /// The filter for the well-known response topic.
    pub fn response() -> Self {
        MessageFilter::Response {
            topic: RESPONSE_TOPIC.to_string(),
        }
    }

    /// Topic this filter selects on.
    pub fn filter_topic(&self) -> &str {
        match self {
            MessageFilter::Topic { topic }
            | MessageFilter::Oid { topic, .. }
            | MessageFilter::Response { topic } => topic,
        }
    }

    /// Wire type byte.
    pub fn filter_type(&self) -> u8 {
        match self {
            MessageFilter::Topic { .. } => filter_type::TOPIC,
            MessageFilter::Oid { .. } => filter_type::OID,
            MessageFilter::Response { .. } => filter_type::RESPONSE,
        }
    }

    /// Whether `msg` passes this filter.
    pub fn matches(&self, msg: &dyn Message) -> bool {
        match self {
            MessageFilter::Topic { topic } | MessageFilter::Response { topic } => {
                msg.topic() == topic
            }
            MessageFilter::Oid { topic, oid } => msg.topic() == topic && msg.oid() == Some(*oid),
        }
    }

    /// Serializes the filter.
    ///
    /// # Errors
    ///
    /// [`CodecError::InvalidFilter`] for an empty topic, which no server can
    /// route.
    pub fn write(&self, buf: &mut Buffer) -> Result<(), CodecError> {
        if self.filter_topic().is_empty() {
            return Err(CodecError::InvalidFilter(
                "filter topic must not be empty".to_string(),
            ));
        }
        buf.write_byte(self.filter_type());
        buf.write_string(self.filter_topic())?;
        if let MessageFilter::Oid { oid, .. } = self {
            buf.write_int64(*oid);
        }
        Ok(())
    }

    /// Deserializes a filter (the server side of `SUBSCRIBE`).
    pub fn read(buf: &mut Buffer) -> Result<Self, CodecError> {
        let kind = buf.read_byte()?;
        let topic = buf.read_string()?;
        match kind {
            filter_type::TOPIC => Ok(MessageFilter::Topic { topic }),
            filter_type::OID => {
                let oid = buf.read_int64()?;
                Ok(MessageFilter::Oid { topic, oid })
            }
            filter_type::RESPONSE => Ok(MessageFilter::Response { topic }),
            other => Err(CodecError::UnknownFilterType(other)),
        }
    }
}

impl fmt::Display for MessageFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageFilter::Topic { topic } => write!(f, "topic={topic}"),
            MessageFilter::Oid { topic, oid } => write!(f, "topic={topic} oid={oid}"),
            MessageFilter::Response { topic } => write!(f, "response topic={topic}"),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
