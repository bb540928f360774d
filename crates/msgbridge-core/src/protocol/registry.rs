//! Topic → message type registry.
//!
//! Turning a raw `SERVER_MESSAGE` frame into a typed message needs one piece
//! of information the frame itself carries: its topic.  The registry maps each
//! topic to a constructor producing an empty message of the right type, which
//! then parses the frame.
//!
//! Generic responses all travel on [`RESPONSE_TOPIC`], so the topic alone
//! cannot say which type to build.  For those the registry keeps a second map
//! keyed by the topic of the *request* that is waiting for the answer.
//!
//! ```rust
//! use msgbridge_core::protocol::registry::MessageRegistry;
//! use msgbridge_core::protocol::messages::{topics, DirLocOrientMessage};
//! use msgbridge_core::protocol::message::Message;
//!
//! let registry = MessageRegistry::with_defaults();
//! let original = DirLocOrientMessage { oid: 7, ..Default::default() };
//! let mut frame = original.get_message_buffer().unwrap();
//!
//! let decoded = registry.decode(&mut frame).unwrap();
//! assert_eq!(decoded.topic(), topics::DIR_LOC_ORIENT);
//! assert_eq!(decoded.oid(), Some(7));
//! ```

use std::collections::HashMap;

use tracing::debug;

use crate::protocol::codec::{Buffer, CodecError};
use crate::protocol::message::{peek_topic, Message, RESPONSE_TOPIC};
use crate::protocol::messages::{
    topics, DirLocOrientMessage, FreeObjectMessage, NewObjectMessage, ObjInfoResponseMessage,
    PropertyMessage, ResponseMessage,
};

/// Builds an empty message ready to parse.
pub type MessageConstructor = fn() -> Box<dyn Message>;

/// Maps topics (and request topics, for responses) to constructors.
#[derive(Debug, Clone, Default)]
pub struct MessageRegistry {
    by_topic: HashMap<String, MessageConstructor>,
    responses: HashMap<String, MessageConstructor>,
}

fn boxed<T: Message + Default>() -> Box<dyn Message> {
    Box::<T>::default()
}

impl MessageRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding every built-in inbound schema.
    ///
    /// Write-only schemas (commands, requests) are not registered: nothing
    /// inbound ever needs to be parsed as one.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(topics::NEW_OBJECT, boxed::<NewObjectMessage>);
        registry.register(topics::FREE_OBJECT, boxed::<FreeObjectMessage>);
        registry.register(topics::DIR_LOC_ORIENT, boxed::<DirLocOrientMessage>);
        registry.register(topics::PROPERTY, boxed::<PropertyMessage>);
        registry.register(RESPONSE_TOPIC, boxed::<ResponseMessage>);
        registry.register_response(topics::OBJ_INFO_REQ, boxed::<ObjInfoResponseMessage>);
        registry
    }

    /// Registers (or replaces) the constructor for `topic`.
    ///
    /// Returns the constructor previously registered for the topic, if any.
    pub fn register(
        &mut self,
        topic: impl Into<String>,
        constructor: MessageConstructor,
    ) -> Option<MessageConstructor> {
        self.by_topic.insert(topic.into(), constructor)
    }

    /// Registers the response type for requests sent on `request_topic`.
    pub fn register_response(
        &mut self,
        request_topic: impl Into<String>,
        constructor: MessageConstructor,
    ) -> Option<MessageConstructor> {
        self.responses.insert(request_topic.into(), constructor)
    }

    pub fn is_registered(&self, topic: &str) -> bool {
        self.by_topic.contains_key(topic)
    }

    /// All registered topics, in no particular order.
    pub fn topics(&self) -> impl Iterator<Item = &str> {
        self.by_topic.keys().map(String::as_str)
    }

    /// Creates an empty message for `topic`.
    ///
    /// # Errors
    ///
    /// [`CodecError::UnknownTopic`] when nothing is registered for it.
    pub fn create(&self, topic: &str) -> Result<Box<dyn Message>, CodecError> {
        self.by_topic
            .get(topic)
            .map(|constructor| constructor())
            .ok_or_else(|| CodecError::UnknownTopic(topic.to_string()))
    }

    /// Decodes an enveloped frame into its registered type.
    ///
    /// On error the buffer may be partially consumed.
    pub fn decode(&self, buf: &mut Buffer) -> Result<Box<dyn Message>, CodecError> {
        let topic = peek_topic(buf)?;
        let mut msg = self.create(&topic)?;
        msg.parse_message_buffer(buf)?;
        Ok(msg)
    }

    /// Decodes a generic response frame as the type registered for the
    /// request topic, falling back to [`ResponseMessage`].
    pub fn decode_response(
        &self,
        request_topic: Option<&str>,
        buf: &mut Buffer,
    ) -> Result<Box<dyn Message>, CodecError> {
        let constructor = request_topic
            .and_then(|topic| self.responses.get(topic))
            .copied();
        let mut msg = match constructor {
            Some(constructor) => constructor(),
            None => {
                debug!(
                    request_topic = request_topic.unwrap_or("<none>"),
                    "no typed response registered; keeping raw body"
                );
                boxed::<ResponseMessage>()
            }
        };
        msg.parse_message_buffer(buf)?;
        Ok(msg)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
