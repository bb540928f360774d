//! The [`Message`] trait and the envelope every message travels in.
//!
//! Envelope layout (the payload of a `SERVER_MESSAGE` frame):
//! ```text
//! [SERVER_MESSAGE:1][topic:string][topic-specific body]
//! ```
//!
//! A concrete schema only implements the body: [`Message::parse_message`]
//! and/or [`Message::write_message`].  The envelope is handled once, here, by
//! [`Message::parse_message_buffer`] and [`Message::get_message_buffer`].
//!
//! # Read-only and write-only schemas
//!
//! Some schemas only ever flow in one direction: the server announces new
//! objects but never accepts that announcement from a client, and a client
//! sends commands the server never echoes back.  Such types simply leave the
//! other direction unimplemented; the default bodies fail loudly with
//! [`CodecError::UnsupportedOperation`] instead of producing garbage.

use std::any::Any;
use std::fmt;

use crate::domain::Oid;
use crate::protocol::codec::{Buffer, CodecError};
use crate::protocol::framing::MessageCode;

/// Topic of every generic response frame sent back for a request.
pub const RESPONSE_TOPIC: &str = "msgsvr.response";

/// Object-safe access to [`Any`] for downcasting boxed messages.
///
/// Implemented automatically for every sized `'static + Send` type.
pub trait AsAny: Any + Send {
    fn as_any(&self) -> &dyn Any;
    fn into_any(self: Box<Self>) -> Box<dyn Any + Send>;
}

impl<T: Any + Send> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any + Send> {
        self
    }
}

/// A topic-tagged message schema.
pub trait Message: AsAny + Sync + fmt::Debug {
    /// Topic string naming this schema on the wire.
    fn topic(&self) -> &str;

    /// Object id for schemas addressed to one remote entity.
    fn oid(&self) -> Option<Oid> {
        None
    }

    /// Reads the topic-specific body.  Default: the schema is write-only.
    fn parse_message(&mut self, _buf: &mut Buffer) -> Result<(), CodecError> {
        Err(CodecError::UnsupportedOperation {
            topic: self.topic().to_string(),
            operation: "parse",
        })
    }

    /// Writes the topic-specific body.  Default: the schema is read-only.
    fn write_message(&self, _buf: &mut Buffer) -> Result<(), CodecError> {
        Err(CodecError::UnsupportedOperation {
            topic: self.topic().to_string(),
            operation: "write",
        })
    }

    /// Reads the envelope byte and topic, then the body.
    ///
    /// # Errors
    ///
    /// [`CodecError::UnexpectedEnvelope`] if the first byte is not
    /// `SERVER_MESSAGE`; any error from the body parser.
    fn parse_message_buffer(&mut self, buf: &mut Buffer) -> Result<(), CodecError> {
        let code = buf.read_byte()?;
        if code != MessageCode::ServerMessage as u8 {
            return Err(CodecError::UnexpectedEnvelope(code));
        }
        let _topic = buf.read_string()?;
        self.parse_message(buf)
    }

    /// Serializes envelope + body and rewinds the cursor so the result can be
    /// read straight away by a transport.
    fn get_message_buffer(&self) -> Result<Buffer, CodecError> {
        let mut buf = Buffer::new();
        buf.write_byte(MessageCode::ServerMessage as u8);
        buf.write_string(self.topic())?;
        self.write_message(&mut buf)?;
        buf.reset();
        Ok(buf)
    }
}

impl dyn Message {
    /// Whether the boxed message is a `T`.
    pub fn is<T: Message>(&self) -> bool {
        self.as_any().is::<T>()
    }

    /// Borrows the message as a `T` if that is its concrete type.
    pub fn downcast_ref<T: Message>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }

    /// Converts a boxed message into a `T`, handing the box back on mismatch.
    pub fn downcast<T: Message>(self: Box<Self>) -> Result<Box<T>, Box<dyn Message>> {
        if (*self).is::<T>() {
            match self.into_any().downcast::<T>() {
                Ok(concrete) => Ok(concrete),
                // `is::<T>()` held a line above, so this arm cannot be taken.
                Err(_) => unreachable!("type check and downcast disagree"),
            }
        } else {
            Err(self)
        }
    }
}

/// Reads the topic of an enveloped message without consuming anything.
pub fn peek_topic(buf: &mut Buffer) -> Result<String, CodecError> {
    buf.peek_with(|b| {
        let code = b.read_byte()?;
        if code != MessageCode::ServerMessage as u8 {
            return Err(CodecError::UnexpectedEnvelope(code));
        }
        b.read_string()
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────
