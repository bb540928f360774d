//! Built-in world-manager message schemas.
//!
//! These are the schemas the client library itself needs: object
//! announcements, movement, properties, commands, and the object-info
//! request/response pair used to demonstrate blocking request correlation.
//! Applications register further schemas on a
//! [`crate::protocol::registry::MessageRegistry`].
//!
//! | Type | Topic | Direction |
//! |------|-------|-----------|
//! | [`NewObjectMessage`] | `wrldMgr.newObject` | read-only |
//! | [`FreeObjectMessage`] | `wrldMgr.freeObject` | read-only |
//! | [`DirLocOrientMessage`] | `wrldMgr.dirLocOrient` | read + write |
//! | [`PropertyMessage`] | `wrldMgr.property` | read + write |
//! | [`CommandMessage`] | `wrldMgr.command` | write-only |
//! | [`ObjInfoReqMessage`] | `wrldMgr.objInfoReq` | write-only |
//! | [`ObjInfoResponseMessage`] | `msgsvr.response` | read-only |
//! | [`ResponseMessage`] | `msgsvr.response` | read-only |

use crate::domain::geometry::{Quaternion, Vector};
use crate::domain::Oid;
use crate::protocol::codec::{Buffer, CodecError};
use crate::protocol::message::{Message, RESPONSE_TOPIC};

// ── Topics ────────────────────────────────────────────────────────────────────

pub mod topics {
    pub const NEW_OBJECT: &str = "wrldMgr.newObject";
    pub const FREE_OBJECT: &str = "wrldMgr.freeObject";
    pub const DIR_LOC_ORIENT: &str = "wrldMgr.dirLocOrient";
    pub const PROPERTY: &str = "wrldMgr.property";
    pub const COMMAND: &str = "wrldMgr.command";
    pub const OBJ_INFO_REQ: &str = "wrldMgr.objInfoReq";
}

// ── Object lifecycle ──────────────────────────────────────────────────────────

/// NEW_OBJECT: the server announces an object entering the client's view.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NewObjectMessage {
    pub oid: Oid,
    /// Application-defined kind code (terrain, mob, item, ...).
    pub object_type: i32,
    pub name: String,
    pub location: Vector,
    pub orientation: Quaternion,
}

impl Message for NewObjectMessage {
    fn topic(&self) -> &str {
        topics::NEW_OBJECT
    }

    fn oid(&self) -> Option<Oid> {
        Some(self.oid)
    }

    fn parse_message(&mut self, buf: &mut Buffer) -> Result<(), CodecError> {
        self.oid = buf.read_int64()?;
        self.object_type = buf.read_int32()?;
        self.name = buf.read_string()?;
        self.location = buf.read_vector()?;
        self.orientation = buf.read_quaternion()?;
        Ok(())
    }
}

/// FREE_OBJECT: the object left the client's view and may be discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FreeObjectMessage {
    pub oid: Oid,
}

impl Message for FreeObjectMessage {
    fn topic(&self) -> &str {
        topics::FREE_OBJECT
    }

    fn oid(&self) -> Option<Oid> {
        Some(self.oid)
    }

    fn parse_message(&mut self, buf: &mut Buffer) -> Result<(), CodecError> {
        self.oid = buf.read_int64()?;
        Ok(())
    }
}

// ── Movement and state ────────────────────────────────────────────────────────

/// DIR_LOC_ORIENT: heading, position, and rotation of an object.
///
/// Flows both ways: the server broadcasts movement and the client reports
/// the movement of the objects it controls.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DirLocOrientMessage {
    pub oid: Oid,
    pub direction: Vector,
    pub location: Vector,
    pub orientation: Quaternion,
}

impl Message for DirLocOrientMessage {
    fn topic(&self) -> &str {
        topics::DIR_LOC_ORIENT
    }

    fn oid(&self) -> Option<Oid> {
        Some(self.oid)
    }

    fn parse_message(&mut self, buf: &mut Buffer) -> Result<(), CodecError> {
        self.oid = buf.read_int64()?;
        self.direction = buf.read_vector()?;
        self.location = buf.read_vector()?;
        self.orientation = buf.read_quaternion()?;
        Ok(())
    }

    fn write_message(&self, buf: &mut Buffer) -> Result<(), CodecError> {
        buf.write_int64(self.oid);
        buf.write_vector(&self.direction);
        buf.write_vector(&self.location);
        buf.write_quaternion(&self.orientation);
        Ok(())
    }
}

/// PROPERTY: a single named string property of an object.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PropertyMessage {
    pub oid: Oid,
    pub key: String,
    pub value: String,
}

impl Message for PropertyMessage {
    fn topic(&self) -> &str {
        topics::PROPERTY
    }

    fn oid(&self) -> Option<Oid> {
        Some(self.oid)
    }

    fn parse_message(&mut self, buf: &mut Buffer) -> Result<(), CodecError> {
        self.oid = buf.read_int64()?;
        self.key = buf.read_string()?;
        self.value = buf.read_string()?;
        Ok(())
    }

    fn write_message(&self, buf: &mut Buffer) -> Result<(), CodecError> {
        buf.write_int64(self.oid);
        buf.write_string(&self.key)?;
        buf.write_string(&self.value)
    }
}

/// COMMAND: a free-form command issued by the client on behalf of an object.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CommandMessage {
    pub oid: Oid,
    pub command: String,
}

impl Message for CommandMessage {
    fn topic(&self) -> &str {
        topics::COMMAND
    }

    fn oid(&self) -> Option<Oid> {
        Some(self.oid)
    }

    fn write_message(&self, buf: &mut Buffer) -> Result<(), CodecError> {
        buf.write_int64(self.oid);
        buf.write_string(&self.command)
    }
}

// ── Request / response ────────────────────────────────────────────────────────

/// OBJ_INFO_REQ: asks the server to describe one object.
///
/// The server answers with a generic response frame (topic
/// [`RESPONSE_TOPIC`]) whose body is an [`ObjInfoResponseMessage`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ObjInfoReqMessage {
    pub oid: Oid,
}

impl Message for ObjInfoReqMessage {
    fn topic(&self) -> &str {
        topics::OBJ_INFO_REQ
    }

    fn oid(&self) -> Option<Oid> {
        Some(self.oid)
    }

    fn write_message(&self, buf: &mut Buffer) -> Result<(), CodecError> {
        buf.write_int64(self.oid);
        Ok(())
    }
}

/// Response body for [`ObjInfoReqMessage`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ObjInfoResponseMessage {
    pub oid: Oid,
    pub object_type: i32,
    pub name: String,
    pub location: Vector,
}

impl Message for ObjInfoResponseMessage {
    fn topic(&self) -> &str {
        RESPONSE_TOPIC
    }

    fn oid(&self) -> Option<Oid> {
        Some(self.oid)
    }

    fn parse_message(&mut self, buf: &mut Buffer) -> Result<(), CodecError> {
        self.oid = buf.read_int64()?;
        self.object_type = buf.read_int32()?;
        self.name = buf.read_string()?;
        self.location = buf.read_vector()?;
        Ok(())
    }
}

/// Fallback response: keeps the raw body when no typed response is
/// registered for the outstanding request's topic.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ResponseMessage {
    pub body: Vec<u8>,
}

impl Message for ResponseMessage {
    fn topic(&self) -> &str {
        RESPONSE_TOPIC
    }

    fn parse_message(&mut self, buf: &mut Buffer) -> Result<(), CodecError> {
        self.body = buf.read_remaining();
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::framing::MessageCode;

    /// Builds a server-side envelope by hand, as a peer would.
    fn envelope(topic: &str, body: impl FnOnce(&mut Buffer)) -> Buffer {
        let mut buf = Buffer::new();
        buf.write_byte(MessageCode::ServerMessage as u8);
        buf.write_string(topic).unwrap();
        body(&mut buf);
        buf
    }

    #[test]
    fn test_new_object_parses_all_fields() {
        // Arrange
        let mut buf = envelope(topics::NEW_OBJECT, |b| {
            b.write_int64(0x0000_0001_0000_0002);
            b.write_int32(4);
            b.write_string("Rock").unwrap();
            b.write_vector(&Vector::new(1.0, 2.0, 3.0));
            b.write_quaternion(&Quaternion::IDENTITY);
        });

        // Act
        let mut msg = NewObjectMessage::default();
        msg.parse_message_buffer(&mut buf).unwrap();

        // Assert
        assert_eq!(msg.oid, 0x0000_0001_0000_0002);
        assert_eq!(msg.object_type, 4);
        assert_eq!(msg.name, "Rock");
        assert_eq!(msg.location, Vector::new(1.0, 2.0, 3.0));
        assert_eq!(msg.orientation, Quaternion::IDENTITY);
        assert_eq!(msg.oid(), Some(0x0000_0001_0000_0002));
    }

    #[test]
    fn test_new_object_is_read_only() {
        let result = NewObjectMessage::default().get_message_buffer();
        assert!(matches!(
            result,
            Err(CodecError::UnsupportedOperation { operation: "write", .. })
        ));
    }

    #[test]
    fn test_truncated_new_object_is_underrun() {
        let mut buf = envelope(topics::NEW_OBJECT, |b| b.write_int64(1));
        let result = NewObjectMessage::default().parse_message_buffer(&mut buf);
        assert!(matches!(result, Err(CodecError::BufferUnderrun { .. })));
    }

    #[test]
    fn test_dir_loc_orient_round_trip() {
        let original = DirLocOrientMessage {
            oid: -12,
            direction: Vector::new(0.0, 0.0, 1.0),
            location: Vector::new(100.5, 0.0, -3.25),
            orientation: Quaternion::new(0.0, 1.0, 0.0, 0.0),
        };
        let mut buf = original.get_message_buffer().unwrap();
        let mut parsed = DirLocOrientMessage::default();
        parsed.parse_message_buffer(&mut buf).unwrap();
        assert_eq!(parsed, original);
    }

    #[test]
    fn test_property_round_trip_with_empty_value() {
        let original = PropertyMessage {
            oid: 3,
            key: "displayName".to_string(),
            value: String::new(),
        };
        let mut buf = original.get_message_buffer().unwrap();
        let mut parsed = PropertyMessage::default();
        parsed.parse_message_buffer(&mut buf).unwrap();
        assert_eq!(parsed, original);
    }

    #[test]
    fn test_command_is_write_only() {
        let cmd = CommandMessage {
            oid: 8,
            command: "/wave".to_string(),
        };
        let mut buf = cmd.get_message_buffer().unwrap();
        let result = CommandMessage::default().parse_message_buffer(&mut buf);
        assert!(matches!(
            result,
            Err(CodecError::UnsupportedOperation { operation: "parse", .. })
        ));
    }

    #[test]
    fn test_obj_info_req_layout() {
        let buf = ObjInfoReqMessage { oid: 42 }.get_message_buffer().unwrap();
        let expected = envelope(topics::OBJ_INFO_REQ, |b| b.write_int64(42));
        assert_eq!(buf.as_bytes(), expected.as_bytes());
    }

    #[test]
    fn test_obj_info_response_parses_under_response_topic() {
        let mut buf = envelope(RESPONSE_TOPIC, |b| {
            b.write_int64(42);
            b.write_int32(7);
            b.write_string("Lamp").unwrap();
            b.write_vector(&Vector::ZERO);
        });
        let mut msg = ObjInfoResponseMessage::default();
        msg.parse_message_buffer(&mut buf).unwrap();
        assert_eq!(msg.oid, 42);
        assert_eq!(msg.name, "Lamp");
        assert_eq!(msg.topic(), RESPONSE_TOPIC);
    }

    #[test]
    fn test_generic_response_keeps_raw_body() {
        let mut buf = envelope(RESPONSE_TOPIC, |b| b.write_bytes(&[1, 2, 3]));
        let mut msg = ResponseMessage::default();
        msg.parse_message_buffer(&mut buf).unwrap();
        assert_eq!(msg.body, vec![1, 2, 3]);
        assert_eq!(msg.oid(), None);
    }
}
