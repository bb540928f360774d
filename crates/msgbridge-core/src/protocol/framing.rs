//! Frame layout and message codes.
//!
//! Wire format of one frame:
//! ```text
//! [payload_len:u32 BE][code:1][code-specific body...]
//! ```
//!
//! Immediately after the TCP connection is accepted, and before any frame,
//! the server sends a bare 4-byte big-endian session id.
//!
//! Code-specific bodies:
//! ```text
//! SUBSCRIBE           [sub_id:int32][filter]
//! UNSUBSCRIBE         [sub_id:int32]
//! SUBSCRIBE_RESPONSE  [sub_id:int32][success:bool]
//! SERVER_MESSAGE      [topic:string][topic-specific body]
//! ```

use crate::protocol::codec::{Buffer, CodecError};

/// Size of the length prefix in front of every frame.
pub const FRAME_HEADER_SIZE: usize = 4;

/// Size of the session id preamble sent by the server after accept.
pub const SESSION_ID_SIZE: usize = 4;

/// Default upper bound on a single frame payload (16 MiB).
pub const DEFAULT_MAX_FRAME_SIZE: u32 = 16 * 1024 * 1024;

// ── Message codes ─────────────────────────────────────────────────────────────

/// Leading byte of every frame payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MessageCode {
    Subscribe = 0,
    Unsubscribe = 1,
    SubscribeResponse = 2,
    ServerMessage = 3,
}

impl TryFrom<u8> for MessageCode {
    type Error = CodecError;

    fn try_from(value: u8) -> Result<Self, CodecError> {
        match value {
            0 => Ok(MessageCode::Subscribe),
            1 => Ok(MessageCode::Unsubscribe),
            2 => Ok(MessageCode::SubscribeResponse),
            3 => Ok(MessageCode::ServerMessage),
            other => Err(CodecError::UnknownMessageCode(other)),
        }
    }
}

// ── Control payloads ──────────────────────────────────────────────────────────

/// Decoded `SUBSCRIBE_RESPONSE` body.
///
/// `success == true` acknowledges a subscribe; `success == false`
/// acknowledges an unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscribeResponse {
    pub sub_id: i32,
    pub success: bool,
}

impl SubscribeResponse {
    /// Reads the body that follows the code byte.
    pub fn read(buf: &mut Buffer) -> Result<Self, CodecError> {
        let sub_id = buf.read_int32()?;
        let success = buf.read_bool()?;
        Ok(Self { sub_id, success })
    }

    /// Builds a complete payload (code included).
    pub fn to_payload(&self) -> Buffer {
        let mut buf = Buffer::with_capacity(6);
        buf.write_byte(MessageCode::SubscribeResponse as u8);
        buf.write_int32(self.sub_id);
        buf.write_bool(self.success);
        buf
    }
}

/// Builds an `UNSUBSCRIBE` payload.
pub fn unsubscribe_payload(sub_id: i32) -> Buffer {
    let mut buf = Buffer::with_capacity(5);
    buf.write_byte(MessageCode::Unsubscribe as u8);
    buf.write_int32(sub_id);
    buf
}

/// The 4-byte big-endian length header for a payload of `len` bytes.
///
/// # Errors
///
/// [`CodecError::FrameTooLarge`] if `len` does not fit the `u32` header.
pub fn frame_header(len: usize) -> Result<[u8; FRAME_HEADER_SIZE], CodecError> {
    u32::try_from(len)
        .map(u32::to_be_bytes)
        .map_err(|_| CodecError::FrameTooLarge(len))
}

/// Prepends the 4-byte big-endian length to `payload`.
pub fn encode_frame(payload: &[u8]) -> Result<Vec<u8>, CodecError> {
    let header = frame_header(payload.len())?;
    let mut out = Vec::with_capacity(FRAME_HEADER_SIZE + payload.len());
    out.extend_from_slice(&header);
    out.extend_from_slice(payload);
    Ok(out)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_code_values_match_wire() {
        assert_eq!(MessageCode::Subscribe as u8, 0);
        assert_eq!(MessageCode::Unsubscribe as u8, 1);
        assert_eq!(MessageCode::SubscribeResponse as u8, 2);
        assert_eq!(MessageCode::ServerMessage as u8, 3);
    }

    #[test]
    fn test_message_code_try_from_rejects_unknown() {
        assert_eq!(MessageCode::try_from(3), Ok(MessageCode::ServerMessage));
        assert_eq!(
            MessageCode::try_from(4),
            Err(CodecError::UnknownMessageCode(4))
        );
    }

    #[test]
    fn test_subscribe_response_payload_layout() {
        // Arrange
        let ack = SubscribeResponse {
            sub_id: 258,
            success: true,
        };

        // Act
        let mut payload = ack.to_payload();

        // Assert
        assert_eq!(payload.as_bytes(), &[2, 0, 0, 1, 2, 1]);
        assert_eq!(payload.read_byte().unwrap(), 2);
        assert_eq!(SubscribeResponse::read(&mut payload).unwrap(), ack);
    }

    #[test]
    fn test_subscribe_response_truncated_is_underrun() {
        let mut buf = Buffer::from_bytes(vec![0, 0, 0, 1]);
        assert!(matches!(
            SubscribeResponse::read(&mut buf),
            Err(CodecError::BufferUnderrun { .. })
        ));
    }

    #[test]
    fn test_unsubscribe_payload_layout() {
        assert_eq!(unsubscribe_payload(7).as_bytes(), &[1, 0, 0, 0, 7]);
    }

    #[test]
    fn test_encode_frame_prefixes_big_endian_length() {
        let frame = encode_frame(&[0xAA, 0xBB, 0xCC]).unwrap();
        assert_eq!(frame, vec![0, 0, 0, 3, 0xAA, 0xBB, 0xCC]);
    }

    #[test]
    fn test_encode_empty_frame() {
        assert_eq!(encode_frame(&[]), Ok(vec![0, 0, 0, 0]));
    }

    #[test]
    fn test_frame_header_accepts_largest_u32_length() {
        let max = u32::MAX as usize;
        assert_eq!(frame_header(max), Ok([0xFF, 0xFF, 0xFF, 0xFF]));
    }

    #[cfg(target_pointer_width = "64")]
    #[test]
    fn test_frame_header_rejects_length_beyond_u32() {
        let too_long = u32::MAX as usize + 1;
        assert_eq!(
            frame_header(too_long),
            Err(CodecError::FrameTooLarge(too_long))
        );
    }
}
