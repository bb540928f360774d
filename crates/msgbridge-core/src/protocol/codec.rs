//! Cursor-based binary codec for message-bridge payloads.
//!
//! Wire rules:
//! ```text
//! bool        [0|1:1]
//! byte        [b:1]
//! int32       [i32:4]                      big-endian
//! single      [f32 bits:4]                 big-endian bit pattern
//! int64       [high:i32:4][low:i32:4]      two separate big-endian words
//! string      [len:i32:4][utf8:len]        no terminator
//! vector      [x:single][y:single][z:single]
//! int_vector  [x:int32][y:int32][z:int32]
//! quaternion  [x:single][y:single][z:single][w:single]
//! ```
//!
//! The 64-bit split into two 32-bit words and the float bit reinterpretation
//! are wire-format requirements shared with every existing peer, not
//! implementation details.  Do not "simplify" them into `i64::to_be_bytes`.
//!
//! # Reading model (for beginners)
//!
//! A [`Buffer`] owns a growable byte vector plus two cursors:
//!
//! - `read_offset` – where the next `read_*` call starts.  Writes always append
//!   to the end and never move it.
//! - `mark_offset` – a saved position.  [`Buffer::reset`] jumps `read_offset`
//!   back to it.  A fresh buffer is marked at 0, so `reset` rewinds to the start.
//!
//! `peek_*` methods perform the matching `read_*` and then restore
//! `read_offset`, so the caller can look at the next value without consuming it.
//! Every read is all-or-nothing: when the buffer is too short the read fails
//! with [`CodecError::BufferUnderrun`] and the cursor is left where it was.

use thiserror::Error;

use crate::domain::geometry::{IntVector, Quaternion, Vector};

/// Errors that can occur while encoding or decoding message-bridge data.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CodecError {
    /// A read needed more bytes than remain after the cursor.
    #[error("buffer underrun: need {needed} bytes, {available} available")]
    BufferUnderrun { needed: usize, available: usize },

    /// The message type does not support the requested direction
    /// (parsing a write-only type, or writing a read-only one).
    #[error("{operation} is not supported for messages on topic '{topic}'")]
    UnsupportedOperation {
        topic: String,
        operation: &'static str,
    },

    /// The first envelope byte was not `SERVER_MESSAGE`.
    #[error("unexpected envelope code: {0}")]
    UnexpectedEnvelope(u8),

    /// No message type is registered for the topic.
    #[error("no message type registered for topic '{0}'")]
    UnknownTopic(String),

    /// The leading byte of a frame is not a known message code.
    #[error("unknown message code: {0}")]
    UnknownMessageCode(u8),

    /// The leading byte of a serialized filter is not a known filter type.
    #[error("unknown filter type: {0}")]
    UnknownFilterType(u8),

    /// A length-prefixed string was negative, too long, or not UTF-8.
    #[error("invalid string: {0}")]
    InvalidString(String),

    /// A filter could not be serialized.
    #[error("invalid filter: {0}")]
    InvalidFilter(String),

    /// A payload is too long for the `u32` frame length header.
    #[error("payload of {0} bytes does not fit a frame header")]
    FrameTooLarge(usize),
}

/// A growable byte buffer with a read cursor and a saved mark.
///
/// Invariant: `mark_offset <= len` and `read_offset <= len` at all times.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Buffer {
    data: Vec<u8>,
    read_offset: usize,
    mark_offset: usize,
}

impl Buffer {
    /// Creates an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty buffer with room for `capacity` bytes.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: Vec::with_capacity(capacity),
            read_offset: 0,
            mark_offset: 0,
        }
    }

    /// Wraps existing bytes; the cursor starts at the first byte.
    pub fn from_bytes(data: Vec<u8>) -> Self {
        Self {
            data,
            read_offset: 0,
            mark_offset: 0,
        }
    }

    /// All bytes written so far, independent of the cursor.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Consumes the buffer, returning its bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    /// Total number of bytes in the buffer.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the buffer holds no bytes at all.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Bytes left between the cursor and the end.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.read_offset
    }

    /// Current read cursor.
    pub fn read_offset(&self) -> usize {
        self.read_offset
    }

    /// Saves the current read cursor as the mark.
    pub fn mark(&mut self) {
        self.mark_offset = self.read_offset;
    }

    /// Restores the read cursor to the mark.
    pub fn reset(&mut self) {
        self.read_offset = self.mark_offset;
    }

    /// Moves both the mark and the read cursor back to the first byte.
    pub fn rewind(&mut self) {
        self.mark_offset = 0;
        self.read_offset = 0;
    }

    // ── Writing ──────────────────────────────────────────────────────────────

    pub fn write_bool(&mut self, value: bool) {
        self.data.push(u8::from(value));
    }

    pub fn write_byte(&mut self, value: u8) {
        self.data.push(value);
    }

    pub fn write_int32(&mut self, value: i32) {
        self.data.extend_from_slice(&value.to_be_bytes());
    }

    /// Writes the high 32 bits, then the low 32 bits, each as a big-endian word.
    pub fn write_int64(&mut self, value: i64) {
        self.write_int32((value >> 32) as i32);
        self.write_int32(value as i32);
    }

    pub fn write_single(&mut self, value: f32) {
        self.data.extend_from_slice(&value.to_bits().to_be_bytes());
    }

    /// Writes an `int32` length prefix followed by the raw UTF-8 bytes.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::InvalidString`] if the string is longer than
    /// `i32::MAX` bytes.
    pub fn write_string(&mut self, value: &str) -> Result<(), CodecError> {
        let len = i32::try_from(value.len()).map_err(|_| {
            CodecError::InvalidString(format!("{} bytes exceeds the int32 prefix", value.len()))
        })?;
        self.write_int32(len);
        self.data.extend_from_slice(value.as_bytes());
        Ok(())
    }

    pub fn write_vector(&mut self, value: &Vector) {
        self.write_single(value.x);
        self.write_single(value.y);
        self.write_single(value.z);
    }

    pub fn write_int_vector(&mut self, value: &IntVector) {
        self.write_int32(value.x);
        self.write_int32(value.y);
        self.write_int32(value.z);
    }

    pub fn write_quaternion(&mut self, value: &Quaternion) {
        self.write_single(value.x);
        self.write_single(value.y);
        self.write_single(value.z);
        self.write_single(value.w);
    }

    /// Appends raw bytes with no prefix.
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.data.extend_from_slice(bytes);
    }

    // ── Reading ──────────────────────────────────────────────────────────────

    pub fn read_bool(&mut self) -> Result<bool, CodecError> {
        Ok(self.read_byte()? != 0)
    }

    pub fn read_byte(&mut self) -> Result<u8, CodecError> {
        Ok(self.take(1)?[0])
    }

    pub fn read_int32(&mut self) -> Result<i32, CodecError> {
        Ok(i32::from_be_bytes(self.take_array()?))
    }

    /// Reads two big-endian words (high then low) and joins them.
    pub fn read_int64(&mut self) -> Result<i64, CodecError> {
        self.atomically(|buf| {
            let high = buf.read_int32()? as i64;
            let low = buf.read_int32()? as u32 as i64;
            Ok((high << 32) | low)
        })
    }

    pub fn read_single(&mut self) -> Result<f32, CodecError> {
        Ok(f32::from_bits(u32::from_be_bytes(self.take_array()?)))
    }

    /// Reads an `int32` length prefix and that many UTF-8 bytes.
    ///
    /// # Errors
    ///
    /// [`CodecError::BufferUnderrun`] if the prefix or body is truncated,
    /// [`CodecError::InvalidString`] for a negative prefix or invalid UTF-8.
    pub fn read_string(&mut self) -> Result<String, CodecError> {
        self.atomically(|buf| {
            let len = buf.read_int32()?;
            let len = usize::try_from(len)
                .map_err(|_| CodecError::InvalidString(format!("negative length prefix {len}")))?;
            let bytes = buf.take(len)?;
            String::from_utf8(bytes.to_vec())
                .map_err(|e| CodecError::InvalidString(format!("invalid UTF-8: {e}")))
        })
    }

    pub fn read_vector(&mut self) -> Result<Vector, CodecError> {
        self.atomically(|buf| {
            Ok(Vector {
                x: buf.read_single()?,
                y: buf.read_single()?,
                z: buf.read_single()?,
            })
        })
    }

    pub fn read_int_vector(&mut self) -> Result<IntVector, CodecError> {
        self.atomically(|buf| {
            Ok(IntVector {
                x: buf.read_int32()?,
                y: buf.read_int32()?,
                z: buf.read_int32()?,
            })
        })
    }

    pub fn read_quaternion(&mut self) -> Result<Quaternion, CodecError> {
        self.atomically(|buf| {
            Ok(Quaternion {
                x: buf.read_single()?,
                y: buf.read_single()?,
                z: buf.read_single()?,
                w: buf.read_single()?,
            })
        })
    }

    /// Reads exactly `len` raw bytes.
    pub fn read_bytes(&mut self, len: usize) -> Result<Vec<u8>, CodecError> {
        Ok(self.take(len)?.to_vec())
    }

    /// Reads everything after the cursor.
    pub fn read_remaining(&mut self) -> Vec<u8> {
        let rest = self.data[self.read_offset..].to_vec();
        self.read_offset = self.data.len();
        rest
    }

    // ── Peeking ──────────────────────────────────────────────────────────────

    pub fn peek_bool(&mut self) -> Result<bool, CodecError> {
        self.peek(Self::read_bool)
    }

    pub fn peek_byte(&mut self) -> Result<u8, CodecError> {
        self.peek(Self::read_byte)
    }

    pub fn peek_int32(&mut self) -> Result<i32, CodecError> {
        self.peek(Self::read_int32)
    }

    pub fn peek_int64(&mut self) -> Result<i64, CodecError> {
        self.peek(Self::read_int64)
    }

    pub fn peek_single(&mut self) -> Result<f32, CodecError> {
        self.peek(Self::read_single)
    }

    pub fn peek_string(&mut self) -> Result<String, CodecError> {
        self.peek(Self::read_string)
    }

    pub fn peek_vector(&mut self) -> Result<Vector, CodecError> {
        self.peek(Self::read_vector)
    }

    pub fn peek_int_vector(&mut self) -> Result<IntVector, CodecError> {
        self.peek(Self::read_int_vector)
    }

    pub fn peek_quaternion(&mut self) -> Result<Quaternion, CodecError> {
        self.peek(Self::read_quaternion)
    }

    // ── Helpers ──────────────────────────────────────────────────────────────

    /// Runs `read` and restores the cursor whatever the outcome.
    ///
    /// Use this to look ahead through several fields at once, for example
    /// the envelope code and topic of a frame that must stay unconsumed.
    pub fn peek_with<T>(
        &mut self,
        read: impl FnOnce(&mut Self) -> Result<T, CodecError>,
    ) -> Result<T, CodecError> {
        let saved = self.read_offset;
        let result = read(self);
        self.read_offset = saved;
        result
    }

    fn peek<T>(&mut self, read: fn(&mut Self) -> Result<T, CodecError>) -> Result<T, CodecError> {
        self.peek_with(read)
    }

    /// Runs a multi-field read; on failure the cursor is restored so partial
    /// reads never leak.
    fn atomically<T>(
        &mut self,
        read: impl FnOnce(&mut Self) -> Result<T, CodecError>,
    ) -> Result<T, CodecError> {
        let saved = self.read_offset;
        let result = read(self);
        if result.is_err() {
            self.read_offset = saved;
        }
        result
    }

    fn take(&mut self, len: usize) -> Result<&[u8], CodecError> {
        let available = self.remaining();
        if len > available {
            return Err(CodecError::BufferUnderrun {
                needed: len,
                available,
            });
        }
        let start = self.read_offset;
        self.read_offset += len;
        Ok(&self.data[start..start + len])
    }

    fn take_array<const N: usize>(&mut self) -> Result<[u8; N], CodecError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }
}

impl From<Vec<u8>> for Buffer {
    fn from(data: Vec<u8>) -> Self {
        Self::from_bytes(data)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
