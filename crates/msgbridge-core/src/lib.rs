//! # msgbridge-core
//!
//! Shared library for the msgbridge client containing the binary wire codec,
//! the message envelope and schemas, subscription filters, the topic
//! registry, and the concurrency primitives the session is built from.
//!
//! This crate has no networking code.  Sockets and the session live in
//! `msgbridge-client`.
//!
//! # Architecture overview (for beginners)
//!
//! A message-bridge server relays topic-tagged messages between clients.  A
//! client subscribes to the topics it cares about, the server forwards every
//! matching message, and a client can also send a request and block for the
//! answer.
//!
//! This crate (`msgbridge-core`) is the shared foundation.  It defines:
//!
//! - **`protocol`** – How bytes travel over the network.  A [`Buffer`]
//!   encodes integers, floats, strings and geometry in big-endian order;
//!   every message is wrapped in an envelope carrying its topic, and the
//!   [`MessageRegistry`] turns an envelope back into a typed message.
//!
//! - **`domain`** – Plain value types (object ids, vectors, quaternions)
//!   carried inside messages.
//!
//! - **`sync`** – Monitors, semaphores, events, a reader/writer lock and a
//!   thread wrapper used to coordinate the socket-reader thread with
//!   application threads.

pub mod domain;
pub mod protocol;
pub mod sync;

// Re-export the most-used types at the crate root so callers can write
// `msgbridge_core::Buffer` instead of `msgbridge_core::protocol::codec::Buffer`.
pub use domain::geometry::{IntVector, Quaternion, Vector};
pub use domain::Oid;
pub use protocol::codec::{Buffer, CodecError};
pub use protocol::filter::MessageFilter;
pub use protocol::message::{Message, RESPONSE_TOPIC};
pub use protocol::registry::MessageRegistry;
