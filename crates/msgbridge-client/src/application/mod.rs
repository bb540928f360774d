//! Application layer of the client library.
//!
//! # What lives here?
//!
//! - **`session`** – The `Session`: one connection to the message server, a
//!   reader thread that sorts inbound frames, and the blocking
//!   subscribe/unsubscribe/request calls application threads use.
//!
//! - **`subscription`** – A server-acknowledged subscription: its id, its
//!   filter, and the callback `Session::dispatch` runs for matching messages.

pub mod session;
pub mod subscription;
