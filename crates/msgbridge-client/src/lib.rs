//! msgbridge-client library entry point.
//!
//! # What does msgbridge-client do? (for beginners)
//!
//! A message-bridge server relays topic-tagged messages between connected
//! clients.  This crate is the client side of one such connection:
//!
//! 1. Connects over TCP and reads the session id the server assigns.
//! 2. Starts a background reader thread that owns the receiving half of the
//!    socket.
//! 3. Lets application threads subscribe to topics (blocking until the
//!    server acknowledges), send requests and block for the response, and
//!    pull published messages from a FIFO queue.
//! 4. Shuts everything down cleanly, waking any thread still blocked.
//!
//! ```no_run
//! use std::sync::Arc;
//! use msgbridge_client::{ClientConfig, Session};
//! use msgbridge_core::protocol::messages::topics;
//! use msgbridge_core::{MessageFilter, MessageRegistry};
//!
//! let config = ClientConfig::default();
//! let registry = Arc::new(MessageRegistry::with_defaults());
//! let session = Session::connect(&config.connection, Arc::clone(&registry))?;
//! session.startup()?;
//! session.create_subscription(MessageFilter::topic(topics::NEW_OBJECT), |_msg| {})?;
//!
//! while let Some(mut frame) = session.get_next_message_buffer() {
//!     let msg = registry.decode(&mut frame)?;
//!     session.dispatch(msg.as_ref());
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

/// Application layer: the session and its subscriptions.
pub mod application;

/// Infrastructure layer: TCP transport, configuration, logging.
pub mod infrastructure;

pub use application::session::{Session, SessionConfig, SessionError};
pub use application::subscription::{Subscription, SubscriptionCallback};
pub use infrastructure::config::{ClientConfig, ConfigError, ConnectionConfig, LoggingConfig};
pub use infrastructure::socket::{Socket, SocketError, Transport};
