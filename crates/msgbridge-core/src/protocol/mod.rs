//! Protocol module: the binary buffer, frame envelope, message schemas,
//! subscription filters and the topic registry.

pub mod codec;
pub mod filter;
pub mod framing;
pub mod message;
pub mod messages;
pub mod registry;
pub mod sequence;

pub use codec::{Buffer, CodecError};
pub use filter::MessageFilter;
pub use framing::{MessageCode, SubscribeResponse};
pub use message::{peek_topic, Message, RESPONSE_TOPIC};
pub use registry::{MessageConstructor, MessageRegistry};
pub use sequence::SubscriptionIdAllocator;
