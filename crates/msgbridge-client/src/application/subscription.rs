//! Active subscriptions and their callbacks.

use std::fmt;
use std::sync::Arc;

use msgbridge_core::{Message, MessageFilter};

/// Callback invoked for each message routed to a subscription.
pub type SubscriptionCallback = Arc<dyn Fn(&dyn Message) + Send + Sync>;

/// A server-acknowledged interest in messages matching a [`MessageFilter`].
///
/// Returned by `Session::create_subscription` and shared between the caller
/// and the session; pass it to `Session::close_subscription` to end it.
pub struct Subscription {
    id: i32,
    filter: MessageFilter,
    callback: Option<SubscriptionCallback>,
}

impl Subscription {
    pub(crate) fn new(id: i32, filter: MessageFilter, callback: Option<SubscriptionCallback>) -> Self {
        Self {
            id,
            filter,
            callback,
        }
    }

    /// Client-chosen id echoed by the server in acknowledgements.
    pub fn id(&self) -> i32 {
        self.id
    }

    pub fn filter(&self) -> &MessageFilter {
        &self.filter
    }

    pub fn matches(&self, msg: &dyn Message) -> bool {
        self.filter.matches(msg)
    }

    /// Runs the callback if `msg` passes the filter.  Returns whether it ran.
    pub fn deliver(&self, msg: &dyn Message) -> bool {
        match &self.callback {
            Some(callback) if self.matches(msg) => {
                callback(msg);
                true
            }
            _ => false,
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("filter", &self.filter)
            .field("has_callback", &self.callback.is_some())
            .finish()
    }
}
