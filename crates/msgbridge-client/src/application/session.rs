//! Session: one connection to the message server.
//!
//! Architecture:
//! - The session owns a [`Transport`] and one dedicated reader thread.
//! - Application threads call [`Session::create_subscription`],
//!   [`Session::close_subscription`] and [`Session::request`], each of which
//!   writes one frame and then blocks on a monitor until the reader thread
//!   records the server's answer.
//! - Ordinary server messages are not decoded by the reader.  They are queued
//!   raw, in arrival order, and the application pulls them with
//!   [`Session::get_next_message_buffer`].
//!
//! # Why a reader thread? (for beginners)
//!
//! The server speaks whenever it likes: acknowledgements, responses and
//! published messages all arrive on the same socket, in any order.  If every
//! application thread read from the socket itself, one thread could swallow
//! the frame another is waiting for.  Instead exactly one thread reads, sorts
//! each frame into the right place (subscription table, response slot or
//! inbound queue) and wakes whoever is waiting there.
//!
//! # Closing
//!
//! Every blocking loop re-checks two flags after each wake: `shutting_down`
//! (set by [`Session::shutdown`]) and `connection_lost` (set by the reader
//! thread when the transport fails).  Either flag wakes every waiter, so no
//! call can stay blocked on a session that will never answer.

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use msgbridge_core::protocol::framing::{
    unsubscribe_payload, MessageCode, SubscribeResponse, DEFAULT_MAX_FRAME_SIZE,
};
use msgbridge_core::protocol::{peek_topic, SubscriptionIdAllocator};
use msgbridge_core::sync::{Monitor, Mutex, Thread, ThreadControl};
use msgbridge_core::{Buffer, CodecError, Message, MessageFilter, MessageRegistry, RESPONSE_TOPIC};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::application::subscription::{Subscription, SubscriptionCallback};
use crate::infrastructure::config::ConnectionConfig;
use crate::infrastructure::socket::{
    read_frame, read_session_id, write_frame, Socket, SocketError, Transport,
};

/// Errors returned by [`Session`] operations.
#[derive(Debug, Error)]
pub enum SessionError {
    /// A message could not be encoded or decoded.
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    /// The transport failed.
    #[error("connection error: {0}")]
    Connection(#[from] SocketError),

    /// The server sent something the protocol does not allow.
    #[error("protocol violation: {0}")]
    ProtocolViolation(String),

    /// [`Session::shutdown`] has been called.
    #[error("session is shutting down")]
    ShuttingDown,

    /// The reader thread stopped because the connection failed.
    #[error("connection to the message server was lost")]
    ConnectionLost,

    /// [`Session::startup`] has not been called yet.
    #[error("session has not been started")]
    NotStarted,

    #[error("session has already been started")]
    AlreadyStarted,

    /// Every positive subscription id has been used.
    #[error("subscription ids exhausted")]
    SubscriptionIdsExhausted,

    /// The reader thread could not be spawned, or panicked.
    #[error("reader thread error: {0}")]
    Thread(String),
}

/// Tuning knobs for a [`Session`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Upper bound on each wait during [`Session::shutdown`].
    pub shutdown_timeout: Duration,
    /// Largest inbound frame accepted, in bytes.
    pub max_frame_size: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            shutdown_timeout: Duration::from_secs(5),
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
        }
    }
}

impl From<&ConnectionConfig> for SessionConfig {
    fn from(config: &ConnectionConfig) -> Self {
        Self {
            shutdown_timeout: config.shutdown_timeout(),
            max_frame_size: config.max_frame_size,
        }
    }
}

// ── Shared state ──────────────────────────────────────────────────────────────

#[derive(Default)]
struct SubscriptionState {
    /// Sent, not yet acknowledged.
    pending_subscribes: HashMap<i32, Arc<Subscription>>,
    /// Acknowledged and live.  Ordered so snapshots come out by id.
    subscriptions: BTreeMap<i32, Arc<Subscription>>,
    /// Unsubscribe sent, not yet acknowledged.
    pending_unsubscribes: HashSet<i32>,
}

#[derive(Default)]
struct ResponseSlot {
    /// Topic of the request currently waiting for an answer.
    request_topic: Option<String>,
    response: Option<Box<dyn Message>>,
}

/// State shared between the owning [`Session`] and its reader thread.
struct SessionInner {
    session_id: i32,
    transport: Arc<dyn Transport>,
    registry: Arc<MessageRegistry>,
    config: SessionConfig,
    /// Serializes frame writes so two senders never interleave.
    write_lock: Mutex<()>,
    ids: SubscriptionIdAllocator,
    subs: Monitor<SubscriptionState>,
    /// Held for a whole request round trip.
    request_lock: Mutex<()>,
    response: Monitor<ResponseSlot>,
    queue: Monitor<VecDeque<Buffer>>,
    started: AtomicBool,
    shutting_down: AtomicBool,
    connection_lost: AtomicBool,
}

impl SessionInner {
    fn is_closed(&self) -> bool {
        self.shutting_down.load(Ordering::Acquire) || self.connection_lost.load(Ordering::Acquire)
    }

    /// The error a call interrupted by closing reports.
    fn closed_error(&self) -> SessionError {
        if self.shutting_down.load(Ordering::Acquire) {
            SessionError::ShuttingDown
        } else {
            SessionError::ConnectionLost
        }
    }

    fn check_open(&self) -> Result<(), SessionError> {
        if self.is_closed() {
            Err(self.closed_error())
        } else {
            Ok(())
        }
    }

    fn ensure_running(&self) -> Result<(), SessionError> {
        self.check_open()?;
        if !self.started.load(Ordering::Acquire) {
            return Err(SessionError::NotStarted);
        }
        Ok(())
    }

    /// Wakes every thread blocked on any of the session monitors.
    ///
    /// Each monitor is entered before pulsing so a waiter that has just
    /// checked the flags cannot miss the wake-up.
    fn wake_all(&self) {
        self.subs.enter().pulse_all();
        self.response.enter().pulse_all();
        self.queue.enter().pulse_all();
    }

    fn send_frame(&self, payload: &[u8]) -> Result<(), SessionError> {
        let _write = self.write_lock.lock();
        match write_frame(self.transport.as_ref(), payload) {
            Ok(()) => Ok(()),
            Err(_) if self.is_closed() => Err(self.closed_error()),
            Err(e) => Err(e.into()),
        }
    }

    // ── Subscriptions ─────────────────────────────────────────────────────────

    fn subscribe(
        &self,
        filter: MessageFilter,
        callback: Option<SubscriptionCallback>,
    ) -> Result<Arc<Subscription>, SessionError> {
        self.ensure_running()?;

        let mut state = self.subs.enter();
        self.check_open()?;
        let id = self
            .ids
            .next()
            .ok_or(SessionError::SubscriptionIdsExhausted)?;

        let mut payload = Buffer::new();
        payload.write_byte(MessageCode::Subscribe as u8);
        payload.write_int32(id);
        filter.write(&mut payload)?;

        // Registered under the same lock hold as the send, so the reader
        // cannot process the ack before the subscription is pending.
        self.send_frame(payload.as_bytes())?;
        let subscription = Arc::new(Subscription::new(id, filter, callback));
        state
            .pending_subscribes
            .insert(id, Arc::clone(&subscription));
        debug!(sub_id = id, filter = %subscription.filter(), "subscribe sent");

        state.wait_while(|s| s.pending_subscribes.contains_key(&id) && !self.is_closed());

        let promoted = state.subscriptions.contains_key(&id);
        state.pending_subscribes.remove(&id);
        if !promoted {
            return Err(self.closed_error());
        }
        info!(sub_id = id, filter = %subscription.filter(), "subscription active");
        Ok(subscription)
    }

    /// Sends `UNSUBSCRIBE` and waits for the ack, at most `timeout` if given.
    fn unsubscribe(&self, id: i32, timeout: Option<Duration>) -> Result<(), SessionError> {
        let mut state = self.subs.enter();
        self.check_open()?;
        if !state.subscriptions.contains_key(&id) {
            debug!(sub_id = id, "close of inactive subscription ignored");
            return Ok(());
        }

        if state.pending_unsubscribes.insert(id) {
            if let Err(e) = self.send_frame(unsubscribe_payload(id).as_bytes()) {
                state.pending_unsubscribes.remove(&id);
                return Err(e);
            }
            debug!(sub_id = id, "unsubscribe sent");
        }

        let pending = |s: &mut SubscriptionState| {
            s.pending_unsubscribes.contains(&id) && !self.is_closed()
        };
        match timeout {
            Some(timeout) => {
                if state.wait_while_timeout(pending, timeout) {
                    warn!(sub_id = id, ?timeout, "unsubscribe not acknowledged in time");
                }
            }
            None => state.wait_while(pending),
        }

        // Shutdown clears the pending set, so after it a missing entry does
        // not mean the server acknowledged.
        let still_pending = state.pending_unsubscribes.remove(&id);
        if still_pending || self.shutting_down.load(Ordering::Acquire) {
            return Err(self.closed_error());
        }
        info!(sub_id = id, "subscription closed");
        Ok(())
    }

    // ── Reader thread ─────────────────────────────────────────────────────────

    fn run_reader(&self) {
        info!(session_id = self.session_id, "reader thread started");
        let outcome = loop {
            if self.shutting_down.load(Ordering::Acquire) {
                break Ok(());
            }
            let frame = read_frame(self.transport.as_ref(), self.config.max_frame_size)
                .map_err(SessionError::from)
                .and_then(|payload| self.handle_frame(payload));
            if let Err(e) = frame {
                break Err(e);
            }
        };

        match outcome {
            Err(e) if !self.shutting_down.load(Ordering::Acquire) => {
                error!(session_id = self.session_id, error = %e, "reader thread terminating");
                self.connection_lost.store(true, Ordering::Release);
                self.wake_all();
            }
            _ => debug!(session_id = self.session_id, "reader thread stopped"),
        }
    }

    fn handle_frame(&self, payload: Vec<u8>) -> Result<(), SessionError> {
        let mut buf = Buffer::from_bytes(payload);
        let code = buf.peek_byte()?;
        match MessageCode::try_from(code) {
            Ok(MessageCode::Subscribe) | Ok(MessageCode::Unsubscribe) => {
                debug!(code, "server echoed a control frame");
                Ok(())
            }
            Ok(MessageCode::SubscribeResponse) => {
                buf.read_byte()?;
                let ack = SubscribeResponse::read(&mut buf)?;
                self.handle_ack(ack);
                Ok(())
            }
            Ok(MessageCode::ServerMessage) => self.handle_server_message(buf),
            Err(_) => Err(SessionError::ProtocolViolation(format!(
                "unknown message code {code}"
            ))),
        }
    }

    fn handle_ack(&self, ack: SubscribeResponse) {
        let mut state = self.subs.enter();
        let id = ack.sub_id;
        if ack.success {
            if let Some(subscription) = state.pending_subscribes.remove(&id) {
                state.subscriptions.insert(id, subscription);
                state.pulse_all();
                return;
            }
        } else if state.pending_unsubscribes.remove(&id) {
            state.subscriptions.remove(&id);
            state.pulse_all();
            return;
        }
        warn!(
            sub_id = id,
            success = ack.success,
            "protocol violation: acknowledgement for nothing pending"
        );
    }

    fn handle_server_message(&self, mut buf: Buffer) -> Result<(), SessionError> {
        let topic = peek_topic(&mut buf)?;

        if topic == RESPONSE_TOPIC {
            let mut slot = self.response.enter();
            let response = self
                .registry
                .decode_response(slot.request_topic.as_deref(), &mut buf)?;
            debug!(request_topic = ?slot.request_topic, "response received");
            if let Some(stale) = slot.response.replace(response) {
                warn!(?stale, "dropping unclaimed response");
            }
            slot.pulse_all();
            return Ok(());
        }

        debug!(%topic, len = buf.len(), "queueing server message");
        let mut queue = self.queue.enter();
        queue.push_back(buf);
        queue.pulse();
        Ok(())
    }
}

// ── Session ───────────────────────────────────────────────────────────────────

/// A connection to the message server plus its reader thread.
///
/// Lifecycle: construct with [`connect`](Self::connect) or
/// [`with_transport`](Self::with_transport), call [`startup`](Self::startup),
/// use it from any number of threads, then [`shutdown`](Self::shutdown)
/// (or drop it).
pub struct Session {
    inner: Arc<SessionInner>,
    reader: Mutex<Option<Thread>>,
    response_subscription: Mutex<Option<Arc<Subscription>>>,
}

impl Session {
    /// Connects to the configured server and reads its session id.
    pub fn connect(
        config: &ConnectionConfig,
        registry: Arc<MessageRegistry>,
    ) -> Result<Self, SessionError> {
        let socket = Socket::connect(&config.host, config.port, config.connect_timeout())?;
        Self::with_transport(Arc::new(socket), SessionConfig::from(config), registry)
    }

    /// Builds a session over an already-connected transport.
    ///
    /// Blocks until the server's 4-byte session id arrives.
    pub fn with_transport(
        transport: Arc<dyn Transport>,
        config: SessionConfig,
        registry: Arc<MessageRegistry>,
    ) -> Result<Self, SessionError> {
        let session_id = read_session_id(transport.as_ref())?;
        info!(session_id, "session established");

        Ok(Self {
            inner: Arc::new(SessionInner {
                session_id,
                transport,
                registry,
                config,
                write_lock: Mutex::new(()),
                ids: SubscriptionIdAllocator::new(),
                subs: Monitor::default(),
                request_lock: Mutex::new(()),
                response: Monitor::default(),
                queue: Monitor::default(),
                started: AtomicBool::new(false),
                shutting_down: AtomicBool::new(false),
                connection_lost: AtomicBool::new(false),
            }),
            reader: Mutex::new(None),
            response_subscription: Mutex::new(None),
        })
    }

    /// Session id assigned by the server.
    pub fn session_id(&self) -> i32 {
        self.inner.session_id
    }

    pub fn registry(&self) -> &Arc<MessageRegistry> {
        &self.inner.registry
    }

    pub fn is_started(&self) -> bool {
        self.inner.started.load(Ordering::Acquire)
    }

    pub fn is_shutting_down(&self) -> bool {
        self.inner.shutting_down.load(Ordering::Acquire)
    }

    pub fn is_connection_lost(&self) -> bool {
        self.inner.connection_lost.load(Ordering::Acquire)
    }

    /// Starts the reader thread and subscribes to the response topic.
    ///
    /// # Errors
    ///
    /// [`SessionError::AlreadyStarted`] on a second call; any error from
    /// spawning the thread or from the response subscription.
    pub fn startup(&self) -> Result<(), SessionError> {
        if self.inner.started.swap(true, Ordering::AcqRel) {
            return Err(SessionError::AlreadyStarted);
        }
        self.inner.check_open()?;

        let reader_inner = Arc::clone(&self.inner);
        let thread = Thread::start(
            format!("msgbridge-reader-{}", self.inner.session_id),
            move |_: &ThreadControl| reader_inner.run_reader(),
        )
        .map_err(|e| SessionError::Thread(e.to_string()))?;
        *self.reader.lock() = Some(thread);

        let response_subscription = self.inner.subscribe(MessageFilter::response(), None)?;
        *self.response_subscription.lock() = Some(response_subscription);
        info!(session_id = self.inner.session_id, "session started");
        Ok(())
    }

    /// Stops the session.
    ///
    /// Closes the response subscription while the connection is still up,
    /// wakes every blocked caller, closes the transport and joins the reader
    /// thread (bounded by `shutdown_timeout`).  Calling it again does nothing.
    ///
    /// Blocked callers are only released once the response unsubscribe has
    /// been acknowledged or timed out.  Against a server that never answers,
    /// they stay blocked for up to `shutdown_timeout` before seeing
    /// [`SessionError::ShuttingDown`].
    pub fn shutdown(&self) -> Result<(), SessionError> {
        let inner = &self.inner;
        if inner.shutting_down.load(Ordering::Acquire) {
            return Ok(());
        }

        let response_subscription = self.response_subscription.lock().take();
        if let Some(subscription) = response_subscription {
            if !inner.is_closed() {
                if let Err(e) = inner.unsubscribe(subscription.id(), Some(inner.config.shutdown_timeout)) {
                    debug!(error = %e, "response subscription not closed cleanly");
                }
            }
        }

        if inner.shutting_down.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        info!(session_id = inner.session_id, "session shutting down");
        inner.wake_all();
        inner.transport.close();

        let mut result = Ok(());
        if let Some(mut reader) = self.reader.lock().take() {
            match reader.join_timeout(inner.config.shutdown_timeout) {
                Ok(true) => {}
                Ok(false) => warn!(
                    timeout = ?inner.config.shutdown_timeout,
                    "reader thread did not stop in time; detaching it"
                ),
                Err(e) => result = Err(SessionError::Thread(e.to_string())),
            }
        }

        {
            let mut state = inner.subs.enter();
            state.pending_subscribes.clear();
            state.pending_unsubscribes.clear();
            state.subscriptions.clear();
        }
        inner.response.enter().response = None;
        inner.queue.enter().clear();
        result
    }

    // ── Subscriptions ─────────────────────────────────────────────────────────

    /// Subscribes to messages matching `filter` and blocks until the server
    /// acknowledges.
    ///
    /// `callback` runs from [`dispatch`](Self::dispatch) for every matching
    /// message.
    ///
    /// # Errors
    ///
    /// [`SessionError::ShuttingDown`] or [`SessionError::ConnectionLost`] if
    /// the session closes before the acknowledgement arrives.
    pub fn create_subscription<F>(
        &self,
        filter: MessageFilter,
        callback: F,
    ) -> Result<Arc<Subscription>, SessionError>
    where
        F: Fn(&dyn Message) + Send + Sync + 'static,
    {
        self.inner.subscribe(filter, Some(Arc::new(callback)))
    }

    /// Unsubscribes and blocks until the server acknowledges.  `None` and
    /// subscriptions that are no longer active are ignored.
    pub fn close_subscription(&self, subscription: Option<&Subscription>) -> Result<(), SessionError> {
        let Some(subscription) = subscription else {
            return Ok(());
        };
        self.inner.ensure_running()?;
        self.inner.unsubscribe(subscription.id(), None)
    }

    /// Snapshot of the active subscriptions, ordered by id.
    pub fn subscriptions(&self) -> Vec<Arc<Subscription>> {
        self.inner.subs.enter().subscriptions.values().cloned().collect()
    }

    /// Invokes the callback of every active subscription whose filter
    /// matches `msg`.  Returns how many ran.
    ///
    /// Callbacks run on the calling thread with no session lock held.
    pub fn dispatch(&self, msg: &dyn Message) -> usize {
        self.subscriptions()
            .iter()
            .filter(|subscription| subscription.deliver(msg))
            .count()
    }

    // ── Messaging ─────────────────────────────────────────────────────────────

    /// Sends `msg` without waiting for anything back.
    pub fn send(&self, msg: &dyn Message) -> Result<(), SessionError> {
        self.inner.ensure_running()?;
        let payload = msg.get_message_buffer()?;
        self.inner.send_frame(payload.as_bytes())
    }

    /// Sends `msg` and blocks until the server's response arrives.
    ///
    /// Only one request is in flight per session: concurrent callers queue
    /// behind each other.  The response is decoded as the type registered
    /// for `msg`'s topic, or as a raw `ResponseMessage` otherwise.
    pub fn request(&self, msg: &dyn Message) -> Result<Box<dyn Message>, SessionError> {
        let inner = &self.inner;
        inner.ensure_running()?;
        let payload = msg.get_message_buffer()?;

        let _request = inner.request_lock.lock();
        let mut slot = inner.response.enter();
        inner.check_open()?;
        if let Some(stale) = slot.response.take() {
            warn!(?stale, "discarding stale response");
        }
        slot.request_topic = Some(msg.topic().to_string());

        if let Err(e) = inner.send_frame(payload.as_bytes()) {
            slot.request_topic = None;
            return Err(e);
        }
        debug!(topic = msg.topic(), "request sent");

        slot.wait_while(|s| s.response.is_none() && !inner.is_closed());
        slot.request_topic = None;
        slot.response.take().ok_or_else(|| inner.closed_error())
    }

    // ── Inbound queue ─────────────────────────────────────────────────────────

    /// Blocks until a server message is available and returns it with the
    /// cursor at the start of the frame.
    ///
    /// Returns `None` once the session shuts down.  After a lost connection
    /// frames already queued are still handed out, then `None`.
    pub fn get_next_message_buffer(&self) -> Option<Buffer> {
        let inner = &self.inner;
        let mut queue = inner.queue.enter();
        queue.wait_while(|q| q.is_empty() && !inner.is_closed());
        if inner.shutting_down.load(Ordering::Acquire) {
            return None;
        }
        queue.pop_front()
    }

    /// Like [`get_next_message_buffer`](Self::get_next_message_buffer) but
    /// gives up after `timeout`.
    pub fn get_next_message_buffer_timeout(&self, timeout: Duration) -> Option<Buffer> {
        let inner = &self.inner;
        let mut queue = inner.queue.enter();
        queue.wait_while_timeout(|q| q.is_empty() && !inner.is_closed(), timeout);
        if inner.shutting_down.load(Ordering::Acquire) {
            return None;
        }
        queue.pop_front()
    }

    /// Pops a queued message without blocking.
    pub fn try_get_next_message_buffer(&self) -> Option<Buffer> {
        if self.is_shutting_down() {
            return None;
        }
        self.inner.queue.enter().pop_front()
    }

    /// Appends a frame to the inbound queue as if the server had sent it.
    pub fn queue_message_for_user_thread(&self, mut buf: Buffer) {
        buf.rewind();
        let mut queue = self.inner.queue.enter();
        queue.push_back(buf);
        queue.pulse();
    }

    /// Number of frames waiting in the inbound queue.
    pub fn queued_messages(&self) -> usize {
        self.inner.queue.enter().len()
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            warn!(error = %e, "error while shutting down dropped session");
        }
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("session_id", &self.inner.session_id)
            .field("started", &self.is_started())
            .field("shutting_down", &self.is_shutting_down())
            .field("connection_lost", &self.is_connection_lost())
            .finish()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
