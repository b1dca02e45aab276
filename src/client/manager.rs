//! Self-healing connection manager.
//!
//! Owns at most one socket, a reconnect timer and the pending command
//! queue. All state sits behind one mutex; every public method, socket
//! event and timer callback locks it, runs to completion and releases it
//! before any callback is invoked, so callbacks may call back into the
//! manager.
//!
//! Notifications go through an outbox filled under the lock. One thread at
//! a time drains it, so callbacks and event subscribers observe changes in
//! the order they happened, even when socket tasks run on other workers.
//!
//! # Tasks
//!
//! | Task | Lifetime | Role |
//! |------|----------|------|
//! | socket pump | one per socket | feeds [`SocketEvent`]s into the state machine |
//! | reconnect timer | at most one | sleeps for the back-off delay, then reconnects |
//!
//! Both hold only a weak reference, so dropping every
//! [`ConnectionManager`] clone tears the connection down.

// ============================================================================
// Imports
// ============================================================================

use std::collections::VecDeque;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};
use url::Url;

use crate::error::Result;
use crate::identifiers::SocketId;
use crate::protocol::{Command, Event, PendingCommand};
use crate::transport::{Connector, Frame, SocketCommand, SocketEvent, WebSocketConnector};

use super::backoff::ReconnectPolicy;
use super::builder::ConnectionManagerBuilder;
use super::options::{ConnectionOptions, ErrorHandler, EventHandler, StatusHandler};
use super::queue::CommandQueue;
use super::status::{ConnectionEvent, ConnectionStatus};

// ============================================================================
// Constants
// ============================================================================

/// Capacity of the [`ConnectionEvent`] broadcast channel.
const EVENT_CHANNEL_CAPACITY: usize = 256;

// ============================================================================
// Delivery
// ============================================================================

/// Outcome of [`ConnectionManager::send_command`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Handed to the open socket.
    Sent,
    /// Buffered until the next open.
    Queued,
    /// Dropped: no `type`, or not serializable.
    Rejected,
}

// ============================================================================
// Internal State
// ============================================================================

/// Socket ready state, as far as the manager knows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReadyState {
    Connecting,
    Open,
    Closing,
}

/// The one live socket.
struct ActiveSocket {
    id: SocketId,
    commands: mpsc::UnboundedSender<SocketCommand>,
    ready: ReadyState,
}

impl ActiveSocket {
    #[inline]
    fn is_active(&self) -> bool {
        matches!(self.ready, ReadyState::Connecting | ReadyState::Open)
    }
}

/// Armed reconnect timer.
struct ReconnectTimer {
    token: u64,
    task: JoinHandle<()>,
}

/// Everything guarded by the manager mutex.
struct State {
    socket: Option<ActiveSocket>,
    manual_close: bool,
    attempts: u32,
    timer: Option<ReconnectTimer>,
    next_timer_token: u64,
    queue: CommandQueue,
    outbox: VecDeque<ConnectionEvent>,
}

impl State {
    fn cancel_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.task.abort();
            trace!(token = timer.token, "Reconnect timer cancelled");
        }
    }
}

/// Callback slots copied out of the options.
struct Callbacks {
    on_event: Option<EventHandler>,
    on_error: Option<ErrorHandler>,
    on_status_change: Option<StatusHandler>,
}

/// Notifications raised by one state transition.
type Notices = Vec<ConnectionEvent>;

struct Inner {
    url: Url,
    policy: ReconnectPolicy,
    connector: Box<dyn Connector>,
    callbacks: Callbacks,
    state: Mutex<State>,
    /// Held by the thread draining the outbox.
    delivering: Mutex<()>,
    status_tx: watch::Sender<ConnectionStatus>,
    events_tx: broadcast::Sender<ConnectionEvent>,
}

// ============================================================================
// ConnectionManager
// ============================================================================

/// Auto-reconnecting WebSocket client with an outbound command buffer.
///
/// Cheap to clone; clones share one connection.
///
/// Methods that may open a socket or arm a timer ([`connect`](Self::connect)
/// and the socket event handling it triggers) must run inside a Tokio
/// runtime.
///
/// # Example
///
/// ```ignore
/// use overlay_link::{ConnectionManager, ConnectionOptions};
///
/// let manager = ConnectionManager::with_websocket(
///     ConnectionOptions::new("http://localhost:8000")
///         .with_base_path("/_debug")
///         .on_event(|event| println!("{:?}", event.parse())),
/// )?;
///
/// manager.subscribe(["logs", "queries"]);
/// manager.connect();
/// ```
#[derive(Clone)]
pub struct ConnectionManager {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("url", &self.inner.url)
            .finish_non_exhaustive()
    }
}

impl ConnectionManager {
    /// Creates a manager that opens sockets through `connector`.
    ///
    /// Does not connect; call [`connect`](Self::connect).
    ///
    /// # Errors
    ///
    /// Any error from [`ConnectionOptions::validate`].
    pub fn new(options: ConnectionOptions, connector: impl Connector) -> Result<Self> {
        Self::from_parts(options, Box::new(connector))
    }

    /// Creates a manager backed by [`WebSocketConnector`].
    ///
    /// # Errors
    ///
    /// Any error from [`ConnectionOptions::validate`].
    pub fn with_websocket(options: ConnectionOptions) -> Result<Self> {
        Self::new(options, WebSocketConnector::new())
    }

    /// Starts a [`ConnectionManagerBuilder`].
    #[inline]
    #[must_use]
    pub fn builder() -> ConnectionManagerBuilder {
        ConnectionManagerBuilder::new()
    }

    pub(crate) fn from_parts(
        options: ConnectionOptions,
        connector: Box<dyn Connector>,
    ) -> Result<Self> {
        options.validate()?;
        let url = options.websocket_url()?;

        let (status_tx, _) = watch::channel(ConnectionStatus::Disconnected);
        let (events_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        let inner = Inner {
            url,
            policy: options.reconnect,
            connector,
            callbacks: Callbacks {
                on_event: options.on_event,
                on_error: options.on_error,
                on_status_change: options.on_status_change,
            },
            state: Mutex::new(State {
                socket: None,
                manual_close: false,
                attempts: 0,
                timer: None,
                next_timer_token: 0,
                queue: CommandQueue::new(options.queue_limit),
                outbox: VecDeque::new(),
            }),
            delivering: Mutex::new(()),
            status_tx,
            events_tx,
        };

        debug!(url = %inner.url, "Connection manager created");

        Ok(Self {
            inner: Arc::new(inner),
        })
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Opens a socket unless one is already open or connecting.
    ///
    /// Clears the manual-close flag and cancels a pending reconnect timer.
    /// Starting from `Disconnected` also restores the full reconnect budget.
    /// A socket still closing after [`close`](Self::close) is abandoned and
    /// the status drops to `Disconnected` until the new one opens.
    pub fn connect(&self) {
        self.inner.with_state(|inner, state, notices| {
            if state.socket.as_ref().is_some_and(ActiveSocket::is_active) {
                debug!("connect() ignored, socket already open or connecting");
                return;
            }

            if let Some(old) = state.socket.take() {
                debug!(socket = %old.id, "Abandoning socket that is still closing");
                inner.set_status(ConnectionStatus::Disconnected, notices);
            }

            if *inner.status_tx.borrow() == ConnectionStatus::Disconnected {
                state.attempts = 0;
            }

            state.cancel_timer();
            state.manual_close = false;
            inner.open_socket(state);
        });
    }

    /// Closes the connection for good.
    ///
    /// Cancels any pending reconnect and closes the socket. The status
    /// settles to `Disconnected` once the socket reports its close, or
    /// immediately when there is no socket.
    pub fn close(&self) {
        self.inner.with_state(|inner, state, notices| {
            state.manual_close = true;
            state.cancel_timer();

            match state.socket.as_mut() {
                Some(socket) if socket.ready != ReadyState::Closing => {
                    info!(socket = %socket.id, "Closing connection");
                    socket.ready = ReadyState::Closing;
                    let _ = socket.commands.send(SocketCommand::Close);
                }
                Some(_) => trace!("close() while already closing"),
                None => inner.set_status(ConnectionStatus::Disconnected, notices),
            }
        });
    }

    // ========================================================================
    // Commands
    // ========================================================================

    /// Sends a command now if the socket is open, otherwise queues it.
    ///
    /// Commands without a `type` are dropped.
    pub fn send_command(&self, command: impl Into<PendingCommand>) -> Delivery {
        let command = command.into();
        if !command.is_valid() {
            debug!("Dropping command without type");
            return Delivery::Rejected;
        }

        self.inner.with_state(|_, state, _| {
            if let Some(socket) = state.socket.as_ref()
                && socket.ready == ReadyState::Open
            {
                let json = match command.to_json() {
                    Ok(json) => json,
                    Err(e) => {
                        warn!(kind = command.kind(), error = %e, "Dropping unserializable command");
                        return Delivery::Rejected;
                    }
                };

                if socket.commands.send(SocketCommand::Send(json)).is_ok() {
                    trace!(kind = command.kind(), "Command sent");
                    return Delivery::Sent;
                }
            }

            trace!(kind = command.kind(), "Command queued");
            if let Some(evicted) = state.queue.push(command) {
                warn!(kind = evicted.kind(), "Pending queue full, dropped oldest command");
            }
            Delivery::Queued
        })
    }

    /// Sends a `subscribe` command.
    pub fn subscribe<I, S>(&self, panels: I) -> Delivery
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.send_command(Command::subscribe(panels))
    }

    /// Sends an `unsubscribe` command.
    pub fn unsubscribe<I, S>(&self, panels: I) -> Delivery
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.send_command(Command::unsubscribe(panels))
    }

    /// Sends a `snapshot` command.
    pub fn request_snapshot(&self) -> Delivery {
        self.send_command(Command::Snapshot)
    }

    /// Sends a `clear` command.
    pub fn clear<I, S>(&self, panels: I) -> Delivery
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.send_command(Command::clear(panels))
    }

    // ========================================================================
    // Observation
    // ========================================================================

    /// Returns the current status.
    #[inline]
    #[must_use]
    pub fn status(&self) -> ConnectionStatus {
        *self.inner.status_tx.borrow()
    }

    /// Returns a receiver that tracks the status.
    #[must_use]
    pub fn watch_status(&self) -> watch::Receiver<ConnectionStatus> {
        self.inner.status_tx.subscribe()
    }

    /// Subscribes to lifecycle and message events.
    ///
    /// Only events emitted after this call are received. Slow receivers
    /// lose the oldest events, see [`broadcast`].
    #[must_use]
    pub fn events(&self) -> broadcast::Receiver<ConnectionEvent> {
        self.inner.events_tx.subscribe()
    }

    /// Number of commands waiting for an open socket.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.inner.state.lock().queue.len()
    }

    /// Reconnect attempts made since the last successful open.
    #[must_use]
    pub fn attempts(&self) -> u32 {
        self.inner.state.lock().attempts
    }

    /// Returns `true` while a reconnect timer is armed.
    #[must_use]
    pub fn reconnect_pending(&self) -> bool {
        self.inner.state.lock().timer.is_some()
    }

    /// The endpoint this manager connects to.
    #[inline]
    #[must_use]
    pub fn url(&self) -> &Url {
        &self.inner.url
    }
}

// ============================================================================
// State Machine
// ============================================================================

impl Inner {
    /// Runs `f` under the state lock, then delivers what it raised.
    fn with_state<R>(
        self: &Arc<Self>,
        f: impl FnOnce(&Arc<Self>, &mut State, &mut Notices) -> R,
    ) -> R {
        let result = {
            let mut state = self.state.lock();
            let mut notices = Notices::new();
            let result = f(self, &mut state, &mut notices);
            state.outbox.extend(notices);
            result
        };
        self.deliver();
        result
    }

    /// Drains the outbox unless another call is already draining it.
    ///
    /// Re-entrant calls from a callback return at once; the outer loop
    /// picks up what they raised.
    fn deliver(&self) {
        loop {
            {
                let Some(_delivering) = self.delivering.try_lock() else {
                    return;
                };
                loop {
                    let notice = self.state.lock().outbox.pop_front();
                    let Some(notice) = notice else {
                        break;
                    };
                    self.dispatch(notice);
                }
            }

            // Another thread may have queued work after the last pop and
            // failed to take the delivery lock.
            if self.state.lock().outbox.is_empty() {
                return;
            }
        }
    }

    /// Updates the status; no-op when unchanged.
    fn set_status(&self, status: ConnectionStatus, notices: &mut Notices) {
        let changed = self.status_tx.send_if_modified(|current| {
            if *current == status {
                false
            } else {
                *current = status;
                true
            }
        });

        if changed {
            debug!(%status, "Status changed");
            notices.push(ConnectionEvent::StatusChanged(status));
        }
    }

    /// Opens a new socket and starts its pump task.
    fn open_socket(self: &Arc<Self>, state: &mut State) {
        let id = SocketId::next();
        info!(socket = %id, url = %self.url, "Connecting");

        let (commands, events) = self.connector.open(&self.url).into_parts();
        state.socket = Some(ActiveSocket {
            id,
            commands,
            ready: ReadyState::Connecting,
        });

        tokio::spawn(Self::pump(Arc::downgrade(self), id, events));
    }

    /// Feeds one socket's events into the state machine, in order.
    async fn pump(weak: Weak<Self>, id: SocketId, mut events: mpsc::UnboundedReceiver<SocketEvent>) {
        while let Some(event) = events.recv().await {
            let Some(inner) = weak.upgrade() else {
                return;
            };

            let last = event == SocketEvent::Close;
            inner.handle_socket_event(id, event);
            if last {
                return;
            }
        }

        // Transport went away without a close event
        if let Some(inner) = weak.upgrade() {
            inner.handle_socket_event(id, SocketEvent::Close);
        }
    }

    fn handle_socket_event(self: &Arc<Self>, id: SocketId, event: SocketEvent) {
        self.with_state(|inner, state, notices| {
            if state.socket.as_ref().map(|socket| socket.id) != Some(id) {
                trace!(socket = %id, ?event, "Ignoring event from replaced socket");
                return;
            }

            match event {
                SocketEvent::Open => inner.on_open(id, state, notices),
                SocketEvent::Message(frame) => inner.on_message(frame, notices),
                SocketEvent::Error(message) => inner.on_error(id, message, notices),
                SocketEvent::Close => inner.on_close(id, state, notices),
            }
        });
    }

    fn on_open(&self, id: SocketId, state: &mut State, notices: &mut Notices) {
        let Some(socket) = state.socket.as_mut() else {
            return;
        };
        if socket.ready == ReadyState::Closing {
            debug!(socket = %id, "Socket opened after close() was requested");
            return;
        }

        socket.ready = ReadyState::Open;
        state.attempts = 0;
        info!(socket = %id, "Connected");

        self.set_status(ConnectionStatus::Connected, notices);
        notices.push(ConnectionEvent::Opened { socket: id });

        if state.queue.is_empty() {
            return;
        }

        // Take the whole batch first; anything queued meanwhile waits for
        // the next open.
        let mut pending = state.queue.take_all();
        let total = pending.len();

        while let Some(command) = pending.pop_front() {
            let json = match command.to_json() {
                Ok(json) => json,
                Err(e) => {
                    warn!(kind = command.kind(), error = %e, "Dropping unserializable command");
                    continue;
                }
            };

            if socket.commands.send(SocketCommand::Send(json)).is_err() {
                warn!(remaining = pending.len() + 1, "Socket gone during flush, requeueing");
                pending.push_front(command);
                state.queue.restore(pending);
                return;
            }
        }

        debug!(count = total, "Flushed pending commands");
    }

    fn on_message(&self, frame: Frame, notices: &mut Notices) {
        match frame {
            Frame::Text(text) => match Event::from_text(&text) {
                Some(event) => notices.push(ConnectionEvent::Message(event)),
                None => trace!(len = text.len(), "Dropping malformed frame"),
            },
            Frame::Binary(data) => trace!(len = data.len(), "Ignoring binary frame"),
        }
    }

    fn on_error(&self, id: SocketId, message: String, notices: &mut Notices) {
        warn!(socket = %id, error = %message, "Transport error");
        notices.push(ConnectionEvent::TransportError(message));
        self.set_status(ConnectionStatus::Error, notices);
    }

    fn on_close(self: &Arc<Self>, id: SocketId, state: &mut State, notices: &mut Notices) {
        state.socket = None;
        let manual = state.manual_close;
        notices.push(ConnectionEvent::Closed { socket: id, manual });

        if manual {
            info!(socket = %id, "Connection closed");
            self.set_status(ConnectionStatus::Disconnected, notices);
            return;
        }

        info!(socket = %id, "Connection lost");
        self.set_status(ConnectionStatus::Reconnecting, notices);
        self.schedule_reconnect(state, notices);
    }

    /// Arms the reconnect timer, or gives up when the budget is spent.
    fn schedule_reconnect(self: &Arc<Self>, state: &mut State, notices: &mut Notices) {
        if self.policy.should_give_up(state.attempts) {
            warn!(attempts = state.attempts, "Reconnect attempts exhausted, giving up");
            self.set_status(ConnectionStatus::Disconnected, notices);
            notices.push(ConnectionEvent::GaveUp {
                attempts: state.attempts,
            });
            return;
        }

        let delay = self
            .policy
            .delay_for_attempt(state.attempts, &mut rand::thread_rng());
        state.attempts += 1;

        info!(
            attempt = state.attempts,
            max = self.policy.max_attempts,
            delay_ms = delay.as_millis() as u64,
            "Scheduling reconnect"
        );
        notices.push(ConnectionEvent::Reconnecting {
            attempt: state.attempts,
            delay,
        });

        state.cancel_timer();
        let token = state.next_timer_token;
        state.next_timer_token += 1;

        let weak = Arc::downgrade(self);
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Some(inner) = weak.upgrade() {
                inner.reconnect_fired(token);
            }
        });

        state.timer = Some(ReconnectTimer { token, task });
    }

    fn reconnect_fired(self: &Arc<Self>, token: u64) {
        self.with_state(|inner, state, _| {
            if state.timer.as_ref().map(|timer| timer.token) != Some(token) {
                trace!(token, "Stale reconnect timer");
                return;
            }
            state.timer = None;

            if state.manual_close {
                return;
            }
            if state.socket.as_ref().is_some_and(ActiveSocket::is_active) {
                return;
            }

            inner.open_socket(state);
        });
    }

    /// Hands one notice to the callbacks and event subscribers.
    fn dispatch(&self, notice: ConnectionEvent) {
        match &notice {
            ConnectionEvent::StatusChanged(status) => {
                if let Some(handler) = &self.callbacks.on_status_change {
                    handler(*status);
                }
            }
            ConnectionEvent::Message(event) => {
                if let Some(handler) = &self.callbacks.on_event {
                    handler(event.clone());
                }
            }
            ConnectionEvent::TransportError(message) => {
                if let Some(handler) = &self.callbacks.on_error {
                    handler(message);
                }
            }
            _ => {}
        }

        if self.events_tx.receiver_count() > 0 {
            let _ = self.events_tx.send(notice);
        }
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        let state = self.state.get_mut();
        state.cancel_timer();
        if let Some(socket) = state.socket.take() {
            let _ = socket.commands.send(SocketCommand::Close);
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
