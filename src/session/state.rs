//! Session lifecycle state machine.
//!
//! ```text
//! Created → Connecting → Connected ⇄ Disconnected
//!     └──────────┴────────────┴───────────┴──────→ ShutDown (terminal)
//! ```
//!
//! The current state is published on a `watch` channel. Entering
//! [`SessionState::ShutDown`] is the cancellation signal every suspension
//! point in the session listens for.

use std::sync::Arc;

use tokio::sync::watch;

/// Session lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Constructed, transport not yet contacted.
    Created,
    /// Link handshake started, no connectivity signal yet.
    Connecting,
    /// Link to the provider is up.
    Connected,
    /// Link to the provider is down; the transport may reconnect.
    Disconnected,
    /// Torn down. No further events are dispatched.
    ShutDown,
}

impl SessionState {
    /// Whether moving from `self` to `next` is a legal transition.
    pub fn can_transition_to(self, next: SessionState) -> bool {
        use SessionState::*;
        match (self, next) {
            (ShutDown, _) => false,
            (_, ShutDown) => true,
            (Created, Connecting) => true,
            (Connecting | Disconnected, Connected) => true,
            (Connecting | Connected, Disconnected) => true,
            _ => false,
        }
    }

    /// Whether sends and queries are accepted in this state.
    ///
    /// The transport decides whether anything is actually transmitted.
    pub fn permits_send(self) -> bool {
        matches!(
            self,
            SessionState::Connecting | SessionState::Connected | SessionState::Disconnected
        )
    }

    /// Whether this is the terminal state.
    pub fn is_shut_down(self) -> bool {
        self == SessionState::ShutDown
    }
}

/// Shared handle to the session's lifecycle state.
#[derive(Debug, Clone)]
pub struct Lifecycle {
    tx: Arc<watch::Sender<SessionState>>,
}

impl Lifecycle {
    /// Create a lifecycle in [`SessionState::Created`].
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(SessionState::Created);
        Self { tx: Arc::new(tx) }
    }

    /// Current state.
    pub fn current(&self) -> SessionState {
        *self.tx.borrow()
    }

    /// Move to `next` if the transition is legal.
    ///
    /// Returns `true` if the state changed.
    pub fn transition(&self, next: SessionState) -> bool {
        self.tx.send_if_modified(|state| {
            if state.can_transition_to(next) {
                *state = next;
                true
            } else {
                false
            }
        })
    }

    /// Subscribe to state changes.
    pub fn watch(&self) -> watch::Receiver<SessionState> {
        self.tx.subscribe()
    }
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolve once the session has shut down.
///
/// Resolves immediately if it already has, or if the lifecycle is gone.
pub async fn wait_for_shutdown(mut rx: watch::Receiver<SessionState>) {
    loop {
        if rx.borrow_and_update().is_shut_down() {
            return;
        }
        if rx.changed().await.is_err() {
            return;
        }
    }
}
