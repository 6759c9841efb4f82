//! Inbound message queue.
//!
//! FIFO in dispatcher-observation order, no deduplication. The dispatcher
//! pushes; `Session::receive` pops. Concurrent receivers are serialized.

use std::time::Duration;

use tokio::sync::{Mutex, mpsc, watch};

use super::state::{SessionState, wait_for_shutdown};
use crate::core::{SessionError, SessionResult};
use crate::crypto::PublicKey;

/// A decoded message delivered from the network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    /// Sender handle.
    pub sender: String,
    /// Plaintext payload.
    pub payload: Vec<u8>,
    /// Sender's public key, if the block declared one.
    pub sender_key: Option<PublicKey>,
    /// Transport-assigned message identifier.
    pub message_id: Vec<u8>,
}

/// Outcome of a blocking receive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Received {
    /// The oldest queued message.
    Message(InboundMessage),
    /// The timeout elapsed with nothing queued.
    Timeout,
}

impl Received {
    /// The message, if one was received.
    pub fn into_message(self) -> Option<InboundMessage> {
        match self {
            Received::Message(msg) => Some(msg),
            Received::Timeout => None,
        }
    }
}

/// Create a connected sender/queue pair.
pub fn inbox() -> (InboxSender, Inbox) {
    let (tx, rx) = mpsc::unbounded_channel();
    (InboxSender { tx }, Inbox { rx: Mutex::new(rx) })
}

/// Producer side, owned by the dispatcher.
#[derive(Debug, Clone)]
pub struct InboxSender {
    tx: mpsc::UnboundedSender<InboundMessage>,
}

impl InboxSender {
    /// Append a message. Returns `false` if the queue is gone.
    pub fn push(&self, msg: InboundMessage) -> bool {
        self.tx.send(msg).is_ok()
    }
}

/// Consumer side.
#[derive(Debug)]
pub struct Inbox {
    rx: Mutex<mpsc::UnboundedReceiver<InboundMessage>>,
}

impl Inbox {
    /// Pop the oldest message, waiting for one if the queue is empty.
    ///
    /// `None` or a zero timeout waits indefinitely. Otherwise the wait races
    /// a timer, and the timer wins ties. Shutdown releases the wait with
    /// [`SessionError::Shutdown`].
    pub async fn receive(
        &self,
        timeout: Option<Duration>,
        lifecycle: watch::Receiver<SessionState>,
    ) -> SessionResult<Received> {
        if lifecycle.borrow().is_shut_down() {
            return Err(SessionError::Shutdown);
        }

        if let Ok(mut rx) = self.rx.try_lock() {
            if let Ok(msg) = rx.try_recv() {
                return Ok(Received::Message(msg));
            }
        }

        let next = async {
            let mut rx = self.rx.lock().await;
            rx.recv().await
        };

        tokio::select! {
            biased;
            _ = wait_for_shutdown(lifecycle) => Err(SessionError::Shutdown),
            _ = sleep_or_forever(timeout) => Ok(Received::Timeout),
            msg = next => msg.map(Received::Message).ok_or(SessionError::Shutdown),
        }
    }
}

async fn sleep_or_forever(timeout: Option<Duration>) {
    match timeout.filter(|t| !t.is_zero()) {
        Some(duration) => tokio::time::sleep(duration).await,
        None => std::future::pending().await,
    }
}
