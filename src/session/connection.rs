//! Connectivity signal.
//!
//! Each waiter holds a one-shot slot registered when it is created. The next
//! publish fills every registered slot with the same value, so a waiter
//! always sees the first signal after its registration, never the
//! last-known value and never a later one.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::oneshot;
use tracing::trace;

/// Publisher side of the connectivity signal.
#[derive(Debug, Clone, Default)]
pub struct ConnectionSignal {
    waiters: Arc<Mutex<Vec<oneshot::Sender<bool>>>>,
}

impl ConnectionSignal {
    /// Create a signal with no waiters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver a connectivity change to every registered waiter.
    ///
    /// Each waiter is released by exactly one signal. Returns the number of
    /// waiters notified.
    pub fn publish(&self, is_connected: bool) -> usize {
        let pending = std::mem::take(&mut *self.lock());
        pending
            .into_iter()
            .map(|slot| slot.send(is_connected).is_ok())
            .filter(|delivered| *delivered)
            .count()
    }

    /// Register a waiter for the next signal.
    pub fn waiter(&self) -> ConnectionWaiter {
        let (tx, rx) = oneshot::channel();
        let mut waiters = self.lock();
        waiters.retain(|slot| !slot.is_closed());
        waiters.push(tx);
        trace!(waiters = waiters.len(), "connectivity waiter registered");
        ConnectionWaiter { rx }
    }

    /// Number of registered waiters still waiting.
    pub fn waiter_count(&self) -> usize {
        self.lock().iter().filter(|slot| !slot.is_closed()).count()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<oneshot::Sender<bool>>> {
        self.waiters.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// A registered connectivity waiter.
#[derive(Debug)]
pub struct ConnectionWaiter {
    rx: oneshot::Receiver<bool>,
}

impl ConnectionWaiter {
    /// Wait for the first signal published after registration.
    ///
    /// Returns `None` once every handle to the signal has been dropped.
    pub async fn recv(self) -> Option<bool> {
        self.rx.await.ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_all_registered_waiters_see_signal() {
        let signal = ConnectionSignal::new();
        let a = signal.waiter();
        let b = signal.waiter();

        assert_eq!(signal.publish(true), 2);
        assert_eq!(a.recv().await, Some(true));
        assert_eq!(b.recv().await, Some(true));
    }

    #[tokio::test]
    async fn test_late_waiter_needs_next_signal() {
        let signal = ConnectionSignal::new();
        signal.publish(true);

        let late = signal.waiter();
        tokio::pin! {
            let late_recv = late.recv();
        }
        let pending = tokio::time::timeout(Duration::from_millis(20), &mut late_recv).await;
        assert!(pending.is_err(), "late waiter must not see the earlier signal");

        signal.publish(false);
        assert_eq!(late_recv.await, Some(false));
    }

    #[tokio::test]
    async fn test_publish_without_waiters() {
        let signal = ConnectionSignal::new();
        assert_eq!(signal.publish(true), 0);
        assert_eq!(signal.waiter_count(), 0);
    }

    #[tokio::test]
    async fn test_waiter_sees_close() {
        let signal = ConnectionSignal::new();
        let waiter = signal.waiter();
        drop(signal);
        assert_eq!(waiter.recv().await, None);
    }

    #[tokio::test]
    async fn test_first_signal_wins_under_flapping() {
        let signal = ConnectionSignal::new();
        let waiter = signal.waiter();

        signal.publish(false);
        for _ in 0..32 {
            signal.publish(true);
        }
        assert_eq!(waiter.recv().await, Some(false));
    }

    #[test]
    fn test_dropped_waiters_are_pruned() {
        let signal = ConnectionSignal::new();
        let kept = signal.waiter();
        drop(signal.waiter());
        drop(signal.waiter());

        assert_eq!(signal.waiter_count(), 1);
        assert_eq!(signal.publish(true), 1);
        drop(kept);
    }
}
