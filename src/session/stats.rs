//! Dispatch counters.

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters updated by the dispatcher.
#[derive(Debug, Default)]
pub struct DispatchStats {
    acks_matched: AtomicU64,
    acks_unmatched: AtomicU64,
    acks_expired: AtomicU64,
    messages_delivered: AtomicU64,
    messages_dropped: AtomicU64,
    queries_completed: AtomicU64,
    queries_expired: AtomicU64,
    events_ignored: AtomicU64,
}

macro_rules! counter {
    ($($name:ident => $field:ident),* $(,)?) => {
        $(
            pub(crate) fn $name(&self) {
                self.$field.fetch_add(1, Ordering::Relaxed);
            }
        )*
    };
}

impl DispatchStats {
    counter! {
        ack_matched => acks_matched,
        ack_unmatched => acks_unmatched,
        message_delivered => messages_delivered,
        message_dropped => messages_dropped,
        query_completed => queries_completed,
        event_ignored => events_ignored,
    }

    pub(crate) fn acks_expired(&self, n: usize) {
        self.acks_expired.fetch_add(n as u64, Ordering::Relaxed);
    }

    pub(crate) fn queries_expired(&self, n: usize) {
        self.queries_expired.fetch_add(n as u64, Ordering::Relaxed);
    }

    /// Point-in-time copy of all counters.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            acks_matched: self.acks_matched.load(Ordering::Relaxed),
            acks_unmatched: self.acks_unmatched.load(Ordering::Relaxed),
            acks_expired: self.acks_expired.load(Ordering::Relaxed),
            messages_delivered: self.messages_delivered.load(Ordering::Relaxed),
            messages_dropped: self.messages_dropped.load(Ordering::Relaxed),
            queries_completed: self.queries_completed.load(Ordering::Relaxed),
            queries_expired: self.queries_expired.load(Ordering::Relaxed),
            events_ignored: self.events_ignored.load(Ordering::Relaxed),
        }
    }
}

/// A copy of [`DispatchStats`] at one instant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    /// Acknowledgments matched to a pending send.
    pub acks_matched: u64,
    /// Acknowledgments with no pending send (duplicate, late or forged).
    pub acks_unmatched: u64,
    /// Pending sends evicted without an acknowledgment.
    pub acks_expired: u64,
    /// Messages pushed to the inbox.
    pub messages_delivered: u64,
    /// Inbound blocks that failed to decrypt.
    pub messages_dropped: u64,
    /// Key queries completed by a reply, successful or not.
    pub queries_completed: u64,
    /// Key queries evicted without a reply.
    pub queries_expired: u64,
    /// Events of a kind the dispatcher does not handle.
    pub events_ignored: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters() {
        let stats = DispatchStats::default();
        stats.ack_matched();
        stats.ack_matched();
        stats.acks_expired(3);
        stats.event_ignored();

        let snap = stats.snapshot();
        assert_eq!(snap.acks_matched, 2);
        assert_eq!(snap.acks_expired, 3);
        assert_eq!(snap.events_ignored, 1);
        assert_eq!(snap.queries_completed, 0);
    }
}
