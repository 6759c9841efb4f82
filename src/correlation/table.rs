//! At-most-once claim table.
//!
//! Maps a fixed-width correlation id to the state of one in-flight request.
//! An entry is inserted once, before the request leaves, and is removed by
//! exactly one of: a matching reply (`claim`), the expiry sweep, or session
//! teardown (`drain`).

use std::collections::HashMap;
use std::fmt::Display;
use std::hash::Hash;
use std::time::Duration;

use tokio::time::Instant;
use tracing::warn;

use crate::core::CorrelationError;

#[derive(Debug)]
struct Entry<V> {
    value: V,
    created_at: Instant,
}

/// Correlation table keyed by `K`.
///
/// Not synchronized: the table has a single owner (the dispatcher task).
#[derive(Debug)]
pub struct CorrelationTable<K, V> {
    /// Table name, used in log output.
    name: &'static str,
    entries: HashMap<K, Entry<V>>,
}

impl<K, V> CorrelationTable<K, V>
where
    K: Copy + Eq + Hash + Display,
{
    /// Create an empty table.
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            entries: HashMap::new(),
        }
    }

    /// Insert a value under `id`, stamped with the current time.
    pub fn put(&mut self, id: K, value: V) -> Result<(), CorrelationError> {
        self.put_at(id, value, Instant::now())
    }

    /// Insert a value under `id` with an explicit creation time.
    ///
    /// A duplicate id leaves the existing entry in place and is reported as
    /// an error; ids come from a large random space so collisions are not
    /// fatal.
    pub fn put_at(&mut self, id: K, value: V, created_at: Instant) -> Result<(), CorrelationError> {
        if self.entries.contains_key(&id) {
            warn!(table = self.name, %id, "duplicate correlation id, keeping existing entry");
            return Err(CorrelationError::Duplicate(id.to_string()));
        }
        self.entries.insert(id, Entry { value, created_at });
        Ok(())
    }

    /// Remove and return the value for `id`, if present.
    pub fn claim(&mut self, id: &K) -> Option<V> {
        self.entries.remove(id).map(|entry| entry.value)
    }

    /// Check whether `id` is pending.
    pub fn contains(&self, id: &K) -> bool {
        self.entries.contains_key(id)
    }

    /// Number of pending entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Remove every entry older than `ttl` at time `now`.
    ///
    /// Returns the removed entries so the caller can complete them.
    pub fn sweep_expired(&mut self, now: Instant, ttl: Duration) -> Vec<(K, V)> {
        let expired: Vec<K> = self
            .entries
            .iter()
            .filter(|(_, entry)| now.saturating_duration_since(entry.created_at) >= ttl)
            .map(|(id, _)| *id)
            .collect();

        expired
            .into_iter()
            .filter_map(|id| self.entries.remove(&id).map(|entry| (id, entry.value)))
            .collect()
    }

    /// Remove and return every entry.
    pub fn drain(&mut self) -> Vec<(K, V)> {
        self.entries
            .drain()
            .map(|(id, entry)| (id, entry.value))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::correlation::SurbId;

    fn id(n: u8) -> SurbId {
        SurbId::from_bytes([n; SurbId::SIZE])
    }

    #[test]
    fn test_claim_is_at_most_once() {
        let mut table = CorrelationTable::new("test");
        table.put(id(1), "key").unwrap();

        assert_eq!(table.claim(&id(1)), Some("key"));
        assert_eq!(table.claim(&id(1)), None);
        assert!(table.is_empty());
    }

    #[test]
    fn test_claim_unknown_is_absent() {
        let mut table: CorrelationTable<SurbId, u32> = CorrelationTable::new("test");
        assert_eq!(table.claim(&id(9)), None);
    }

    #[test]
    fn test_duplicate_put_keeps_first() {
        let mut table = CorrelationTable::new("test");
        table.put(id(1), 10).unwrap();

        let err = table.put(id(1), 20).unwrap_err();
        assert!(matches!(err, CorrelationError::Duplicate(_)));
        assert_eq!(table.len(), 1);
        assert_eq!(table.claim(&id(1)), Some(10));
    }

    #[test]
    fn test_sweep_removes_only_expired() {
        let mut table = CorrelationTable::new("test");
        let start = Instant::now();
        table.put_at(id(1), "old", start).unwrap();
        table
            .put_at(id(2), "new", start + Duration::from_secs(50))
            .unwrap();

        let swept = table.sweep_expired(start + Duration::from_secs(60), Duration::from_secs(60));
        assert_eq!(swept, vec![(id(1), "old")]);
        assert!(!table.contains(&id(1)));
        assert!(table.contains(&id(2)));
    }

    #[test]
    fn test_sweep_with_clock_behind_entry() {
        let mut table = CorrelationTable::new("test");
        let start = Instant::now();
        table
            .put_at(id(1), (), start + Duration::from_secs(10))
            .unwrap();

        assert!(table.sweep_expired(start, Duration::from_secs(1)).is_empty());
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_drain_empties_table() {
        let mut table = CorrelationTable::new("test");
        table.put(id(1), 1).unwrap();
        table.put(id(2), 2).unwrap();

        let mut drained = table.drain();
        drained.sort_by_key(|(_, v)| *v);
        assert_eq!(drained, vec![(id(1), 1), (id(2), 2)]);
        assert!(table.is_empty());
    }
}
