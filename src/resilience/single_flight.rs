//! Single-flight guard keyed by logical operation.
//!
//! A guard is handed out only if nobody else holds the same key; dropping the
//! guard releases it on every exit path, including `?` and panics.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Instant;

/// Registry of in-flight operation keys.
#[derive(Clone, Default)]
pub struct SingleFlight {
    inflight: Arc<DashMap<String, Instant>>,
}

impl SingleFlight {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `key`, or `None` if it is already held.
    pub fn try_acquire(&self, key: &str) -> Option<FlightGuard> {
        match self.inflight.entry(key.to_string()) {
            Entry::Occupied(held) => {
                tracing::debug!(
                    key = %key,
                    held_for_ms = held.get().elapsed().as_millis() as u64,
                    "Operation already in flight"
                );
                None
            }
            Entry::Vacant(slot) => {
                slot.insert(Instant::now());
                Some(FlightGuard {
                    key: key.to_string(),
                    inflight: self.inflight.clone(),
                })
            }
        }
    }

    pub fn is_held(&self, key: &str) -> bool {
        self.inflight.contains_key(key)
    }
}

/// Releases its key when dropped.
pub struct FlightGuard {
    key: String,
    inflight: Arc<DashMap<String, Instant>>,
}

impl FlightGuard {
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl Drop for FlightGuard {
    fn drop(&mut self) {
        self.inflight.remove(&self.key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_acquire_rejected_until_drop() {
        let flights = SingleFlight::new();

        let guard = flights.try_acquire("send").unwrap();
        assert_eq!(guard.key(), "send");
        assert!(flights.try_acquire("send").is_none());
        assert!(flights.is_held("send"));

        drop(guard);
        assert!(!flights.is_held("send"));
        assert!(flights.try_acquire("send").is_some());
    }

    #[test]
    fn test_keys_are_independent() {
        let flights = SingleFlight::new();
        let _a = flights.try_acquire("send").unwrap();
        assert!(flights.try_acquire("refresh").is_some());
    }
}
