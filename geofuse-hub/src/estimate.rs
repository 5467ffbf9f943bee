//! Per-key estimate storage.
//!
//! The store holds the winning fix per key plus the last fix seen from
//! each source (diagnostics). All updates replace whole values under a
//! write lock, and readers get clones, so a torn read is impossible.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use geofuse_core::Fix;

#[derive(Default)]
struct EstimateSlot {
    current: Option<Fix>,
    by_source: HashMap<String, Fix>,
}

/// Guarded map of key to current estimate.
#[derive(Default)]
pub(crate) struct EstimateStore {
    slots: RwLock<HashMap<String, EstimateSlot>>,
}

impl EstimateStore {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the current estimate for `key`. An expired estimate is
    /// never returned, even if the sweep has not cleared it yet.
    pub(crate) fn current(&self, key: &str, now: DateTime<Utc>) -> Option<Fix> {
        self.slots
            .read()
            .get(key)
            .and_then(|slot| slot.current.as_ref())
            .filter(|fix| !fix.is_expired_at(now))
            .cloned()
    }

    /// Last fix seen from every source for `key`, winners and losers
    /// alike. Diagnostics only.
    pub(crate) fn source_fixes(&self, key: &str) -> Vec<Fix> {
        self.slots
            .read()
            .get(key)
            .map(|slot| slot.by_source.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Run the selection rule for an incoming fix. Returns whether it
    /// became the new current estimate. The fix is recorded under its
    /// source either way.
    pub(crate) fn apply(&self, fix: Fix, now: DateTime<Utc>) -> bool {
        let mut slots = self.slots.write();
        let slot = slots.entry(fix.key.clone()).or_default();

        slot.by_source.insert(fix.source.clone(), fix.clone());

        let wins = match &slot.current {
            Some(current) => fix.supersedes(current, now),
            None => true,
        };
        if wins {
            slot.current = Some(fix);
        }
        wins
    }

    /// Clear the estimate for `key` if it has expired. Returns whether a
    /// value was cleared.
    pub(crate) fn expire(&self, key: &str, now: DateTime<Utc>) -> bool {
        let mut slots = self.slots.write();
        let Some(slot) = slots.get_mut(key) else {
            return false;
        };
        if slot
            .current
            .as_ref()
            .is_some_and(|fix| fix.is_expired_at(now))
        {
            slot.current = None;
            return true;
        }
        false
    }

    /// Drop all state for `key`.
    pub(crate) fn remove(&self, key: &str) {
        self.slots.write().remove(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn fix(source: &str, confidence: f64, ttl: Duration) -> Fix {
        Fix {
            key: "host".to_string(),
            lat: 52.5,
            lon: 13.4,
            altitude: None,
            accuracy_m: 10.0,
            confidence,
            source: source.to_string(),
            at: Utc::now(),
            ttl,
        }
    }

    #[test]
    fn first_fix_wins_and_is_readable() {
        let store = EstimateStore::new();
        let now = Utc::now();

        assert!(store.apply(fix("a", 0.5, Duration::from_secs(60)), now));
        let current = store.current("host", now).unwrap();
        assert_eq!(current.source, "a");
    }

    #[test]
    fn loser_is_recorded_for_diagnostics_only() {
        let store = EstimateStore::new();
        let now = Utc::now();

        assert!(store.apply(fix("a", 0.9, Duration::from_secs(60)), now));
        assert!(!store.apply(fix("b", 0.3, Duration::from_secs(60)), now));

        assert_eq!(store.current("host", now).unwrap().source, "a");
        assert_eq!(store.source_fixes("host").len(), 2);
    }

    #[test]
    fn expire_clears_only_stale_estimates() {
        let store = EstimateStore::new();
        let now = Utc::now();

        store.apply(fix("a", 0.5, Duration::from_millis(10)), now);
        assert!(!store.expire("host", now));

        let later = now + chrono::TimeDelta::seconds(1);
        assert!(store.expire("host", later));
        assert!(store.current("host", later).is_none());
        // A second sweep has nothing left to clear.
        assert!(!store.expire("host", later));
    }

    #[test]
    fn reads_never_return_expired_fixes() {
        let store = EstimateStore::new();
        let now = Utc::now();

        store.apply(fix("a", 0.5, Duration::from_millis(10)), now);
        let later = now + chrono::TimeDelta::seconds(1);
        // Not yet swept, but already past its TTL.
        assert!(store.current("host", later).is_none());
    }

    #[test]
    fn remove_drops_all_state() {
        let store = EstimateStore::new();
        let now = Utc::now();

        store.apply(fix("a", 0.5, Duration::from_secs(60)), now);
        store.remove("host");

        assert!(store.current("host", now).is_none());
        assert!(store.source_fixes("host").is_empty());
    }
}
