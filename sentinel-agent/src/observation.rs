//! Agent-local observation cache
//!
//! Per-vault memory between polls: the activity baseline for the implicit-
//! heartbeat heuristic and dedup flags for notifications. Deliberately not
//! part of registry truth - losing this cache risks a duplicate notification
//! or a slightly later detection, never a wrong transition, because every
//! authoritative decision re-derives from the vault view.

use dashmap::DashMap;

/// What the agent remembers about one vault between polls.
#[derive(Debug, Clone, Copy, Default)]
pub struct Observation {
    /// Activity nonce captured in the safe zone, compared in the danger zone.
    pub baseline_nonce: Option<u64>,
    /// Early-warning notification already sent for the current cycle.
    pub danger_notified: bool,
    /// Terminal notification already sent.
    pub completed_notified: bool,
}

/// Process-lifetime observation cache; rebuilds from scratch on restart.
#[derive(Debug, Default)]
pub struct ObservationCache {
    map: DashMap<String, Observation>,
}

impl ObservationCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot for one vault (default when never seen).
    pub fn get(&self, owner: &str) -> Observation {
        self.map.get(owner).map(|entry| *entry).unwrap_or_default()
    }

    /// Mutate one vault's observation in place.
    pub fn update<F: FnOnce(&mut Observation)>(&self, owner: &str, apply: F) {
        let mut entry = self.map.entry(owner.to_string()).or_default();
        apply(entry.value_mut());
    }

    /// Forget a vault (e.g. after reset).
    pub fn forget(&self, owner: &str) {
        self.map.remove(owner);
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_observation_for_unknown_vault() {
        let cache = ObservationCache::new();
        let obs = cache.get("alice.test");
        assert_eq!(obs.baseline_nonce, None);
        assert!(!obs.danger_notified);
        assert!(!obs.completed_notified);
    }

    #[test]
    fn test_update_and_forget() {
        let cache = ObservationCache::new();
        cache.update("alice.test", |o| {
            o.baseline_nonce = Some(7);
            o.danger_notified = true;
        });

        let obs = cache.get("alice.test");
        assert_eq!(obs.baseline_nonce, Some(7));
        assert!(obs.danger_notified);
        assert_eq!(cache.len(), 1);

        cache.forget("alice.test");
        assert!(cache.is_empty());
        assert_eq!(cache.get("alice.test").baseline_nonce, None);
    }
}
