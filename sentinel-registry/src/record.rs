//! Vault records and lifecycle state
//!
//! The lifecycle is a tagged union rather than a bag of boolean flags, so
//! impossible combinations (yielding and completed at once, a warning
//! timestamp with no warning) cannot be represented. The legacy flag view
//! external callers expect is derived in [`crate::view`].

use serde::{Deserialize, Serialize};

/// Minimum heartbeat interval accepted at setup and update.
pub const MIN_INTERVAL_MS: u64 = 60_000;

/// Minimum warning grace period accepted at setup and update.
pub const MIN_GRACE_PERIOD_MS: u64 = 60_000;

/// Default heartbeat interval: 30 days.
pub const DEFAULT_INTERVAL_MS: u64 = 30 * 24 * 60 * 60 * 1000;

/// Default warning grace period: 24 hours.
pub const DEFAULT_GRACE_PERIOD_MS: u64 = 24 * 60 * 60 * 1000;

/// Where a vault sits in the warning protocol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Lifecycle {
    /// Owner is current on heartbeats (or has recovered).
    Alive,
    /// Heartbeat expired and a warning was raised; grace countdown running.
    WarningActive { since_ms: u64 },
    /// Grace elapsed; awaiting the external liveness verdict.
    Yielding { warned_at_ms: u64 },
    /// Terminal: balance transferred to the beneficiary.
    Completed,
}

impl Lifecycle {
    /// Timestamp of the outstanding warning, if one exists.
    ///
    /// The warning stays outstanding through the yield state - it is only
    /// cleared by recovery (heartbeat or a negative yield verdict) or
    /// consumed by completion.
    pub fn warning_triggered_at(&self) -> Option<u64> {
        match self {
            Lifecycle::WarningActive { since_ms } => Some(*since_ms),
            Lifecycle::Yielding { warned_at_ms } => Some(*warned_at_ms),
            Lifecycle::Alive | Lifecycle::Completed => None,
        }
    }

    pub fn is_yielding(&self) -> bool {
        matches!(self, Lifecycle::Yielding { .. })
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, Lifecycle::Completed)
    }
}

/// One vault: the unit of storage and of per-owner serialization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VaultRecord {
    /// Creator of the vault. Immutable.
    pub owner_id: String,
    /// Recipient of the terminal transfer. Owner-mutable while live.
    pub beneficiary_id: String,
    /// Locked value in the smallest unit.
    #[serde(with = "u128_string")]
    pub balance: u128,
    pub heartbeat_interval_ms: u64,
    pub grace_period_ms: u64,
    /// Anchor for expiry: set at creation and on every accepted heartbeat.
    pub last_active_ms: u64,
    pub lifecycle: Lifecycle,
    /// Opaque owner-supplied secret. Set only at creation, revealed only
    /// through the gated reveal operation, never part of ordinary views.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secure_payload: Option<String>,
    /// External address for the notification collaborator.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notification_channel: Option<String>,
    /// Bumped on every accepted owner-initiated mutation. The agent's
    /// automatic liveness check compares this between polls.
    pub activity_nonce: u64,
    pub created_at_ms: u64,
}

impl VaultRecord {
    /// Instant the current heartbeat window ends.
    pub fn deadline_ms(&self) -> u64 {
        self.last_active_ms.saturating_add(self.heartbeat_interval_ms)
    }

    pub fn is_expired(&self, now_ms: u64) -> bool {
        now_ms > self.deadline_ms()
    }

    /// Record owner activity for the agent's implicit-heartbeat heuristic.
    pub(crate) fn touch(&mut self) {
        self.activity_nonce += 1;
    }
}

/// Serialize u128 values as decimal strings.
///
/// Matches the external wire format for balances, and keeps the JSON
/// representable (serde_json numbers do not cover the u128 range).
pub mod u128_string {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &u128, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(value)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u128, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> VaultRecord {
        VaultRecord {
            owner_id: "alice.test".to_string(),
            beneficiary_id: "bob.test".to_string(),
            balance: 0,
            heartbeat_interval_ms: MIN_INTERVAL_MS,
            grace_period_ms: MIN_GRACE_PERIOD_MS,
            last_active_ms: 1_000,
            lifecycle: Lifecycle::Alive,
            secure_payload: None,
            notification_channel: None,
            activity_nonce: 0,
            created_at_ms: 1_000,
        }
    }

    #[test]
    fn test_deadline_and_expiry() {
        let r = record();
        assert_eq!(r.deadline_ms(), 61_000);
        assert!(!r.is_expired(61_000));
        assert!(r.is_expired(61_001));
    }

    #[test]
    fn test_warning_timestamp_tracks_lifecycle() {
        assert_eq!(Lifecycle::Alive.warning_triggered_at(), None);
        assert_eq!(
            Lifecycle::WarningActive { since_ms: 5 }.warning_triggered_at(),
            Some(5)
        );
        assert_eq!(
            Lifecycle::Yielding { warned_at_ms: 7 }.warning_triggered_at(),
            Some(7)
        );
        assert_eq!(Lifecycle::Completed.warning_triggered_at(), None);
    }

    #[test]
    fn test_record_round_trip_preserves_balance() {
        let mut r = record();
        r.balance = u128::MAX;
        r.secure_payload = Some("cipher:abc123".to_string());

        let json = serde_json::to_string(&r).unwrap();
        let back: VaultRecord = serde_json::from_str(&json).unwrap();

        assert_eq!(back.balance, u128::MAX);
        assert_eq!(back.secure_payload.as_deref(), Some("cipher:abc123"));
        assert_eq!(back.lifecycle, Lifecycle::Alive);
    }
}
