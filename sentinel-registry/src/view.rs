//! External vault view
//!
//! Read-only projection of a [`VaultRecord`] with all time-derived fields
//! computed at read time. This is what `get_vault` returns and what the
//! monitoring agent branches on. The secure payload is deliberately absent -
//! it is only reachable through the gated reveal operation.

use serde::{Deserialize, Serialize};

use crate::record::{u128_string, VaultRecord};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultView {
    pub owner_id: String,
    pub beneficiary_id: String,
    #[serde(with = "u128_string")]
    pub balance: u128,
    pub heartbeat_interval_ms: u64,
    pub grace_period_ms: u64,
    pub last_active_ms: u64,
    /// Time left in the heartbeat window; 0 once expired.
    pub time_remaining_ms: u64,
    pub is_expired: bool,
    /// Legacy convention: 0 means no warning outstanding.
    pub warning_triggered_at_ms: u64,
    pub is_warning_active: bool,
    /// Time left in the grace countdown; 0 when none is running.
    pub warning_grace_remaining_ms: u64,
    /// Expired, warned, and past grace: the yield transition would be accepted.
    pub is_execution_ready: bool,
    pub is_yielding: bool,
    pub is_emergency: bool,
    pub is_completed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notification_channel: Option<String>,
    pub activity_nonce: u64,
    pub created_at_ms: u64,
}

impl VaultView {
    /// Project a record at the given instant.
    pub fn derive(record: &VaultRecord, now_ms: u64) -> Self {
        let deadline = record.deadline_ms();
        let time_remaining_ms = deadline.saturating_sub(now_ms);
        let is_expired = record.is_expired(now_ms);

        let warning_triggered_at_ms = record.lifecycle.warning_triggered_at().unwrap_or(0);
        let is_warning_active = warning_triggered_at_ms > 0;
        let warning_grace_remaining_ms = if is_warning_active {
            warning_triggered_at_ms
                .saturating_add(record.grace_period_ms)
                .saturating_sub(now_ms)
        } else {
            0
        };
        let is_execution_ready =
            is_warning_active && warning_grace_remaining_ms == 0 && is_expired;

        let is_completed = record.lifecycle.is_completed();

        Self {
            owner_id: record.owner_id.clone(),
            beneficiary_id: record.beneficiary_id.clone(),
            balance: record.balance,
            heartbeat_interval_ms: record.heartbeat_interval_ms,
            grace_period_ms: record.grace_period_ms,
            last_active_ms: record.last_active_ms,
            time_remaining_ms,
            is_expired,
            warning_triggered_at_ms,
            is_warning_active,
            warning_grace_remaining_ms,
            is_execution_ready,
            is_yielding: record.lifecycle.is_yielding(),
            is_emergency: is_completed,
            is_completed,
            notification_channel: record.notification_channel.clone(),
            activity_nonce: record.activity_nonce,
            created_at_ms: record.created_at_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Lifecycle;

    fn record() -> VaultRecord {
        VaultRecord {
            owner_id: "alice.test".to_string(),
            beneficiary_id: "bob.test".to_string(),
            balance: 500,
            heartbeat_interval_ms: 60_000,
            grace_period_ms: 60_000,
            last_active_ms: 0,
            lifecycle: Lifecycle::Alive,
            secure_payload: Some("cipher:xyz".to_string()),
            notification_channel: None,
            activity_nonce: 3,
            created_at_ms: 0,
        }
    }

    #[test]
    fn test_alive_view() {
        let view = VaultView::derive(&record(), 30_000);
        assert_eq!(view.time_remaining_ms, 30_000);
        assert!(!view.is_expired);
        assert!(!view.is_warning_active);
        assert_eq!(view.warning_grace_remaining_ms, 0);
        assert!(!view.is_execution_ready);
    }

    #[test]
    fn test_warning_view_counts_down_grace() {
        let mut r = record();
        r.lifecycle = Lifecycle::WarningActive { since_ms: 70_000 };

        let mid_grace = VaultView::derive(&r, 100_000);
        assert!(mid_grace.is_expired);
        assert!(mid_grace.is_warning_active);
        assert_eq!(mid_grace.warning_triggered_at_ms, 70_000);
        assert_eq!(mid_grace.warning_grace_remaining_ms, 30_000);
        assert!(!mid_grace.is_execution_ready);

        let past_grace = VaultView::derive(&r, 130_000);
        assert_eq!(past_grace.warning_grace_remaining_ms, 0);
        assert!(past_grace.is_execution_ready);
    }

    #[test]
    fn test_view_never_exposes_payload() {
        let view = VaultView::derive(&record(), 0);
        let json = serde_json::to_string(&view).unwrap();
        assert!(!json.contains("cipher:xyz"));
        assert!(!json.contains("secure_payload"));
    }

    #[test]
    fn test_completed_view_flags() {
        let mut r = record();
        r.lifecycle = Lifecycle::Completed;
        r.balance = 0;

        let view = VaultView::derive(&r, 200_000);
        assert!(view.is_completed);
        assert!(view.is_emergency);
        assert!(!view.is_yielding);
        assert!(!view.is_warning_active);
    }
}
