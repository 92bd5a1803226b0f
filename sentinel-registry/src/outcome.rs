//! Typed outcomes for the progression calls
//!
//! The warning, yield, and resolve operations report precondition-not-met
//! results as values the caller branches on, not as errors. Status variants
//! serialize to the legacy SCREAMING_SNAKE strings external dashboards and
//! indexers already consume.

use serde::{Deserialize, Serialize};

use crate::record::u128_string;

/// Result of `trigger_warning`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WarningStatus {
    /// Heartbeat window still open; nothing to warn about.
    NotExpired,
    /// A warning is already outstanding for this expiry cycle.
    WarningAlreadySent,
    /// Warning raised; grace countdown started.
    WarningTriggered,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WarningOutcome {
    pub status: WarningStatus,
    pub warning_sent: bool,
}

/// Result of `begin_yield`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum YieldStatus {
    /// Heartbeat window still open.
    Alive,
    /// No warning has been raised; yield cannot be entered without one.
    WarningRequired,
    /// Warning raised but its grace period has not elapsed.
    WarningGracePeriod,
    /// Already awaiting a liveness verdict.
    YieldPending,
    /// Yield entered; external verification now required.
    YieldInitiated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct YieldOutcome {
    pub status: YieldStatus,
    pub is_yielding: bool,
}

/// Result of `resolve_yield`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResolveStatus {
    /// Negative verdict: owner verified alive, yield cancelled.
    ResumedAlive,
    /// Positive verdict: balance transferred to the beneficiary.
    TransferComplete,
    /// Positive verdict on an empty vault; terminal all the same.
    TransferEmpty,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolveOutcome {
    pub status: ResolveStatus,
    #[serde(with = "u128_string")]
    pub transferred: u128,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_statuses_serialize_to_legacy_strings() {
        assert_eq!(
            serde_json::to_string(&WarningStatus::NotExpired).unwrap(),
            "\"NOT_EXPIRED\""
        );
        assert_eq!(
            serde_json::to_string(&WarningStatus::WarningAlreadySent).unwrap(),
            "\"WARNING_ALREADY_SENT\""
        );
        assert_eq!(
            serde_json::to_string(&YieldStatus::WarningGracePeriod).unwrap(),
            "\"WARNING_GRACE_PERIOD\""
        );
        assert_eq!(
            serde_json::to_string(&YieldStatus::YieldInitiated).unwrap(),
            "\"YIELD_INITIATED\""
        );
        assert_eq!(
            serde_json::to_string(&ResolveStatus::ResumedAlive).unwrap(),
            "\"RESUMED_ALIVE\""
        );
        assert_eq!(
            serde_json::to_string(&ResolveStatus::TransferComplete).unwrap(),
            "\"TRANSFER_COMPLETE\""
        );
    }

    #[test]
    fn test_transferred_serializes_as_string() {
        let outcome = ResolveOutcome {
            status: ResolveStatus::TransferComplete,
            transferred: 1_000,
        };
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["transferred"], "1000");
    }
}
