//! Notification dispatch
//!
//! Fire-and-forget delivery to the subscribers of a vault. Delivery is
//! best-effort by contract: a failed notification is logged and dropped,
//! and never blocks or rolls back a state transition.

use std::sync::Mutex;

use async_trait::async_trait;
use tracing::info;

/// Deliver a message to everyone watching a vault.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, wallet: &str, message: &str);
}

/// Default notifier: structured log lines, picked up by whatever transport
/// tails the agent (the chat-bot collaborator consumes these downstream).
pub struct TracingNotifier;

#[async_trait]
impl Notifier for TracingNotifier {
    async fn notify(&self, wallet: &str, message: &str) {
        info!(target: "sentinel_agent::alerts", wallet = %wallet, message = %message, "Alert dispatched");
    }
}

/// Capturing notifier for tests.
#[derive(Debug, Default)]
pub struct MockNotifier {
    sent: Mutex<Vec<(String, String)>>,
}

impl MockNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// All `(wallet, message)` pairs delivered so far.
    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().map(|v| v.clone()).unwrap_or_default()
    }

    /// Messages delivered for one wallet.
    pub fn sent_to(&self, wallet: &str) -> Vec<String> {
        self.sent()
            .into_iter()
            .filter(|(w, _)| w == wallet)
            .map(|(_, m)| m)
            .collect()
    }
}

#[async_trait]
impl Notifier for MockNotifier {
    async fn notify(&self, wallet: &str, message: &str) {
        if let Ok(mut sent) = self.sent.lock() {
            sent.push((wallet.to_string(), message.to_string()));
        }
    }
}

// ============================================================================
// Message builders
// ============================================================================

pub fn warning_message(wallet: &str, grace_ms: u64) -> String {
    format!(
        "WARNING: vault timer for {wallet} has expired. Funds transfer to the beneficiary in {} unless the owner pings.",
        format_duration(grace_ms)
    )
}

pub fn early_warning_message(wallet: &str, remaining_ms: u64) -> String {
    format!(
        "Heads up: vault {wallet} is in the danger zone, {} until expiry. Ping to reset the timer.",
        format_duration(remaining_ms)
    )
}

pub fn auto_extend_message(wallet: &str) -> String {
    format!("Activity detected for {wallet}; vault timer auto-extended.")
}

pub fn resumed_message(wallet: &str) -> String {
    format!("Owner of vault {wallet} verified alive; yield cancelled.")
}

pub fn transfer_message(wallet: &str) -> String {
    format!(
        "TRANSFER EXECUTED: vault {wallet} completed and its balance moved to the beneficiary. The owner did not respond to warnings."
    )
}

pub fn terminal_message(wallet: &str) -> String {
    format!("Vault {wallet} is complete; no further monitoring actions will be taken.")
}

/// Compact duration rendering for alerts: `2d 4h`, `3h 12m`, `5m 30s`, `45s`.
pub fn format_duration(ms: u64) -> String {
    let days = ms / 86_400_000;
    let hours = (ms % 86_400_000) / 3_600_000;
    let minutes = (ms % 3_600_000) / 60_000;
    let seconds = (ms % 60_000) / 1_000;

    if days > 0 {
        format!("{days}d {hours}h")
    } else if hours > 0 {
        format!("{hours}h {minutes}m")
    } else if minutes > 0 {
        format!("{minutes}m {seconds}s")
    } else {
        format!("{seconds}s")
    }
}
