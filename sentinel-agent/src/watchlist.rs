//! Watched-vault bookkeeping
//!
//! The monitored set is the union of two lists: wallets subscribed through
//! notification channels, and wallets auto-registered through the HTTP API.
//! Persisted as JSON in the agent state directory; losing the file only
//! means subscribers re-register.

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{error, info};

use crate::error::AgentError;

#[derive(Debug, Default, Serialize, Deserialize)]
struct WatchlistFile {
    /// Notification channel -> subscribed wallets.
    #[serde(default)]
    subscribers: BTreeMap<String, BTreeSet<String>>,
    /// Wallets registered directly via the HTTP API.
    #[serde(default)]
    registrations: BTreeSet<String>,
}

/// Persistent watchlist shared by the HTTP API and the monitor.
pub struct Watchlist {
    path: PathBuf,
    inner: RwLock<WatchlistFile>,
}

impl Watchlist {
    /// Load from disk; a missing file starts empty.
    pub fn load(path: PathBuf) -> Result<Self, AgentError> {
        let inner = match std::fs::read_to_string(&path) {
            Ok(content) => serde_json::from_str(&content)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => WatchlistFile::default(),
            Err(e) => return Err(e.into()),
        };
        Ok(Self {
            path,
            inner: RwLock::new(inner),
        })
    }

    /// Register a wallet for monitoring. Returns false if already present.
    pub async fn register(&self, wallet: &str) -> bool {
        let mut inner = self.inner.write().await;
        let added = inner.registrations.insert(wallet.to_string());
        if added {
            info!(wallet = %wallet, "Wallet registered for monitoring");
            self.persist(&inner).await;
        }
        added
    }

    /// Subscribe a notification channel to a wallet.
    pub async fn subscribe(&self, channel: &str, wallet: &str) -> bool {
        let mut inner = self.inner.write().await;
        let added = inner
            .subscribers
            .entry(channel.to_string())
            .or_default()
            .insert(wallet.to_string());
        if added {
            info!(channel = %channel, wallet = %wallet, "Channel subscribed");
            self.persist(&inner).await;
        }
        added
    }

    /// Remove one wallet from a channel's subscriptions.
    pub async fn unsubscribe(&self, channel: &str, wallet: &str) -> bool {
        let mut inner = self.inner.write().await;
        let removed = inner
            .subscribers
            .get_mut(channel)
            .map(|wallets| wallets.remove(wallet))
            .unwrap_or(false);
        if removed {
            if inner
                .subscribers
                .get(channel)
                .map(BTreeSet::is_empty)
                .unwrap_or(false)
            {
                inner.subscribers.remove(channel);
            }
            self.persist(&inner).await;
        }
        removed
    }

    /// The merged monitored set, deduplicated and ordered.
    pub async fn watched(&self) -> Vec<String> {
        let inner = self.inner.read().await;
        let mut set: BTreeSet<String> = inner.registrations.clone();
        for wallets in inner.subscribers.values() {
            set.extend(wallets.iter().cloned());
        }
        set.into_iter().collect()
    }

    /// Channels subscribed to a wallet.
    pub async fn channels_for(&self, wallet: &str) -> Vec<String> {
        let inner = self.inner.read().await;
        inner
            .subscribers
            .iter()
            .filter(|(_, wallets)| wallets.contains(wallet))
            .map(|(channel, _)| channel.clone())
            .collect()
    }

    /// Best-effort persistence: a write failure loses nothing but
    /// durability, so it is logged rather than propagated.
    async fn persist(&self, inner: &WatchlistFile) {
        match serde_json::to_vec_pretty(inner) {
            Ok(bytes) => {
                if let Err(e) = tokio::fs::write(&self.path, bytes).await {
                    error!(path = %self.path.display(), error = %e, "Failed to persist watchlist");
                }
            }
            Err(e) => error!(error = %e, "Failed to serialize watchlist"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_register_and_merge() {
        let dir = TempDir::new().unwrap();
        let watchlist = Watchlist::load(dir.path().join("watchlist.json")).unwrap();

        assert!(watchlist.register("alice.test").await);
        assert!(!watchlist.register("alice.test").await);
        assert!(watchlist.subscribe("chat:42", "bob.test").await);
        assert!(watchlist.subscribe("chat:42", "alice.test").await);

        let watched = watchlist.watched().await;
        assert_eq!(watched, vec!["alice.test", "bob.test"]);
        assert_eq!(watchlist.channels_for("bob.test").await, vec!["chat:42"]);
    }

    #[tokio::test]
    async fn test_unsubscribe_keeps_registrations() {
        let dir = TempDir::new().unwrap();
        let watchlist = Watchlist::load(dir.path().join("watchlist.json")).unwrap();

        watchlist.register("alice.test").await;
        watchlist.subscribe("chat:42", "alice.test").await;
        assert!(watchlist.unsubscribe("chat:42", "alice.test").await);
        assert!(!watchlist.unsubscribe("chat:42", "alice.test").await);

        // Direct registration survives channel unsubscription.
        assert_eq!(watchlist.watched().await, vec!["alice.test"]);
    }

    #[tokio::test]
    async fn test_persistence_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("watchlist.json");

        {
            let watchlist = Watchlist::load(path.clone()).unwrap();
            watchlist.register("alice.test").await;
            watchlist.subscribe("chat:7", "carol.test").await;
        }

        let reloaded = Watchlist::load(path).unwrap();
        assert_eq!(reloaded.watched().await, vec!["alice.test", "carol.test"]);
        assert_eq!(reloaded.channels_for("carol.test").await, vec!["chat:7"]);
    }
}
