//! Monitoring loop
//!
//! Single scheduler over the watched set: a ticker drives full poll cycles,
//! an mpsc nudge channel triggers immediate out-of-band checks after HTTP
//! registration, and a broadcast shutdown signal stops the loop after the
//! in-flight vault finishes. Vaults are processed strictly sequentially with
//! a fixed delay between them to bound transport load; each check runs under
//! its own timeout budget, and a failure against one vault never disturbs
//! the others.

use std::sync::Arc;

use tokio::sync::{broadcast, mpsc};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use sentinel_registry::{ResolveStatus, VaultView};

use crate::client::RegistryClient;
use crate::config::AgentConfig;
use crate::error::AgentError;
use crate::liveness::LivenessProbe;
use crate::notify::{self, Notifier};
use crate::observation::ObservationCache;
use crate::watchlist::Watchlist;

pub struct Monitor {
    config: AgentConfig,
    client: Arc<dyn RegistryClient>,
    probe: Arc<dyn LivenessProbe>,
    notifier: Arc<dyn Notifier>,
    watchlist: Arc<Watchlist>,
    observations: ObservationCache,
}

impl Monitor {
    pub fn new(
        config: AgentConfig,
        client: Arc<dyn RegistryClient>,
        probe: Arc<dyn LivenessProbe>,
        notifier: Arc<dyn Notifier>,
        watchlist: Arc<Watchlist>,
    ) -> Self {
        Self {
            config,
            client,
            probe,
            notifier,
            watchlist,
            observations: ObservationCache::new(),
        }
    }

    /// Run until shutdown. Never returns early on per-vault errors.
    pub async fn run(
        self: Arc<Self>,
        mut shutdown: broadcast::Receiver<()>,
        mut nudge: mpsc::Receiver<String>,
    ) {
        let mut ticker = tokio::time::interval(self.config.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            poll_interval_ms = self.config.poll_interval.as_millis() as u64,
            probe = self.probe.id(),
            kill_switch = self.config.kill_switch,
            "Multi-vault monitoring started"
        );

        loop {
            let tick = tokio::select! {
                _ = ticker.tick() => true,
                Some(wallet) = nudge.recv() => {
                    info!(wallet = %wallet, "Out-of-band check requested");
                    self.check_vault(&wallet).await;
                    false
                }
                _ = shutdown.recv() => {
                    info!("Monitor shutting down");
                    break;
                }
            };

            if tick && self.poll_cycle(&mut shutdown).await {
                break;
            }
        }
    }

    /// One pass over the watched set. Returns true when shutdown was
    /// requested mid-cycle (the in-flight vault is always drained first).
    async fn poll_cycle(&self, shutdown: &mut broadcast::Receiver<()>) -> bool {
        let watched = self.watchlist.watched().await;
        if watched.is_empty() {
            debug!("No vaults watched; waiting for subscribers");
            return false;
        }

        info!(count = watched.len(), "Checking watched vaults");
        for owner in watched {
            self.check_vault(&owner).await;

            if shutdown.try_recv().is_ok() {
                info!("Shutdown requested; stopping after in-flight vault");
                return true;
            }
            tokio::time::sleep(self.config.inter_vault_delay).await;
        }
        false
    }

    /// Check one vault under the per-identity timeout budget.
    pub async fn check_vault(&self, owner: &str) {
        match tokio::time::timeout(self.config.call_timeout, self.process_vault(owner)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                warn!(owner = %owner, error = %e, "Vault check failed; will retry next cycle");
            }
            Err(_) => {
                warn!(
                    owner = %owner,
                    timeout_ms = self.config.call_timeout.as_millis() as u64,
                    "Vault check timed out; will retry next cycle"
                );
            }
        }
    }

    /// The per-vault decision procedure.
    async fn process_vault(&self, owner: &str) -> Result<(), AgentError> {
        let Some(view) = self.client.get_vault(owner).await? else {
            debug!(owner = %owner, "No vault; skipping");
            return Ok(());
        };

        if view.is_completed {
            if !self.observations.get(owner).completed_notified {
                self.notifier
                    .notify(owner, &notify::terminal_message(owner))
                    .await;
                self.observations
                    .update(owner, |o| o.completed_notified = true);
            }
            return Ok(());
        }

        if view.is_yielding {
            return self.resolve_pending_yield(owner).await;
        }

        if view.is_execution_ready {
            if self.mutation_paused(owner, "begin_yield") {
                return Ok(());
            }
            let outcome = self.client.begin_yield(owner).await?;
            info!(owner = %owner, status = ?outcome.status, "Grace period expired; yield requested");
            return Ok(());
        }

        if view.is_warning_active {
            info!(
                owner = %owner,
                remaining = %notify::format_duration(view.warning_grace_remaining_ms),
                "Warning active; grace countdown in progress"
            );
            return Ok(());
        }

        self.apply_zone_heuristic(owner, &view).await
    }

    /// Yield state: obtain a liveness verdict and deliver it.
    async fn resolve_pending_yield(&self, owner: &str) -> Result<(), AgentError> {
        info!(owner = %owner, probe = self.probe.id(), "Yield state; running liveness verification");
        let alive = self.probe.is_alive(owner).await;
        let confirm_death = !alive;

        if self.mutation_paused(owner, "resolve_yield") {
            return Ok(());
        }

        let outcome = self.client.resolve_yield(owner, confirm_death).await?;
        match outcome.status {
            ResolveStatus::ResumedAlive => {
                info!(owner = %owner, "Yield cancelled; owner verified alive");
                self.notifier
                    .notify(owner, &notify::resumed_message(owner))
                    .await;
            }
            ResolveStatus::TransferComplete | ResolveStatus::TransferEmpty => {
                warn!(owner = %owner, transferred = %outcome.transferred, "Terminal transfer executed");
                self.notifier
                    .notify(owner, &notify::transfer_message(owner))
                    .await;
                // The transfer alert doubles as the terminal notification.
                self.observations
                    .update(owner, |o| o.completed_notified = true);
            }
        }
        Ok(())
    }

    /// Normal or freshly expired vault: the danger-zone heuristic.
    async fn apply_zone_heuristic(&self, owner: &str, view: &VaultView) -> Result<(), AgentError> {
        let interval = view.heartbeat_interval_ms.max(1);
        let elapsed = interval.saturating_sub(view.time_remaining_ms);
        let fraction = elapsed as f64 / interval as f64;

        if !view.is_expired && fraction < self.config.danger_zone {
            // Safe zone: refresh the activity baseline for later comparison.
            self.observations.update(owner, |o| {
                o.baseline_nonce = Some(view.activity_nonce);
                o.danger_notified = false;
            });
            debug!(
                owner = %owner,
                remaining = %notify::format_duration(view.time_remaining_ms),
                "Safe zone"
            );
            return Ok(());
        }

        let observation = self.observations.get(owner);
        if observation.baseline_nonce.is_none() {
            // First sighting already in the danger zone: establish the
            // baseline; a verdict needs a second look.
            self.observations
                .update(owner, |o| o.baseline_nonce = Some(view.activity_nonce));
        }

        let activity_increased = matches!(
            observation.baseline_nonce,
            Some(prev) if view.activity_nonce > prev
        );

        if activity_increased {
            if self.mutation_paused(owner, "auto_extend") {
                return Ok(());
            }
            self.client.auto_extend(owner).await?;
            self.observations.update(owner, |o| {
                o.baseline_nonce = Some(view.activity_nonce);
                o.danger_notified = false;
            });
            info!(owner = %owner, "Implicit heartbeat: on-chain activity increased, timer auto-extended");
            self.notifier
                .notify(owner, &notify::auto_extend_message(owner))
                .await;
        } else if view.is_expired {
            if self.mutation_paused(owner, "trigger_warning") {
                return Ok(());
            }
            let outcome = self.client.trigger_warning(owner).await?;
            if outcome.warning_sent {
                warn!(owner = %owner, "Warning triggered on-chain");
                // Dust transfer and alert are both best-effort.
                if let Err(e) = self
                    .client
                    .send_warning_dust(owner, self.config.warning_amount)
                    .await
                {
                    warn!(owner = %owner, error = %e, "Warning dust transfer failed");
                }
                self.notifier
                    .notify(owner, &notify::warning_message(owner, view.grace_period_ms))
                    .await;
                self.observations.update(owner, |o| o.danger_notified = true);
            } else {
                debug!(owner = %owner, status = ?outcome.status, "Warning not raised");
            }
        } else if !observation.danger_notified {
            // Danger zone, not yet expired: early warning, once per cycle.
            self.notifier
                .notify(
                    owner,
                    &notify::early_warning_message(owner, view.time_remaining_ms),
                )
                .await;
            self.observations.update(owner, |o| o.danger_notified = true);
            info!(
                owner = %owner,
                remaining = %notify::format_duration(view.time_remaining_ms),
                "Danger zone; early warning dispatched"
            );
        }
        Ok(())
    }

    /// Kill switch: observe and report, mutate nothing.
    fn mutation_paused(&self, owner: &str, operation: &str) -> bool {
        if self.config.kill_switch {
            warn!(owner = %owner, operation = %operation, "Kill switch engaged; mutation skipped");
            return true;
        }
        false
    }
}
