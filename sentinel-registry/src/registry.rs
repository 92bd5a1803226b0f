//! The vault registry state machine
//!
//! Every operation reads the caller's or target's whole record, validates the
//! transition against record state, caller identity, and the injected clock,
//! and writes the whole record back (or aborts with no change). Operations
//! against the same owner serialize on a per-owner lock, so a read-modify-
//! write never interleaves with another on the same record.
//!
//! The progression calls (`trigger_warning`, `begin_yield`, `resolve_yield`)
//! are deliberately permissionless: no single party can block the protocol
//! from advancing. Which identity actually drives them in a deployment is an
//! operational concern, not an invariant enforced here.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::broadcast;
use tracing::{info, warn};

use crate::auth;
use crate::clock::{Clock, SystemClock};
use crate::error::RegistryError;
use crate::events::VaultEvent;
use crate::outcome::{
    ResolveOutcome, ResolveStatus, WarningOutcome, WarningStatus, YieldOutcome, YieldStatus,
};
use crate::record::{
    Lifecycle, VaultRecord, DEFAULT_GRACE_PERIOD_MS, DEFAULT_INTERVAL_MS, MIN_GRACE_PERIOD_MS,
    MIN_INTERVAL_MS,
};
use crate::store::{VaultStore, VaultStoreStats};
use crate::view::VaultView;

const EVENT_CHANNEL_CAPACITY: usize = 100;

/// Parameters for `setup_vault`.
#[derive(Debug, Clone, Default)]
pub struct VaultSetup {
    pub beneficiary: String,
    pub interval_ms: Option<u64>,
    pub grace_period_ms: Option<u64>,
    pub secure_payload: Option<String>,
    pub notification_channel: Option<String>,
}

impl VaultSetup {
    pub fn new(beneficiary: impl Into<String>) -> Self {
        Self {
            beneficiary: beneficiary.into(),
            ..Default::default()
        }
    }

    pub fn with_interval_ms(mut self, ms: u64) -> Self {
        self.interval_ms = Some(ms);
        self
    }

    pub fn with_grace_period_ms(mut self, ms: u64) -> Self {
        self.grace_period_ms = Some(ms);
        self
    }

    pub fn with_secure_payload(mut self, payload: impl Into<String>) -> Self {
        self.secure_payload = Some(payload.into());
        self
    }

    pub fn with_notification_channel(mut self, channel: impl Into<String>) -> Self {
        self.notification_channel = Some(channel.into());
        self
    }
}

/// Multi-vault registry: one record per owner identity.
pub struct SentinelRegistry {
    store: VaultStore,
    clock: Arc<dyn Clock>,
    agent_id: String,
    events: broadcast::Sender<VaultEvent>,
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl SentinelRegistry {
    /// Open a registry with the system clock.
    pub fn open<P: AsRef<Path>>(
        path: P,
        agent_id: impl Into<String>,
    ) -> Result<Self, RegistryError> {
        Self::with_clock(path, agent_id, Arc::new(SystemClock))
    }

    /// Open a registry with an explicit clock (tests inject a manual one).
    pub fn with_clock<P: AsRef<Path>>(
        path: P,
        agent_id: impl Into<String>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, RegistryError> {
        let store = VaultStore::open(path)?;
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Ok(Self {
            store,
            clock,
            agent_id: agent_id.into(),
            events,
            locks: Mutex::new(HashMap::new()),
        })
    }

    /// Subscribe to registry events.
    pub fn subscribe_events(&self) -> broadcast::Receiver<VaultEvent> {
        self.events.subscribe()
    }

    pub fn stats(&self) -> Result<VaultStoreStats, RegistryError> {
        self.store.stats()
    }

    // ========================================================================
    // Lifecycle operations
    // ========================================================================

    /// Create the caller's vault. Rejected if one already exists.
    ///
    /// Sub-floor (or absent) interval and grace values fall back to the
    /// defaults instead of erroring; the update operations below are strict.
    pub fn setup_vault(
        &self,
        caller: &str,
        setup: VaultSetup,
    ) -> Result<VaultView, RegistryError> {
        if setup.beneficiary.is_empty() {
            return Err(RegistryError::BeneficiaryRequired);
        }

        let lock = self.lock_for(caller);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);

        if self.store.get(caller)?.is_some() {
            return Err(RegistryError::VaultExists(caller.to_string()));
        }

        let now = self.clock.now_ms();
        let interval = setup
            .interval_ms
            .filter(|ms| *ms >= MIN_INTERVAL_MS)
            .unwrap_or(DEFAULT_INTERVAL_MS);
        let grace = setup
            .grace_period_ms
            .filter(|ms| *ms >= MIN_GRACE_PERIOD_MS)
            .unwrap_or(DEFAULT_GRACE_PERIOD_MS);

        let record = VaultRecord {
            owner_id: caller.to_string(),
            beneficiary_id: setup.beneficiary,
            balance: 0,
            heartbeat_interval_ms: interval,
            grace_period_ms: grace,
            last_active_ms: now,
            lifecycle: Lifecycle::Alive,
            secure_payload: setup.secure_payload,
            notification_channel: setup.notification_channel,
            activity_nonce: 0,
            created_at_ms: now,
        };
        self.store.put(caller, &record)?;

        info!(
            owner = %caller,
            beneficiary = %record.beneficiary_id,
            interval_ms = interval,
            grace_ms = grace,
            "Vault initialized"
        );
        Ok(VaultView::derive(&record, now))
    }

    /// Owner heartbeat: resets the expiry clock and recovers from any
    /// non-terminal failure state. Idempotent.
    pub fn heartbeat(&self, caller: &str) -> Result<(), RegistryError> {
        let lock = self.lock_for(caller);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);

        let mut record = self.require(caller)?;
        auth::require_owner(caller, &record)?;
        if record.lifecycle.is_completed() {
            return Err(RegistryError::VaultCompleted);
        }

        if record.lifecycle != Lifecycle::Alive {
            info!(owner = %caller, "Recovery heartbeat: warning/yield cancelled, owner is alive");
        }
        record.last_active_ms = self.clock.now_ms();
        record.lifecycle = Lifecycle::Alive;
        record.touch();
        self.store.put(caller, &record)?;
        Ok(())
    }

    /// Raise a warning once the heartbeat window has expired. Permissionless;
    /// at most one warning per expiry cycle.
    pub fn trigger_warning(&self, target: &str) -> Result<WarningOutcome, RegistryError> {
        let lock = self.lock_for(target);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);

        let mut record = self.require(target)?;
        if record.lifecycle.is_completed() {
            return Err(RegistryError::VaultCompleted);
        }

        let now = self.clock.now_ms();
        if !record.is_expired(now) {
            return Ok(WarningOutcome {
                status: WarningStatus::NotExpired,
                warning_sent: false,
            });
        }
        if record.lifecycle.warning_triggered_at().is_some() {
            return Ok(WarningOutcome {
                status: WarningStatus::WarningAlreadySent,
                warning_sent: false,
            });
        }

        record.lifecycle = Lifecycle::WarningActive { since_ms: now };
        self.store.put(target, &record)?;
        let _ = self.events.send(VaultEvent::WarningSent {
            owner: target.to_string(),
            at_ms: now,
        });
        warn!(
            owner = %target,
            grace_ms = record.grace_period_ms,
            "Heartbeat expired; warning raised, grace countdown started"
        );
        Ok(WarningOutcome {
            status: WarningStatus::WarningTriggered,
            warning_sent: true,
        })
    }

    /// Enter the yield state once expired, warned, and past grace.
    ///
    /// The ordering is load-bearing: yield cannot be entered without a prior
    /// warning, which guarantees the owner at least one full grace period
    /// before irreversible escalation becomes possible.
    pub fn begin_yield(&self, target: &str) -> Result<YieldOutcome, RegistryError> {
        let lock = self.lock_for(target);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);

        let mut record = self.require(target)?;
        if record.lifecycle.is_completed() {
            return Err(RegistryError::VaultCompleted);
        }

        let now = self.clock.now_ms();
        if !record.is_expired(now) {
            return Ok(YieldOutcome {
                status: YieldStatus::Alive,
                is_yielding: false,
            });
        }

        match record.lifecycle {
            Lifecycle::Alive => Ok(YieldOutcome {
                status: YieldStatus::WarningRequired,
                is_yielding: false,
            }),
            Lifecycle::WarningActive { since_ms } => {
                if now < since_ms.saturating_add(record.grace_period_ms) {
                    return Ok(YieldOutcome {
                        status: YieldStatus::WarningGracePeriod,
                        is_yielding: false,
                    });
                }
                record.lifecycle = Lifecycle::Yielding {
                    warned_at_ms: since_ms,
                };
                self.store.put(target, &record)?;
                let _ = self.events.send(VaultEvent::YieldInitiated {
                    owner: target.to_string(),
                });
                warn!(owner = %target, "Grace period expired; yield initiated, awaiting liveness verdict");
                Ok(YieldOutcome {
                    status: YieldStatus::YieldInitiated,
                    is_yielding: true,
                })
            }
            Lifecycle::Yielding { .. } => Ok(YieldOutcome {
                status: YieldStatus::YieldPending,
                is_yielding: true,
            }),
            Lifecycle::Completed => Err(RegistryError::VaultCompleted),
        }
    }

    /// Deliver the liveness verdict for a yielding vault.
    ///
    /// A negative verdict cancels the yield and clears the warning. A
    /// positive verdict executes the terminal transfer - exactly once: the
    /// vault leaves the yield state in the same commit, so a second call
    /// fails the precondition.
    pub fn resolve_yield(
        &self,
        target: &str,
        confirm_death: bool,
    ) -> Result<ResolveOutcome, RegistryError> {
        let lock = self.lock_for(target);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);

        let mut record = self.require(target)?;
        if !record.lifecycle.is_yielding() {
            return Err(RegistryError::NotYielding);
        }

        if !confirm_death {
            record.lifecycle = Lifecycle::Alive;
            self.store.put(target, &record)?;
            info!(owner = %target, "Owner verified alive; yield cancelled");
            return Ok(ResolveOutcome {
                status: ResolveStatus::ResumedAlive,
                transferred: 0,
            });
        }

        let amount = record.balance;
        let beneficiary = record.beneficiary_id.clone();
        record.balance = 0;
        record.lifecycle = Lifecycle::Completed;
        self.store
            .put_with_credit(target, &record, &beneficiary, amount)?;

        if amount > 0 {
            let _ = self.events.send(VaultEvent::TransferComplete {
                owner: target.to_string(),
                beneficiary: beneficiary.clone(),
                amount,
            });
            warn!(owner = %target, beneficiary = %beneficiary, amount = %amount, "Terminal transfer executed");
            Ok(ResolveOutcome {
                status: ResolveStatus::TransferComplete,
                transferred: amount,
            })
        } else {
            warn!(owner = %target, "Yield confirmed on empty vault; completed with no transfer");
            Ok(ResolveOutcome {
                status: ResolveStatus::TransferEmpty,
                transferred: 0,
            })
        }
    }

    // ========================================================================
    // Funds
    // ========================================================================

    /// Fund a vault. Any caller may deposit into any live vault.
    pub fn deposit(
        &self,
        caller: &str,
        target: &str,
        amount: u128,
    ) -> Result<u128, RegistryError> {
        if amount == 0 {
            return Err(RegistryError::AmountRequired);
        }

        let lock = self.lock_for(target);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);

        let mut record = self.require(target)?;
        if record.lifecycle.is_completed() {
            return Err(RegistryError::VaultCompleted);
        }

        record.balance = record.balance.saturating_add(amount);
        if auth::is_owner(caller, &record) {
            record.touch();
        }
        self.store.put(target, &record)?;
        info!(owner = %target, from = %caller, amount = %amount, new_balance = %record.balance, "Deposit accepted");
        Ok(record.balance)
    }

    /// Withdraw from the caller's vault; `None` means the full balance.
    /// Funds are frozen while a yield is pending and after completion.
    pub fn withdraw(&self, caller: &str, amount: Option<u128>) -> Result<u128, RegistryError> {
        let lock = self.lock_for(caller);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);

        let mut record = self.require(caller)?;
        auth::require_owner(caller, &record)?;
        if record.lifecycle.is_yielding() || record.lifecycle.is_completed() {
            return Err(RegistryError::VaultLocked);
        }

        let amount = amount.unwrap_or(record.balance);
        if amount == 0 {
            return Err(RegistryError::AmountRequired);
        }
        if amount > record.balance {
            return Err(RegistryError::InsufficientBalance {
                requested: amount,
                available: record.balance,
            });
        }

        record.balance -= amount;
        record.touch();
        self.store.put_with_credit(caller, &record, caller, amount)?;
        info!(owner = %caller, amount = %amount, remaining = %record.balance, "Withdrawal executed");
        Ok(amount)
    }

    // ========================================================================
    // Configuration updates (owner-only, any non-terminal state)
    // ========================================================================

    pub fn update_beneficiary(&self, caller: &str, new: &str) -> Result<(), RegistryError> {
        if new.is_empty() {
            return Err(RegistryError::BeneficiaryRequired);
        }
        self.update_record(caller, |record| {
            record.beneficiary_id = new.to_string();
            Ok(())
        })
    }

    pub fn update_interval(&self, caller: &str, ms: u64) -> Result<(), RegistryError> {
        if ms < MIN_INTERVAL_MS {
            return Err(RegistryError::IntervalTooShort(ms));
        }
        self.update_record(caller, |record| {
            record.heartbeat_interval_ms = ms;
            Ok(())
        })
    }

    pub fn update_grace_period(&self, caller: &str, ms: u64) -> Result<(), RegistryError> {
        if ms < MIN_GRACE_PERIOD_MS {
            return Err(RegistryError::GracePeriodTooShort(ms));
        }
        self.update_record(caller, |record| {
            record.grace_period_ms = ms;
            Ok(())
        })
    }

    /// Attach a notification channel. Owner or the authorized agent (the
    /// agent links channels on behalf of dashboard subscribers).
    pub fn link_notification_channel(
        &self,
        caller: &str,
        target: &str,
        channel: &str,
    ) -> Result<(), RegistryError> {
        let lock = self.lock_for(target);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);

        let mut record = self.require(target)?;
        if !auth::is_owner(caller, &record) && !auth::is_authorized_agent(caller, &self.agent_id) {
            return Err(RegistryError::Unauthorized(caller.to_string()));
        }
        record.notification_channel = Some(channel.to_string());
        self.store.put(target, &record)?;
        info!(owner = %target, channel = %channel, "Notification channel linked");
        Ok(())
    }

    // ========================================================================
    // Agent-only progression
    // ========================================================================

    /// Liveness auto-extend: the authorized agent resets the owner's timer
    /// after observing external activity. Equivalent to a heartbeat, except
    /// it never preempts a pending yield - the verdict path owns that state.
    pub fn auto_extend(&self, caller: &str, target: &str) -> Result<(), RegistryError> {
        auth::require_agent(caller, &self.agent_id)?;

        let lock = self.lock_for(target);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);

        let mut record = self.require(target)?;
        if record.lifecycle.is_completed() {
            return Err(RegistryError::VaultCompleted);
        }
        if record.lifecycle.is_yielding() {
            return Err(RegistryError::VaultLocked);
        }

        record.last_active_ms = self.clock.now_ms();
        record.lifecycle = Lifecycle::Alive;
        self.store.put(target, &record)?;
        info!(owner = %target, "Activity detected; heartbeat auto-extended");
        Ok(())
    }

    /// Plain ledger credit outside vault logic (the agent's warning dust
    /// transfer). The sending side is external and not modeled.
    pub fn native_transfer(
        &self,
        from: &str,
        to: &str,
        amount: u128,
    ) -> Result<(), RegistryError> {
        if amount == 0 {
            return Err(RegistryError::AmountRequired);
        }
        self.store.credit(to, amount)?;
        info!(from = %from, to = %to, amount = %amount, "Native transfer recorded");
        Ok(())
    }

    // ========================================================================
    // Payload and teardown
    // ========================================================================

    /// Reveal the secure payload. The owner may always read it; the
    /// beneficiary only once the vault has completed. Everyone else is
    /// rejected.
    pub fn reveal_payload(&self, caller: &str, target: &str) -> Result<String, RegistryError> {
        let record = self.require(target)?;

        let allowed = auth::is_owner(caller, &record)
            || (auth::is_beneficiary(caller, &record) && record.lifecycle.is_completed());
        if !allowed {
            return Err(RegistryError::Unauthorized(caller.to_string()));
        }

        record.secure_payload.ok_or(RegistryError::PayloadNotSet)
    }

    /// Delete the caller's vault from any state, returning the remaining
    /// balance. The administrative escape hatch - and the only way out of a
    /// completed vault.
    pub fn reset_vault(&self, caller: &str) -> Result<u128, RegistryError> {
        let lock = self.lock_for(caller);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);

        let record = self.require(caller)?;
        auth::require_owner(caller, &record)?;

        let returned = record.balance;
        self.store.delete_with_credit(caller, caller, returned)?;
        let _ = self.events.send(VaultEvent::VaultReset {
            owner: caller.to_string(),
            returned,
        });
        info!(owner = %caller, returned = %returned, "Vault reset");
        Ok(returned)
    }

    // ========================================================================
    // Views
    // ========================================================================

    /// Read-only view with derived timing fields. Never includes the payload.
    pub fn get_vault(&self, target: &str) -> Result<Option<VaultView>, RegistryError> {
        let now = self.clock.now_ms();
        Ok(self
            .store
            .get(target)?
            .map(|record| VaultView::derive(&record, now)))
    }

    /// All owner identities with a live vault.
    pub fn get_all_vaults(&self) -> Result<Vec<String>, RegistryError> {
        self.store.list_owners()
    }

    /// Total value credited to an identity by transfers out of the registry.
    pub fn payout_balance(&self, id: &str) -> Result<u128, RegistryError> {
        self.store.payout_balance(id)
    }

    // ========================================================================
    // Internals
    // ========================================================================

    fn require(&self, owner: &str) -> Result<VaultRecord, RegistryError> {
        self.store
            .get(owner)?
            .ok_or_else(|| RegistryError::VaultNotFound(owner.to_string()))
    }

    fn lock_for(&self, owner: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        locks
            .entry(owner.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Owner-only read-modify-write on a non-terminal record.
    fn update_record<F>(&self, caller: &str, apply: F) -> Result<(), RegistryError>
    where
        F: FnOnce(&mut VaultRecord) -> Result<(), RegistryError>,
    {
        let lock = self.lock_for(caller);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);

        let mut record = self.require(caller)?;
        auth::require_owner(caller, &record)?;
        if record.lifecycle.is_completed() {
            return Err(RegistryError::VaultCompleted);
        }

        apply(&mut record)?;
        record.touch();
        self.store.put(caller, &record)?;
        Ok(())
    }
}
