//! Sentinel Registry - dead man's switch vault registry
//!
//! Keyed store of per-owner vault records plus the state machine that moves
//! each vault through the warning protocol. The registry is the single source
//! of truth; the monitoring agent only proposes transitions, every one of
//! which is validated here against record state, caller identity, and the
//! injected clock.
//!
//! ## Lifecycle
//!
//! ```text
//! Alive ──expiry──▶ (warning eligible) ──trigger_warning──▶ WarningActive
//!   ▲                                                            │
//!   │ heartbeat / resolve_yield(false) / auto_extend      grace elapsed
//!   │                                                            ▼
//!   └───────────────────────────────────────────────────── Yielding
//!                                                                │
//!                                          resolve_yield(confirm_death=true)
//!                                                                ▼
//!                                                           Completed
//! ```
//!
//! `Completed` is terminal: the balance has been transferred to the
//! beneficiary and only reads, the gated payload reveal, and `reset_vault`
//! are accepted afterwards.
//!
//! ## Guarantees
//!
//! - One record per owner; a second `setup_vault` is rejected.
//! - A warning precedes every yield, and a full grace period precedes every
//!   transfer - the owner always gets at least one recovery window.
//! - The terminal transfer happens at most once; a second `resolve_yield`
//!   fails the yield-state precondition.
//! - Mutating operations serialize per owner and commit all-or-nothing.

pub mod auth;
pub mod clock;
pub mod error;
pub mod events;
pub mod outcome;
pub mod record;
pub mod registry;
pub mod store;
pub mod view;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::RegistryError;
pub use events::VaultEvent;
pub use outcome::{ResolveOutcome, ResolveStatus, WarningOutcome, WarningStatus, YieldOutcome, YieldStatus};
pub use record::{Lifecycle, VaultRecord, DEFAULT_GRACE_PERIOD_MS, DEFAULT_INTERVAL_MS, MIN_GRACE_PERIOD_MS, MIN_INTERVAL_MS};
pub use registry::{SentinelRegistry, VaultSetup};
pub use store::{VaultStore, VaultStoreStats};
pub use view::VaultView;
