//! Sentinel Agent - off-chain monitor for the vault warning protocol
//!
//! Polls every watched vault, decides which transition (if any) applies, and
//! invokes the matching registry operation. The registry validates and
//! commits every transition; the agent is a liveness helper, never an
//! authority - all coordination is pull-based and every authoritative
//! decision is re-derived from the vault's own timestamps on each poll.
//!
//! ## Per-vault decision procedure
//!
//! ```text
//! absent            -> skip
//! completed         -> one-time terminal notification, then nothing, ever
//! yielding          -> run liveness probe, deliver the verdict
//! past grace        -> begin_yield
//! warning active    -> report remaining grace time
//! otherwise         -> zone heuristic:
//!     < 75% elapsed  cache activity baseline
//!     >= 75%/expired activity increased -> auto-extend (implicit heartbeat)
//!                    unchanged, expired -> trigger_warning + dust + alert
//!                    unchanged, danger  -> early-warning alert (deduped)
//! ```
//!
//! Agent-local caches (activity baselines, notification dedup) are safe to
//! lose: a restart only risks a duplicate notification or slightly later
//! detection, never an incorrect transition.

pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod liveness;
pub mod monitor;
pub mod notify;
pub mod observation;
pub mod watchlist;

pub use client::{InProcessClient, RegistryClient};
pub use config::{AgentConfig, Args};
pub use error::AgentError;
pub use http::HttpApi;
pub use liveness::{ActivityProbe, InteractiveProbe, LivenessProbe};
pub use monitor::Monitor;
pub use notify::{MockNotifier, Notifier, TracingNotifier};
pub use observation::{Observation, ObservationCache};
pub use watchlist::Watchlist;
