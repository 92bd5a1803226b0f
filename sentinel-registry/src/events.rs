//! Registry event fan-out
//!
//! State transitions worth indexing are published on a broadcast channel so
//! external consumers (indexers, dashboards) can follow the protocol without
//! polling. Delivery is best-effort: a send with no subscribers is fine, and
//! no state transition ever waits on a receiver.

use serde::Serialize;

use crate::record::u128_string;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum VaultEvent {
    /// A warning was raised; the grace countdown started.
    WarningSent { owner: String, at_ms: u64 },
    /// Grace elapsed and the vault entered the yield state.
    YieldInitiated { owner: String },
    /// The terminal transfer executed.
    TransferComplete {
        owner: String,
        beneficiary: String,
        #[serde(with = "u128_string")]
        amount: u128,
    },
    /// The owner reset the vault; remaining balance returned.
    VaultReset {
        owner: String,
        #[serde(with = "u128_string")]
        returned: u128,
    },
}
