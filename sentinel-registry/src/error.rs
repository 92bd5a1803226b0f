//! Error types for the vault registry
//!
//! Precondition-not-met results (`NOT_EXPIRED`, `WARNING_GRACE_PERIOD`, ...)
//! are not errors - they are typed outcomes in [`crate::outcome`] that callers
//! branch on. Everything here is a hard failure: the operation aborts with no
//! state change.

use thiserror::Error;

use crate::record::{MIN_GRACE_PERIOD_MS, MIN_INTERVAL_MS};

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("Vault not found: {0}")]
    VaultNotFound(String),

    #[error("Vault already exists for {0}")]
    VaultExists(String),

    #[error("Beneficiary required")]
    BeneficiaryRequired,

    #[error("Unauthorized caller: {0}")]
    Unauthorized(String),

    #[error("Vault completed: no further transitions accepted")]
    VaultCompleted,

    #[error("Vault locked pending yield resolution")]
    VaultLocked,

    #[error("Vault not in yield state")]
    NotYielding,

    #[error("Amount required")]
    AmountRequired,

    #[error("Insufficient balance: requested {requested}, available {available}")]
    InsufficientBalance { requested: u128, available: u128 },

    #[error("Heartbeat interval too short: {0}ms (minimum {min}ms)", min = MIN_INTERVAL_MS)]
    IntervalTooShort(u64),

    #[error("Grace period too short: {0}ms (minimum {min}ms)", min = MIN_GRACE_PERIOD_MS)]
    GracePeriodTooShort(u64),

    #[error("No secure payload stored for this vault")]
    PayloadNotSet,

    #[error("Storage error: {0}")]
    Storage(#[from] sled::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}
