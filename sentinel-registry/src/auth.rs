//! Caller authorization predicates
//!
//! Small but load-bearing: these checks are the only thing preventing an
//! arbitrary caller from forging a heartbeat, draining funds, or reading a
//! payload early. Every mutating operation declares which predicate must
//! hold; violations abort the operation with no state change.

use crate::error::RegistryError;
use crate::record::VaultRecord;

pub fn is_owner(caller: &str, record: &VaultRecord) -> bool {
    caller == record.owner_id
}

pub fn is_beneficiary(caller: &str, record: &VaultRecord) -> bool {
    caller == record.beneficiary_id
}

/// The single statically configured identity allowed to drive the
/// liveness-auto-extend operation.
pub fn is_authorized_agent(caller: &str, agent_id: &str) -> bool {
    caller == agent_id
}

pub fn require_owner(caller: &str, record: &VaultRecord) -> Result<(), RegistryError> {
    if is_owner(caller, record) {
        Ok(())
    } else {
        Err(RegistryError::Unauthorized(caller.to_string()))
    }
}

pub fn require_agent(caller: &str, agent_id: &str) -> Result<(), RegistryError> {
    if is_authorized_agent(caller, agent_id) {
        Ok(())
    } else {
        Err(RegistryError::Unauthorized(caller.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{Lifecycle, MIN_GRACE_PERIOD_MS, MIN_INTERVAL_MS};

    fn record() -> VaultRecord {
        VaultRecord {
            owner_id: "alice.test".to_string(),
            beneficiary_id: "bob.test".to_string(),
            balance: 0,
            heartbeat_interval_ms: MIN_INTERVAL_MS,
            grace_period_ms: MIN_GRACE_PERIOD_MS,
            last_active_ms: 0,
            lifecycle: Lifecycle::Alive,
            secure_payload: None,
            notification_channel: None,
            activity_nonce: 0,
            created_at_ms: 0,
        }
    }

    #[test]
    fn test_owner_predicate() {
        let r = record();
        assert!(is_owner("alice.test", &r));
        assert!(!is_owner("bob.test", &r));
        assert!(require_owner("alice.test", &r).is_ok());
        assert!(matches!(
            require_owner("mallory.test", &r),
            Err(RegistryError::Unauthorized(_))
        ));
    }

    #[test]
    fn test_beneficiary_predicate() {
        let r = record();
        assert!(is_beneficiary("bob.test", &r));
        assert!(!is_beneficiary("alice.test", &r));
    }

    #[test]
    fn test_agent_predicate() {
        assert!(require_agent("agent.test", "agent.test").is_ok());
        assert!(matches!(
            require_agent("mallory.test", "agent.test"),
            Err(RegistryError::Unauthorized(_))
        ));
    }
}
