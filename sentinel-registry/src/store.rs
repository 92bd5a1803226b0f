//! Vault record store
//!
//! Keyed persistence over sled: one tree maps owner identity to the full
//! serialized record, a second tree tracks cumulative outbound payouts per
//! identity. Every write replaces the whole record - there are no
//! partial-field patches, so a reader never observes torn state. Writes that
//! both rewrite a record and credit a payout commit in a single transaction.

use std::path::Path;

use sled::transaction::{ConflictableTransactionError, TransactionError};
use sled::Transactional;
use tracing::info;

use crate::error::RegistryError;
use crate::record::VaultRecord;

const VAULTS_TREE: &str = "vaults";
const PAYOUTS_TREE: &str = "payouts";

/// Keyed store of vault records plus the payout ledger.
pub struct VaultStore {
    vaults: sled::Tree,
    payouts: sled::Tree,
    _db: sled::Db,
}

impl VaultStore {
    /// Open or create the store at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, RegistryError> {
        let db = sled::open(path.as_ref())?;
        let vaults = db.open_tree(VAULTS_TREE)?;
        let payouts = db.open_tree(PAYOUTS_TREE)?;
        info!(path = %path.as_ref().display(), "Opened vault store");
        Ok(Self {
            vaults,
            payouts,
            _db: db,
        })
    }

    /// Fetch a record by owner identity.
    pub fn get(&self, owner: &str) -> Result<Option<VaultRecord>, RegistryError> {
        match self.vaults.get(owner.as_bytes())? {
            Some(value) => Ok(Some(serde_json::from_slice(&value)?)),
            None => Ok(None),
        }
    }

    /// Replace the record for an owner.
    pub fn put(&self, owner: &str, record: &VaultRecord) -> Result<(), RegistryError> {
        let value = serde_json::to_vec(record)?;
        self.vaults.insert(owner.as_bytes(), value)?;
        Ok(())
    }

    /// Remove a record outright.
    pub fn delete(&self, owner: &str) -> Result<(), RegistryError> {
        self.vaults.remove(owner.as_bytes())?;
        Ok(())
    }

    /// Replace a record and credit a payout in one atomic commit.
    pub fn put_with_credit(
        &self,
        owner: &str,
        record: &VaultRecord,
        credit_to: &str,
        amount: u128,
    ) -> Result<(), RegistryError> {
        let value = serde_json::to_vec(record)?;
        (&self.vaults, &self.payouts)
            .transaction(|(vaults, payouts)| {
                vaults.insert(owner.as_bytes(), value.as_slice())?;
                if amount > 0 {
                    let current = payouts
                        .get(credit_to.as_bytes())?
                        .map(|v| decode_u128(&v))
                        .unwrap_or(0);
                    payouts.insert(
                        credit_to.as_bytes(),
                        &current.saturating_add(amount).to_be_bytes()[..],
                    )?;
                }
                Ok::<(), ConflictableTransactionError<()>>(())
            })
            .map_err(map_tx_err)
    }

    /// Delete a record and credit a payout in one atomic commit.
    pub fn delete_with_credit(
        &self,
        owner: &str,
        credit_to: &str,
        amount: u128,
    ) -> Result<(), RegistryError> {
        (&self.vaults, &self.payouts)
            .transaction(|(vaults, payouts)| {
                vaults.remove(owner.as_bytes())?;
                if amount > 0 {
                    let current = payouts
                        .get(credit_to.as_bytes())?
                        .map(|v| decode_u128(&v))
                        .unwrap_or(0);
                    payouts.insert(
                        credit_to.as_bytes(),
                        &current.saturating_add(amount).to_be_bytes()[..],
                    )?;
                }
                Ok::<(), ConflictableTransactionError<()>>(())
            })
            .map_err(map_tx_err)
    }

    /// Credit an identity outside any vault mutation (e.g. a dust transfer).
    pub fn credit(&self, to: &str, amount: u128) -> Result<u128, RegistryError> {
        let updated = self.payouts.update_and_fetch(to.as_bytes(), |old| {
            let current = old.map(decode_u128).unwrap_or(0);
            Some(current.saturating_add(amount).to_be_bytes().to_vec())
        })?;
        Ok(updated.map(|v| decode_u128(&v)).unwrap_or(0))
    }

    /// Total value credited to an identity so far.
    pub fn payout_balance(&self, id: &str) -> Result<u128, RegistryError> {
        Ok(self
            .payouts
            .get(id.as_bytes())?
            .map(|v| decode_u128(&v))
            .unwrap_or(0))
    }

    /// All owner identities with a live record.
    pub fn list_owners(&self) -> Result<Vec<String>, RegistryError> {
        let mut owners = Vec::new();
        for item in self.vaults.iter() {
            let (key, _) = item?;
            if let Ok(owner) = String::from_utf8(key.to_vec()) {
                owners.push(owner);
            }
        }
        Ok(owners)
    }

    /// Aggregate store statistics.
    pub fn stats(&self) -> Result<VaultStoreStats, RegistryError> {
        let mut total_vaults = 0u64;
        let mut total_locked = 0u128;
        for item in self.vaults.iter() {
            let (_, value) = item?;
            let record: VaultRecord = serde_json::from_slice(&value)?;
            total_vaults += 1;
            total_locked = total_locked.saturating_add(record.balance);
        }
        Ok(VaultStoreStats {
            total_vaults,
            total_locked,
        })
    }
}

/// Store statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VaultStoreStats {
    pub total_vaults: u64,
    pub total_locked: u128,
}

fn decode_u128(bytes: &[u8]) -> u128 {
    let mut buf = [0u8; 16];
    if bytes.len() == 16 {
        buf.copy_from_slice(bytes);
    }
    u128::from_be_bytes(buf)
}

fn map_tx_err(err: TransactionError<()>) -> RegistryError {
    match err {
        TransactionError::Storage(e) => RegistryError::Storage(e),
        TransactionError::Abort(()) => RegistryError::Internal("transaction aborted".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{Lifecycle, MIN_GRACE_PERIOD_MS, MIN_INTERVAL_MS};
    use tempfile::TempDir;

    fn store() -> (VaultStore, TempDir) {
        let dir = TempDir::new().unwrap();
        (VaultStore::open(dir.path().join("store")).unwrap(), dir)
    }

    fn record(owner: &str) -> VaultRecord {
        VaultRecord {
            owner_id: owner.to_string(),
            beneficiary_id: "bob.test".to_string(),
            balance: 250,
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
    fn test_put_get_delete_round_trip() {
        let (store, _dir) = store();
        assert!(store.get("alice.test").unwrap().is_none());

        store.put("alice.test", &record("alice.test")).unwrap();
        let loaded = store.get("alice.test").unwrap().unwrap();
        assert_eq!(loaded.owner_id, "alice.test");
        assert_eq!(loaded.balance, 250);

        store.delete("alice.test").unwrap();
        assert!(store.get("alice.test").unwrap().is_none());
    }

    #[test]
    fn test_delete_with_credit_returns_balance() {
        let (store, _dir) = store();
        store.put("alice.test", &record("alice.test")).unwrap();

        store.delete_with_credit("alice.test", "alice.test", 250).unwrap();
        assert!(store.get("alice.test").unwrap().is_none());
        assert_eq!(store.payout_balance("alice.test").unwrap(), 250);
    }

    #[test]
    fn test_put_with_credit_commits_both_sides() {
        let (store, _dir) = store();
        let mut r = record("alice.test");
        store.put("alice.test", &r).unwrap();

        r.balance = 0;
        store.put_with_credit("alice.test", &r, "bob.test", 250).unwrap();

        assert_eq!(store.get("alice.test").unwrap().unwrap().balance, 0);
        assert_eq!(store.payout_balance("bob.test").unwrap(), 250);
    }

    #[test]
    fn test_credit_accumulates() {
        let (store, _dir) = store();
        assert_eq!(store.credit("carol.test", 10).unwrap(), 10);
        assert_eq!(store.credit("carol.test", 5).unwrap(), 15);
        assert_eq!(store.payout_balance("carol.test").unwrap(), 15);
        assert_eq!(store.payout_balance("nobody.test").unwrap(), 0);
    }

    #[test]
    fn test_list_owners_and_stats() {
        let (store, _dir) = store();
        store.put("alice.test", &record("alice.test")).unwrap();
        store.put("bob.test", &record("bob.test")).unwrap();

        let mut owners = store.list_owners().unwrap();
        owners.sort();
        assert_eq!(owners, vec!["alice.test", "bob.test"]);

        let stats = store.stats().unwrap();
        assert_eq!(stats.total_vaults, 2);
        assert_eq!(stats.total_locked, 500);
    }
}
