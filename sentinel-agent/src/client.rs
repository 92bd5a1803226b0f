//! Registry transport
//!
//! The monitor talks to the registry through this trait: invoke a method and
//! either succeed or report failure. Retry/rotation plumbing for remote
//! transports lives behind the trait; the in-process implementation wraps a
//! local [`SentinelRegistry`] directly.

use std::sync::Arc;

use async_trait::async_trait;

use sentinel_registry::{
    ResolveOutcome, SentinelRegistry, VaultView, WarningOutcome, YieldOutcome,
};

use crate::error::AgentError;

/// The registry operations the monitor drives.
#[async_trait]
pub trait RegistryClient: Send + Sync {
    /// Read-only vault view; `None` when no vault exists for the owner.
    async fn get_vault(&self, owner: &str) -> Result<Option<VaultView>, AgentError>;

    async fn trigger_warning(&self, owner: &str) -> Result<WarningOutcome, AgentError>;

    async fn begin_yield(&self, owner: &str) -> Result<YieldOutcome, AgentError>;

    async fn resolve_yield(
        &self,
        owner: &str,
        confirm_death: bool,
    ) -> Result<ResolveOutcome, AgentError>;

    /// Reset the owner's timer after observed activity (agent-authorized).
    async fn auto_extend(&self, owner: &str) -> Result<(), AgentError>;

    /// Symbolic dust transfer to the owner alongside a warning.
    async fn send_warning_dust(&self, owner: &str, amount: u128) -> Result<(), AgentError>;
}

/// In-process client over a local registry.
pub struct InProcessClient {
    registry: Arc<SentinelRegistry>,
    agent_id: String,
}

impl InProcessClient {
    pub fn new(registry: Arc<SentinelRegistry>, agent_id: impl Into<String>) -> Self {
        Self {
            registry,
            agent_id: agent_id.into(),
        }
    }
}

#[async_trait]
impl RegistryClient for InProcessClient {
    async fn get_vault(&self, owner: &str) -> Result<Option<VaultView>, AgentError> {
        Ok(self.registry.get_vault(owner)?)
    }

    async fn trigger_warning(&self, owner: &str) -> Result<WarningOutcome, AgentError> {
        Ok(self.registry.trigger_warning(owner)?)
    }

    async fn begin_yield(&self, owner: &str) -> Result<YieldOutcome, AgentError> {
        Ok(self.registry.begin_yield(owner)?)
    }

    async fn resolve_yield(
        &self,
        owner: &str,
        confirm_death: bool,
    ) -> Result<ResolveOutcome, AgentError> {
        Ok(self.registry.resolve_yield(owner, confirm_death)?)
    }

    async fn auto_extend(&self, owner: &str) -> Result<(), AgentError> {
        Ok(self.registry.auto_extend(&self.agent_id, owner)?)
    }

    async fn send_warning_dust(&self, owner: &str, amount: u128) -> Result<(), AgentError> {
        Ok(self.registry.native_transfer(&self.agent_id, owner, amount)?)
    }
}
