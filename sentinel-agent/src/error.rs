//! Error types for the monitoring agent
//!
//! Transport and registry failures are local to one vault check: the monitor
//! logs them and retries on the next poll cycle, relying on the idempotency
//! of the progression calls. Nothing here ever implies anything about the
//! registry's committed state.

use thiserror::Error;

use sentinel_registry::RegistryError;

#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Registry call failed: {0}")]
    Registry(#[from] RegistryError),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Call timed out after {0}ms")]
    Timeout(u64),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] hyper::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}
