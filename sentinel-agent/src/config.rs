//! Configuration for the monitoring agent
//!
//! CLI arguments and environment variable handling using clap. Every knob is
//! env-overridable so the daemon runs unattended from a `.env` file.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use uuid::Uuid;

/// Sentinel Agent - multi-vault warning protocol monitor
#[derive(Parser, Debug, Clone)]
#[command(name = "sentinel-agent")]
#[command(about = "Monitoring agent for Sentinel dead man's switch vaults")]
pub struct Args {
    /// Unique instance identifier for this agent process
    #[arg(long, env = "SENTINEL_NODE_ID", default_value_t = Uuid::new_v4())]
    pub node_id: Uuid,

    /// Data directory (registry store, watchlist)
    #[arg(long, env = "SENTINEL_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Target ledger network label (logged, reserved for remote transports)
    #[arg(long, env = "SENTINEL_NETWORK", default_value = "localnet")]
    pub network: String,

    /// Registry contract identity
    #[arg(long, env = "SENTINEL_CONTRACT_ID", default_value = "registry.sentinel")]
    pub contract_id: String,

    /// Agent identity authorized for auto-extend calls
    #[arg(long, env = "SENTINEL_AGENT_ID", default_value = "agent.sentinel")]
    pub agent_id: String,

    /// Agent signing key material (reserved for remote transports)
    #[arg(long, env = "SENTINEL_AGENT_KEY")]
    pub agent_key: Option<String>,

    /// Poll interval between monitoring cycles (ms)
    #[arg(long, env = "SENTINEL_POLL_INTERVAL_MS", default_value = "15000")]
    pub poll_interval_ms: u64,

    /// Per-vault call timeout budget (ms)
    #[arg(long, env = "SENTINEL_CALL_TIMEOUT_MS", default_value = "15000")]
    pub call_timeout_ms: u64,

    /// Delay between vaults within one cycle, to bound transport load (ms)
    #[arg(long, env = "SENTINEL_VAULT_DELAY_MS", default_value = "500")]
    pub inter_vault_delay_ms: u64,

    /// Symbolic dust amount sent to the owner alongside a warning
    #[arg(long, env = "SENTINEL_WARNING_AMOUNT", default_value = "10000000000000000000")]
    pub warning_amount: u128,

    /// Pause all agent-driven mutation without stopping the process
    #[arg(long, env = "SENTINEL_KILL_SWITCH", default_value = "false")]
    pub kill_switch: bool,

    /// Address for the registration/health HTTP API
    #[arg(long, env = "SENTINEL_LISTEN", default_value = "0.0.0.0:8990")]
    pub listen: SocketAddr,

    /// Fraction of the heartbeat interval after which a vault is in the
    /// danger zone
    #[arg(long, env = "SENTINEL_DANGER_ZONE", default_value = "0.75")]
    pub danger_zone: f64,

    /// Liveness probe used for the yield verdict: "interactive" or "activity"
    #[arg(long, env = "SENTINEL_LIVENESS_PROBE", default_value = "interactive")]
    pub liveness_probe: String,
}

impl Args {
    pub fn into_config(self) -> AgentConfig {
        AgentConfig {
            node_id: self.node_id,
            data_dir: self.data_dir.unwrap_or_else(default_data_dir),
            network: self.network,
            contract_id: self.contract_id,
            agent_id: self.agent_id,
            agent_key: self.agent_key,
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            call_timeout: Duration::from_millis(self.call_timeout_ms),
            inter_vault_delay: Duration::from_millis(self.inter_vault_delay_ms),
            warning_amount: self.warning_amount,
            kill_switch: self.kill_switch,
            listen: self.listen,
            danger_zone: self.danger_zone,
            liveness_probe: self.liveness_probe,
        }
    }
}

/// Default data directory
pub fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("sentinel-agent")
}

/// Resolved runtime configuration.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub node_id: Uuid,
    pub data_dir: PathBuf,
    pub network: String,
    pub contract_id: String,
    pub agent_id: String,
    pub agent_key: Option<String>,
    pub poll_interval: Duration,
    pub call_timeout: Duration,
    pub inter_vault_delay: Duration,
    pub warning_amount: u128,
    pub kill_switch: bool,
    pub listen: SocketAddr,
    pub danger_zone: f64,
    pub liveness_probe: String,
}

impl AgentConfig {
    pub fn registry_path(&self) -> PathBuf {
        self.data_dir.join("registry.sled")
    }

    pub fn watchlist_path(&self) -> PathBuf {
        self.data_dir.join("watchlist.json")
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            node_id: Uuid::new_v4(),
            data_dir: default_data_dir(),
            network: "localnet".to_string(),
            contract_id: "registry.sentinel".to_string(),
            agent_id: "agent.sentinel".to_string(),
            agent_key: None,
            poll_interval: Duration::from_millis(15_000),
            call_timeout: Duration::from_millis(15_000),
            inter_vault_delay: Duration::from_millis(500),
            warning_amount: 10_000_000_000_000_000_000,
            kill_switch: false,
            listen: "127.0.0.1:8990".parse().expect("static addr"),
            danger_zone: 0.75,
            liveness_probe: "interactive".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_parse_defaults() {
        let args = Args::parse_from(["sentinel-agent"]);
        let config = args.into_config();
        assert_eq!(config.poll_interval, Duration::from_millis(15_000));
        assert_eq!(config.danger_zone, 0.75);
        assert!(!config.kill_switch);
        assert_eq!(config.liveness_probe, "interactive");
    }

    #[test]
    fn test_args_parse_overrides() {
        let args = Args::parse_from([
            "sentinel-agent",
            "--agent-id",
            "watcher.test",
            "--poll-interval-ms",
            "1000",
            "--kill-switch",
            "--warning-amount",
            "42",
        ]);
        let config = args.into_config();
        assert_eq!(config.agent_id, "watcher.test");
        assert_eq!(config.poll_interval, Duration::from_millis(1_000));
        assert!(config.kill_switch);
        assert_eq!(config.warning_amount, 42);
    }

    #[test]
    fn test_paths_derive_from_data_dir() {
        let config = AgentConfig {
            data_dir: PathBuf::from("/tmp/sentinel"),
            ..Default::default()
        };
        assert_eq!(config.registry_path(), PathBuf::from("/tmp/sentinel/registry.sled"));
        assert_eq!(config.watchlist_path(), PathBuf::from("/tmp/sentinel/watchlist.json"));
    }
}
