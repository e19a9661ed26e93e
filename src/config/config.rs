// src/config/config.rs
use crate::utils::error::MinerError;
use alloy::primitives::Address;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// Public endpoint of the network the mining contract lives on
pub const DEFAULT_RPC_URL: &str = "https://rpc-l1.inan.in.th";

/// Deployed mining contract
pub const DEFAULT_CONTRACT_ADDRESS: &str = "0x8652549D215E3c4e30fe33faa717a566E4f6f00C";

/// Main configuration structure for the mining application
///
/// Every field has a default, so an empty or missing file is a valid
/// configuration. Per-run identity (wallet, NFT) comes from the command line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// JSON-RPC endpoint
    pub rpc_url: String,

    /// Mining contract address
    pub contract_address: String,

    /// Number of search workers (default: 1)
    pub worker_threads: usize,

    /// Hashes between cancellation checks in each worker
    pub check_interval: u64,

    /// Delay between chain polls, in milliseconds
    pub poll_interval_ms: u64,

    /// Delay before retrying a failed chain read, in milliseconds
    pub retry_backoff_ms: u64,

    /// Grace period for workers to stop after cancellation, in milliseconds
    pub join_timeout_ms: u64,

    /// Per-request RPC timeout, in seconds
    pub rpc_timeout_secs: u64,

    /// Confirmation depth required before a submission counts
    pub confirmations: u64,

    /// Time without confirmation before a submission is rebuilt, in seconds
    pub stall_timeout_secs: u64,

    /// Chain ids that use EIP-1559 fees; all others get legacy transactions
    pub fee_market_chains: Vec<u64>,

    /// Where search progress is persisted; disabled when unset
    pub progress_file: Option<PathBuf>,

    /// Interval between statistics log lines, in seconds
    pub stats_interval_secs: u64,

    /// Interval between progress checkpoints, in seconds
    pub checkpoint_interval_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            rpc_url: DEFAULT_RPC_URL.into(),
            contract_address: DEFAULT_CONTRACT_ADDRESS.into(),
            worker_threads: 1,
            check_interval: 4096,
            poll_interval_ms: 1000,
            retry_backoff_ms: 1000,
            join_timeout_ms: 1000,
            rpc_timeout_secs: 10,
            confirmations: 1,
            stall_timeout_secs: 60,
            fee_market_chains: vec![1, 5, 137, 8899],
            progress_file: None,
            stats_interval_secs: 60,
            checkpoint_interval_secs: 5,
        }
    }
}

impl Config {
    /// Loads configuration from a file
    ///
    /// # Arguments
    /// * `path` - Path to the configuration file (TOML format)
    ///
    /// # Returns
    /// * `Ok(Config)` - Successfully loaded configuration
    /// * `Err(MinerError)` - If file couldn't be read or parsed
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, MinerError> {
        let path = path.into();
        let config_str = std::fs::read_to_string(&path).map_err(|e| {
            MinerError::ConfigError(format!(
                "Failed to read config at {}: {}",
                path.display(),
                e
            ))
        })?;

        let config: Config = toml::from_str(&config_str)
            .map_err(|e| MinerError::ConfigError(format!("Invalid config format: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Loads `path` if it exists, otherwise returns the defaults
    pub fn load_or_default(path: &Path) -> Result<Self, MinerError> {
        if path.exists() {
            Self::load(path)
        } else {
            log::debug!("No config at {}, using defaults", path.display());
            Ok(Config::default())
        }
    }

    /// Checks values that would otherwise fail later at runtime
    pub fn validate(&self) -> Result<(), MinerError> {
        url::Url::parse(&self.rpc_url)
            .map_err(|e| MinerError::ConfigError(format!("Invalid rpc_url {}: {}", self.rpc_url, e)))?;
        self.contract()?;
        if self.check_interval == 0 {
            return Err(MinerError::ConfigError(
                "check_interval must be at least 1".into(),
            ));
        }
        if self.poll_interval_ms == 0 {
            return Err(MinerError::ConfigError(
                "poll_interval_ms must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Parsed contract address
    pub fn contract(&self) -> Result<Address, MinerError> {
        Address::from_str(&self.contract_address).map_err(|e| {
            MinerError::ConfigError(format!(
                "Invalid contract_address {}: {}",
                self.contract_address, e
            ))
        })
    }

    /// Delay between chain polls
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Delay before retrying a failed chain read
    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }

    /// Grace period for workers to stop
    pub fn join_timeout(&self) -> Duration {
        Duration::from_millis(self.join_timeout_ms)
    }

    /// Per-request RPC timeout
    pub fn rpc_timeout(&self) -> Duration {
        Duration::from_secs(self.rpc_timeout_secs)
    }

    /// Time without confirmation before a submission is rebuilt
    pub fn stall_timeout(&self) -> Duration {
        Duration::from_secs(self.stall_timeout_secs)
    }

    /// Interval between statistics log lines
    pub fn stats_interval(&self) -> Duration {
        Duration::from_secs(self.stats_interval_secs)
    }

    /// Interval between progress checkpoints
    pub fn checkpoint_interval(&self) -> Duration {
        Duration::from_secs(self.checkpoint_interval_secs)
    }

    /// Generates a configuration template string
    ///
    /// # Returns
    /// String containing a commented TOML configuration template
    pub fn generate_template() -> String {
        let mut template = String::new();
        template.push_str("# CommuDAO Miner Configuration\n\n");
        template.push_str("# JSON-RPC endpoint and mining contract\n");
        template.push_str(&format!("rpc_url = \"{}\"\n", DEFAULT_RPC_URL));
        template.push_str(&format!(
            "contract_address = \"{}\"\n\n",
            DEFAULT_CONTRACT_ADDRESS
        ));
        template.push_str("# Number of search workers (--threads overrides)\n");
        template.push_str("worker_threads = 1\n");
        template.push_str("# Hashes between cancellation checks\n");
        template.push_str("check_interval = 4096\n\n");
        template.push_str("# Chain polling (milliseconds)\n");
        template.push_str("poll_interval_ms = 1000\n");
        template.push_str("retry_backoff_ms = 1000\n");
        template.push_str("join_timeout_ms = 1000\n");
        template.push_str("rpc_timeout_secs = 10\n\n");
        template.push_str("# Submission\n");
        template.push_str("confirmations = 1\n");
        template.push_str("stall_timeout_secs = 60\n");
        template.push_str("# Chain ids that use EIP-1559 fees\n");
        template.push_str("fee_market_chains = [1, 5, 137, 8899]\n\n");
        template.push_str("# Resume an interrupted search after a restart\n");
        template.push_str("# progress_file = \"progress.json\"\n");
        template.push_str("checkpoint_interval_secs = 5\n\n");
        template.push_str("stats_interval_secs = 60\n");
        template
    }
}
