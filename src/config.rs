//! Node configuration: defaults, file layering, environment overrides.

use std::path::PathBuf;

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use accord_challenge::ChallengeConfig;
use accord_consensus::VerificationConfig;
use accord_settlement::LifecycleConfig;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    /// Mediator identity. Empty means "derive from the signing key".
    pub node_id: String,

    /// Base URL of the chain service
    pub chain_url: String,

    /// Base URL of the reasoning service
    pub oracle_url: String,

    /// Root directory for on-disk record stores
    pub data_dir: PathBuf,

    /// Hex-encoded 32-byte ed25519 secret. Absent means an ephemeral
    /// key is generated at startup.
    pub secret_key_hex: Option<String>,

    pub request_timeout_secs: u64,

    pub monitor_interval_secs: u64,
    pub scan_interval_secs: u64,
    pub verification_poll_interval_secs: u64,
    pub timeout_sweep_interval_secs: u64,

    pub lifecycle: LifecycleConfig,
    pub verification: VerificationConfig,
    pub challenge: ChallengeConfig,
}

impl Default for NodeConfig {
    fn default() -> Self {
        NodeConfig {
            node_id: String::new(),
            chain_url: "http://127.0.0.1:8545".into(),
            oracle_url: "http://127.0.0.1:8600".into(),
            data_dir: PathBuf::from("data"),
            secret_key_hex: None,
            request_timeout_secs: 10,
            monitor_interval_secs: 30,
            scan_interval_secs: 60,
            verification_poll_interval_secs: 15,
            timeout_sweep_interval_secs: 300,
            lifecycle: LifecycleConfig::default(),
            verification: VerificationConfig::default(),
            challenge: ChallengeConfig::default(),
        }
    }
}

impl NodeConfig {
    /// Defaults, then the optional config file, then `ACCORD_*`
    /// environment variables (`__` separates nesting levels).
    pub fn load(path: Option<&str>) -> Result<Self, config::ConfigError> {
        let mut builder =
            Config::builder().add_source(Config::try_from(&NodeConfig::default())?);
        if let Some(path) = path {
            builder = builder.add_source(File::with_name(path));
        }
        builder
            .add_source(Environment::with_prefix("ACCORD").separator("__"))
            .build()?
            .try_deserialize()
    }
}
