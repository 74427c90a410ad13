//! `stormstack.toml` configuration parser (spec.md §8).

use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct StormConfig {
    pub node: NodeConfig,
    pub scheduler: SchedulerConfig,
    pub autoscaler: AutoscalerConfig,
    pub proxy: ProxyConfig,
    pub module_storage: ModuleStorageConfig,
    pub token: TokenConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    /// Heartbeat TTL for C1 expiry, in seconds.
    pub ttl_secs: u64,
    /// Sweeper cadence, in seconds.
    pub sweep_interval_secs: u64,
    /// Grace period after `ttl` before a stale node is removed, in
    /// seconds. Defaults to `2 * ttl_secs` (spec.md §4.1) when unset.
    pub grace_secs: Option<u64>,
}

impl Default for NodeConfig {
    fn default() -> Self {
        NodeConfig {
            ttl_secs: 60,
            sweep_interval_secs: 5,
            grace_secs: None,
        }
    }
}

impl NodeConfig {
    pub fn grace_secs(&self) -> u64 {
        self.grace_secs.unwrap_or(2 * self.ttl_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// C5 retry budget on node-side deployment failure.
    pub retries: u32,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        SchedulerConfig { retries: 2 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AutoscalerConfig {
    pub enabled: bool,
    pub scale_up_threshold: f64,
    pub scale_down_threshold: f64,
    pub min_nodes: u32,
    pub max_nodes: u32,
    /// How often the background loop evaluates saturation.
    pub poll_interval_secs: u64,
    /// Minimum time between two scale actions, independent of poll cadence.
    pub cooldown_secs: u64,
}

impl Default for AutoscalerConfig {
    fn default() -> Self {
        AutoscalerConfig {
            enabled: false,
            scale_up_threshold: 0.7,
            scale_down_threshold: 0.3,
            min_nodes: 1,
            max_nodes: 10,
            poll_interval_secs: 30,
            cooldown_secs: 300,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxyConfig {
    pub enabled: bool,
    pub timeout_secs: u64,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        ProxyConfig {
            enabled: true,
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModuleStorageConfig {
    pub max_file_size: u64,
    pub directory: String,
}

impl Default for ModuleStorageConfig {
    fn default() -> Self {
        ModuleStorageConfig {
            max_file_size: 100 * 1024 * 1024,
            directory: "modules".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenConfig {
    pub expiry_secs: u64,
    pub rotation_grace_secs: u64,
}

impl Default for TokenConfig {
    fn default() -> Self {
        TokenConfig {
            expiry_secs: 8 * 3600,
            rotation_grace_secs: 3600,
        }
    }
}

impl StormConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: StormConfig = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}
