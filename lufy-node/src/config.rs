//! Node configuration (§6). Loading from YAML/CLI is an external
//! collaborator's job; this crate only defines the shape and, as a
//! convenience, a loader built on the `config` crate the way the wider
//! workspace already depends on it for layered file + env sources.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::NodeError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub name: String,
    pub version: String,
    #[serde(default)]
    pub debug: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    pub tcp_port: u16,
    pub rpc_port: u16,
    #[serde(default)]
    pub http_port: Option<u16>,
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
    #[serde(default = "default_io_timeout_secs")]
    pub read_timeout_secs: u64,
    #[serde(default = "default_io_timeout_secs")]
    pub write_timeout_secs: u64,
}

fn default_max_connections() -> usize {
    10_000
}

fn default_io_timeout_secs() -> u64 {
    30
}

impl NetworkConfig {
    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout_secs)
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_secs(self.write_timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    #[serde(default)]
    pub endpoints: Vec<String>,
    #[serde(default = "default_dial_timeout_secs")]
    pub dial_timeout_secs: u64,
    #[serde(default = "default_prefix")]
    pub prefix: String,
}

fn default_dial_timeout_secs() -> u64 {
    5
}

fn default_prefix() -> String {
    lufy_registry::DEFAULT_PREFIX.to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrokerConfig {
    #[serde(default)]
    pub endpoints: Vec<String>,
    #[serde(default)]
    pub lookup_endpoints: Vec<String>,
    #[serde(default)]
    pub cluster_mode: bool,
    #[serde(default)]
    pub load_balancing: bool,
    #[serde(default)]
    pub failover: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectPoolConfig {
    #[serde(default = "default_pool_capacity")]
    pub max_per_class: usize,
}

fn default_pool_capacity() -> usize {
    256
}

impl Default for ObjectPoolConfig {
    fn default() -> Self {
        Self { max_per_class: default_pool_capacity() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcConfig {
    #[serde(default = "default_rpc_pool_size")]
    pub pool_size: usize,
    #[serde(default = "default_rpc_pool_size")]
    pub max_idle: usize,
    #[serde(default = "default_rpc_idle_timeout_secs")]
    pub idle_timeout_secs: u64,
}

fn default_rpc_pool_size() -> usize {
    8
}

fn default_rpc_idle_timeout_secs() -> u64 {
    60
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            pool_size: default_rpc_pool_size(),
            max_idle: default_rpc_pool_size(),
            idle_timeout_secs: default_rpc_idle_timeout_secs(),
        }
    }
}

/// Everything the node runtime consumes at startup (§6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    pub node_id: String,
    pub node_type: String,
    pub server: ServerConfig,
    pub network: NetworkConfig,
    #[serde(default)]
    pub registry: RegistryConfig,
    #[serde(default)]
    pub broker: BrokerConfig,
    #[serde(default)]
    pub object_pool: ObjectPoolConfig,
    #[serde(default)]
    pub rpc: RpcConfig,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self { endpoints: Vec::new(), dial_timeout_secs: default_dial_timeout_secs(), prefix: default_prefix() }
    }
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self { endpoints: Vec::new(), lookup_endpoints: Vec::new(), cluster_mode: false, load_balancing: false, failover: false }
    }
}

impl NodeConfig {
    /// Layered load: `path` (YAML) overlaid with `LUFY_` prefixed
    /// environment variables, via the `config` crate.
    pub fn load(path: &str) -> Result<Self, NodeError> {
        let built = config::Config::builder()
            .add_source(config::File::with_name(path))
            .add_source(config::Environment::with_prefix("LUFY").separator("__"))
            .build()
            .map_err(|e| NodeError::Config(e.to_string()))?;
        built.try_deserialize().map_err(|e| NodeError::Config(e.to_string()))
    }
}
