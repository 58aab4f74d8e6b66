//! # lufy-node
//!
//! The node runtime every role embeds: boots object pools, the actor
//! system, the client-facing TCP server, the node-to-node RPC server, the
//! registry registration/discovery pair, and the topic broker, in that
//! order, then owns load reporting, signal handling, and orderly shutdown
//! (§4.7).
//!
//! Role code builds a [`NodeRuntime`], registers its own RPC services and
//! actors, then calls [`NodeRuntime::run`].

mod config;
mod error;
mod node;
mod system_service;

pub use config::{BrokerConfig, NetworkConfig, NodeConfig, ObjectPoolConfig, RegistryConfig, RpcConfig, ServerConfig};
pub use error::NodeError;
pub use node::{NodeRuntime, SystemCommandHandler, LOAD_REPORT_INTERVAL};
pub use system_service::{ReloadHandler, SystemServiceState, SYSTEM_SERVICE_NAME};
