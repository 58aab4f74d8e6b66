//! Node-level errors: mostly thin wrappers over each component's own
//! error type, plus fatal-init conditions (§7).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum NodeError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Net(#[from] lufy_net::NetError),

    #[error(transparent)]
    Rpc(#[from] lufy_rpc::RpcError),

    #[error(transparent)]
    Registry(#[from] lufy_registry::RegistryError),

    #[error(transparent)]
    Broker(#[from] lufy_broker::BrokerError),
}
