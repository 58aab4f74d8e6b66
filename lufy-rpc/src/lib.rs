//! # lufy-rpc
//!
//! Node-to-node RPC built on the shared framed transport
//! ([`lufy_net`]). Requests and responses are JSON envelopes correlated
//! by a monotonic request id; [`RpcServer`] dispatches through a typed
//! per-service method table rather than runtime reflection, and
//! [`ClientPool`] bounds how many live connections any one peer holds
//! open.

mod client;
mod dispatch;
mod envelope;
mod error;
mod pool;
mod server;

pub use client::RpcClient;
pub use dispatch::{JsonMethod, MethodHandler, ServiceTable};
pub use envelope::{RequestEnvelope, ResponseEnvelope};
pub use error::RpcError;
pub use pool::{ClientPool, POOL_WAIT_TIMEOUT};
pub use server::RpcServer;
