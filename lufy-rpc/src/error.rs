//! RPC error taxonomy (§7).

use thiserror::Error;

/// Errors surfaced by [`crate::RpcClient`] and [`crate::RpcServer`].
#[derive(Debug, Error)]
pub enum RpcError {
    /// The caller's timeout elapsed before a response arrived.
    #[error("rpc call timed out")]
    Timeout,

    /// The client connection was lost or explicitly disconnected while the
    /// call was outstanding.
    #[error("rpc client disconnected")]
    Disconnected,

    /// `service.method` has no registered handler.
    #[error("method not found: {0}")]
    MethodNotFound(String),

    /// Argument or reply bytes failed to decode/encode.
    #[error("codec error: {0}")]
    Codec(String),

    /// `RegisterService` called twice for the same service name.
    #[error("service already registered: {0}")]
    ServiceAlreadyRegistered(String),

    /// Client pool could not produce a client within its wait deadline.
    #[error("client pool exhausted")]
    PoolExhausted,

    /// The remote handler itself returned an error (`response.error`).
    #[error("remote error: {0}")]
    Remote(String),

    /// Underlying transport error.
    #[error(transparent)]
    Net(#[from] lufy_net::NetError),
}
