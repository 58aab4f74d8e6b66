//! The registry contract the core consumes from an external key-space
//! store with watch & lease semantics (§4.5).

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::RegistryError;
use crate::model::Lease;

/// One change observed on a watched prefix.
#[derive(Debug, Clone)]
pub enum WatchEvent {
    Put { key: String, value: String },
    Delete { key: String },
}

/// External key-space store with lease and watch semantics. An
/// [`InMemoryRegistry`](crate::memory::InMemoryRegistry) implements this
/// for tests and single-process deployments; production nodes point it at
/// an external coordination service.
#[async_trait]
pub trait RegistryStore: Send + Sync {
    /// Mint a lease with the given TTL, in seconds.
    async fn grant(&self, ttl_secs: u64) -> Result<Lease, RegistryError>;

    /// Stream of renewal acknowledgements for `lease`; the stream closes
    /// when the lease expires or is revoked.
    async fn keep_alive(&self, lease: Lease) -> Result<mpsc::Receiver<()>, RegistryError>;

    /// Write `key -> value`, bound to `lease` so it is deleted when the
    /// lease expires.
    async fn put(&self, key: &str, value: &str, lease: Lease) -> Result<(), RegistryError>;

    /// Delete `key` directly (outside of lease expiry).
    async fn delete(&self, key: &str) -> Result<(), RegistryError>;

    /// All `{key, value}` pairs currently stored under `prefix`.
    async fn get(&self, prefix: &str) -> Result<Vec<(String, String)>, RegistryError>;

    /// Stream of change events under `prefix`, until the receiver is
    /// dropped.
    async fn watch(&self, prefix: &str) -> Result<mpsc::Receiver<WatchEvent>, RegistryError>;

    /// Invalidate `lease`; every key bound to it is deleted.
    async fn revoke(&self, lease: Lease) -> Result<(), RegistryError>;
}
