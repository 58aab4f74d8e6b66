//! Node-side registration: grants a lease, keeps it alive, and
//! re-publishes everything under a fresh lease if the renewal stream
//! drops (§4.5).

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::RwLock as AsyncRwLock;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::contract::RegistryStore;
use crate::error::RegistryError;
use crate::model::{Lease, LEASE_TTL_SECS};

/// Tracks one node's lease and the entries published under it, and keeps
/// both alive for the node's lifetime.
pub struct Registration {
    store: Arc<dyn RegistryStore>,
    entries: RwLock<HashMap<String, String>>,
    lease: AsyncRwLock<Lease>,
    cancel: CancellationToken,
}

impl Registration {
    /// Grant an initial lease and start the keep-alive task.
    pub async fn start(store: Arc<dyn RegistryStore>) -> Result<Arc<Self>, RegistryError> {
        let lease = store.grant(LEASE_TTL_SECS).await?;
        let registration = Arc::new(Self {
            store,
            entries: RwLock::new(HashMap::new()),
            lease: AsyncRwLock::new(lease),
            cancel: CancellationToken::new(),
        });
        Arc::clone(&registration).spawn_keep_alive();
        Ok(registration)
    }

    /// Publish `key -> value` under the current lease, and remember it so
    /// a lease re-grant republishes it automatically.
    pub async fn publish(&self, key: impl Into<String>, value: impl Into<String>) -> Result<(), RegistryError> {
        let key = key.into();
        let value = value.into();
        let lease = *self.lease.read().await;
        self.store.put(&key, &value, lease).await?;
        self.entries.write().insert(key, value);
        Ok(())
    }

    fn spawn_keep_alive(self: Arc<Self>) {
        tokio::spawn(async move {
            loop {
                if self.cancel.is_cancelled() {
                    return;
                }
                let lease = *self.lease.read().await;
                let mut acks = match self.store.keep_alive(lease).await {
                    Ok(acks) => acks,
                    Err(e) => {
                        warn!(error = %e, "keep-alive stream unavailable, retrying");
                        tokio::time::sleep(std::time::Duration::from_secs(1)).await;
                        continue;
                    }
                };

                loop {
                    tokio::select! {
                        biased;
                        _ = self.cancel.cancelled() => return,
                        ack = acks.recv() => {
                            if ack.is_none() {
                                break; // renewal stream closed; re-grant below
                            }
                        }
                    }
                }

                if self.cancel.is_cancelled() {
                    return;
                }
                match self.store.grant(LEASE_TTL_SECS).await {
                    Ok(new_lease) => {
                        *self.lease.write().await = new_lease;
                        let entries: Vec<(String, String)> = self.entries.read().iter().map(|(k, v)| (k.clone(), v.clone())).collect();
                        for (key, value) in entries {
                            if let Err(e) = self.store.put(&key, &value, new_lease).await {
                                warn!(error = %e, key, "failed to republish under new lease");
                            }
                        }
                    }
                    Err(e) => {
                        warn!(error = %e, "failed to re-grant lease, retrying");
                        tokio::time::sleep(std::time::Duration::from_secs(1)).await;
                    }
                }
            }
        });
    }

    /// Stop the keep-alive task and revoke the lease, deleting every entry
    /// bound to it.
    pub async fn shutdown(&self) {
        self.cancel.cancel();
        let lease = *self.lease.read().await;
        if let Err(e) = self.store.revoke(lease).await {
            warn!(error = %e, "lease revoke failed during shutdown");
        }
    }
}
