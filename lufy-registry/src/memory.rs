//! In-memory [`RegistryStore`], useful for tests and single-process
//! deployments. Production nodes would point the same contract at an
//! external coordination service instead.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::contract::{RegistryStore, WatchEvent};
use crate::error::RegistryError;
use crate::model::Lease;

struct LeaseState {
    ttl: Duration,
    keys: HashSet<String>,
    cancel: CancellationToken,
}

/// Watch channel capacity; a slow watcher drops this many buffered events
/// behind before the periodic refresh (§4.5) takes over as the safety
/// net.
const WATCH_CHANNEL_CAPACITY: usize = 64;

#[derive(Default)]
pub struct InMemoryRegistry {
    entries: DashMap<String, (String, Lease)>,
    leases: DashMap<Uuid, LeaseState>,
    watchers: DashMap<String, Vec<mpsc::Sender<WatchEvent>>>,
}

impl InMemoryRegistry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn notify(&self, key: &str, event_for: impl Fn() -> WatchEvent) {
        for mut entry in self.watchers.iter_mut() {
            if key.starts_with(entry.key().as_str()) {
                entry.value_mut().retain(|tx| tx.try_send(event_for()).is_ok());
            }
        }
    }
}

#[async_trait]
impl RegistryStore for InMemoryRegistry {
    async fn grant(&self, ttl_secs: u64) -> Result<Lease, RegistryError> {
        let lease = Lease::new();
        self.leases.insert(
            lease.0,
            LeaseState {
                ttl: Duration::from_secs(ttl_secs),
                keys: HashSet::new(),
                cancel: CancellationToken::new(),
            },
        );
        Ok(lease)
    }

    async fn keep_alive(&self, lease: Lease) -> Result<mpsc::Receiver<()>, RegistryError> {
        let (ttl, cancel) = {
            let state = self.leases.get(&lease.0).ok_or(RegistryError::UnknownLease)?;
            (state.ttl, state.cancel.child_token())
        };
        let (tx, rx) = mpsc::channel(4);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(ttl / 3);
            loop {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        if tx.send(()).await.is_err() {
                            break;
                        }
                    }
                }
            }
        });
        Ok(rx)
    }

    async fn put(&self, key: &str, value: &str, lease: Lease) -> Result<(), RegistryError> {
        let mut state = self.leases.get_mut(&lease.0).ok_or(RegistryError::UnknownLease)?;
        state.keys.insert(key.to_string());
        drop(state);
        self.entries.insert(key.to_string(), (value.to_string(), lease));
        let owned_value = value.to_string();
        let owned_key = key.to_string();
        self.notify(key, move || WatchEvent::Put { key: owned_key.clone(), value: owned_value.clone() });
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), RegistryError> {
        if let Some((_, (_, lease))) = self.entries.remove(key) {
            if let Some(mut state) = self.leases.get_mut(&lease.0) {
                state.keys.remove(key);
            }
        }
        let owned_key = key.to_string();
        self.notify(key, move || WatchEvent::Delete { key: owned_key.clone() });
        Ok(())
    }

    async fn get(&self, prefix: &str) -> Result<Vec<(String, String)>, RegistryError> {
        Ok(self
            .entries
            .iter()
            .filter(|e| e.key().starts_with(prefix))
            .map(|e| (e.key().clone(), e.value().0.clone()))
            .collect())
    }

    async fn watch(&self, prefix: &str) -> Result<mpsc::Receiver<WatchEvent>, RegistryError> {
        let (tx, rx) = mpsc::channel(WATCH_CHANNEL_CAPACITY);
        self.watchers.entry(prefix.to_string()).or_default().push(tx);
        Ok(rx)
    }

    async fn revoke(&self, lease: Lease) -> Result<(), RegistryError> {
        if let Some((_, state)) = self.leases.remove(&lease.0) {
            state.cancel.cancel();
            for key in state.keys {
                self.entries.remove(&key);
                let owned_key = key.clone();
                self.notify(&key, move || WatchEvent::Delete { key: owned_key.clone() });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_get_revoke_round_trip() {
        let store = InMemoryRegistry::new();
        let lease = store.grant(30).await.unwrap();
        store.put("/lufy/services/gateway/gw-1", "{}", lease).await.unwrap();

        let found = store.get("/lufy/services/gateway/").await.unwrap();
        assert_eq!(found.len(), 1);

        store.revoke(lease).await.unwrap();
        let found = store.get("/lufy/services/gateway/").await.unwrap();
        assert!(found.is_empty());
    }

    #[tokio::test]
    async fn watch_observes_put_and_delete() {
        let store = InMemoryRegistry::new();
        let mut rx = store.watch("/lufy/services/gateway/").await.unwrap();
        let lease = store.grant(30).await.unwrap();
        store.put("/lufy/services/gateway/gw-1", "{}", lease).await.unwrap();

        let event = rx.recv().await.unwrap();
        assert!(matches!(event, WatchEvent::Put { .. }));

        store.delete("/lufy/services/gateway/gw-1").await.unwrap();
        let event = rx.recv().await.unwrap();
        assert!(matches!(event, WatchEvent::Delete { .. }));
    }

    #[tokio::test]
    async fn put_with_unknown_lease_fails() {
        let store = InMemoryRegistry::new();
        let err = store.put("/k", "v", Lease::new()).await.unwrap_err();
        assert!(matches!(err, RegistryError::UnknownLease));
    }
}
