//! Per-node-type discovery cache, refreshed by watch events and a
//! periodic safety-net sweep (§4.5).

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use dashmap::{DashMap, DashSet};
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::contract::RegistryStore;
use crate::model::{node_type_prefix, ServiceInfo};

/// How often the safety-net sweep refreshes every currently cached node
/// type (§4.5, §5).
pub const REFRESH_INTERVAL: Duration = Duration::from_secs(30);

/// Caches the latest known snapshot of services per node type.
pub struct DiscoveryCache {
    store: Arc<dyn RegistryStore>,
    prefix: String,
    cache: DashMap<String, Vec<ServiceInfo>>,
    watching: DashSet<String>,
    cancel: CancellationToken,
}

impl DiscoveryCache {
    pub fn new(store: Arc<dyn RegistryStore>, prefix: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            store,
            prefix: prefix.into(),
            cache: DashMap::new(),
            watching: DashSet::new(),
            cancel: CancellationToken::new(),
        })
    }

    /// Current snapshot for `node_type`. Synchronously seeds the cache
    /// (and starts its watch task) the first time a type is requested.
    pub async fn get(self: &Arc<Self>, node_type: &str) -> Vec<ServiceInfo> {
        if let Some(cached) = self.cache.get(node_type) {
            return cached.clone();
        }
        self.refresh_one(node_type).await;
        self.ensure_watching(node_type);
        self.cache.get(node_type).map(|v| v.clone()).unwrap_or_default()
    }

    /// Start the periodic safety-net sweep over every cached node type.
    pub fn spawn_periodic_refresh(self: &Arc<Self>) {
        let this = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(REFRESH_INTERVAL);
            loop {
                tokio::select! {
                    biased;
                    _ = this.cancel.cancelled() => return,
                    _ = ticker.tick() => {
                        let node_types: Vec<String> = this.cache.iter().map(|e| e.key().clone()).collect();
                        for node_type in node_types {
                            this.refresh_one(&node_type).await;
                        }
                    }
                }
            }
        });
    }

    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    async fn refresh_one(&self, node_type: &str) {
        let prefix = node_type_prefix(&self.prefix, node_type);
        match self.store.get(&prefix).await {
            Ok(pairs) => {
                let services = pairs
                    .into_iter()
                    .filter_map(|(_, value)| serde_json::from_str::<ServiceInfo>(&value).ok())
                    .collect();
                self.cache.insert(node_type.to_string(), services);
            }
            Err(e) => warn!(error = %e, node_type, "discovery refresh failed, keeping stale cache"),
        }
    }

    fn ensure_watching(self: &Arc<Self>, node_type: &str) {
        if !self.watching.insert(node_type.to_string()) {
            return; // already watching
        }
        let this = Arc::clone(self);
        let node_type = node_type.to_string();
        tokio::spawn(async move {
            let prefix = node_type_prefix(&this.prefix, &node_type);
            let mut rx = match this.store.watch(&prefix).await {
                Ok(rx) => rx,
                Err(e) => {
                    warn!(error = %e, node_type, "discovery watch failed to establish, relying on periodic refresh");
                    this.watching.remove(&node_type);
                    return;
                }
            };
            loop {
                tokio::select! {
                    biased;
                    _ = this.cancel.cancelled() => return,
                    event = rx.recv() => {
                        if event.is_none() {
                            this.watching.remove(&node_type);
                            return;
                        }
                        this.refresh_one(&node_type).await;
                    }
                }
            }
        });
    }
}

/// Timestamp used by callers comparing against [`ServiceInfo::is_online`].
pub fn now_epoch_secs() -> i64 {
    Utc::now().timestamp()
}
