//! Pluggable selection strategies over a discovery snapshot (§4.5).

use std::sync::atomic::{AtomicUsize, Ordering};

use dashmap::DashMap;

use crate::discovery::now_epoch_secs;
use crate::model::ServiceInfo;

/// Chooses one service from a node-type's current snapshot.
pub trait LoadBalancer: Send + Sync {
    fn select(&self, node_type: &str, services: &[ServiceInfo]) -> Option<ServiceInfo>;
}

/// Per-node-type counter mod `len(services)`, ignoring `load` and
/// `status` entirely.
#[derive(Default)]
pub struct RoundRobin {
    counters: DashMap<String, AtomicUsize>,
}

impl RoundRobin {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LoadBalancer for RoundRobin {
    fn select(&self, node_type: &str, services: &[ServiceInfo]) -> Option<ServiceInfo> {
        if services.is_empty() {
            return None;
        }
        let counter = self.counters.entry(node_type.to_string()).or_insert_with(|| AtomicUsize::new(0));
        let index = counter.fetch_add(1, Ordering::Relaxed) % services.len();
        services.get(index).cloned()
    }
}

/// Picks the online service with the lowest `load`; if none are online,
/// falls back to the first element of the snapshot (caller decides
/// whether to treat that as degraded, per §4.5).
#[derive(Default)]
pub struct WeightedLoadAware;

impl WeightedLoadAware {
    pub fn new() -> Self {
        Self
    }
}

impl LoadBalancer for WeightedLoadAware {
    fn select(&self, _node_type: &str, services: &[ServiceInfo]) -> Option<ServiceInfo> {
        if services.is_empty() {
            return None;
        }
        let now = now_epoch_secs();
        services
            .iter()
            .filter(|s| s.is_online(now))
            .min_by_key(|s| s.load)
            .or_else(|| services.first())
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Status;

    fn service(id: &str, load: u64, status: Status) -> ServiceInfo {
        ServiceInfo {
            node_id: id.to_string(),
            node_type: "game".to_string(),
            address: "127.0.0.1".to_string(),
            port: 9000,
            load,
            status,
            metadata: Default::default(),
            update_time: now_epoch_secs(),
        }
    }

    #[test]
    fn round_robin_cycles() {
        let lb = RoundRobin::new();
        let services = vec![service("a", 0, Status::Online), service("b", 0, Status::Online)];
        let first = lb.select("game", &services).unwrap();
        let second = lb.select("game", &services).unwrap();
        let third = lb.select("game", &services).unwrap();
        assert_eq!(first.node_id, "a");
        assert_eq!(second.node_id, "b");
        assert_eq!(third.node_id, "a");
    }

    #[test]
    fn weighted_picks_lowest_load_online() {
        let lb = WeightedLoadAware::new();
        let services = vec![
            service("a", 10, Status::Online),
            service("b", 2, Status::Online),
            service("c", 0, Status::Offline),
        ];
        let chosen = lb.select("game", &services).unwrap();
        assert_eq!(chosen.node_id, "b");
    }

    #[test]
    fn weighted_falls_back_to_first_when_none_online() {
        let lb = WeightedLoadAware::new();
        let services = vec![service("a", 10, Status::Offline), service("b", 2, Status::Offline)];
        let chosen = lb.select("game", &services).unwrap();
        assert_eq!(chosen.node_id, "a");
    }
}
