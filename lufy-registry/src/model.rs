//! Registry data model (§3).

use std::collections::HashMap;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Default key prefix services are published under (§6).
pub const DEFAULT_PREFIX: &str = "/lufy/services/";
/// Lease TTL (§3, §6).
pub const LEASE_TTL_SECS: u64 = 30;
/// `updateTime` older than this makes a [`ServiceInfo`] stale (§3, §4.5).
pub const STALENESS_THRESHOLD_SECS: i64 = 60;

/// Liveness as published by a node; distinct from staleness, which is a
/// property discovery consumers derive from `update_time`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Online,
    Offline,
}

/// One node's published service record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceInfo {
    pub node_id: String,
    pub node_type: String,
    pub address: String,
    pub port: u16,
    pub load: u64,
    pub status: Status,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    /// Epoch seconds.
    pub update_time: i64,
}

impl ServiceInfo {
    pub fn new(node_id: impl Into<String>, node_type: impl Into<String>, address: impl Into<String>, port: u16) -> Self {
        Self {
            node_id: node_id.into(),
            node_type: node_type.into(),
            address: address.into(),
            port,
            load: 0,
            status: Status::Online,
            metadata: HashMap::new(),
            update_time: Utc::now().timestamp(),
        }
    }

    /// Whether a discovery consumer should treat this entry as offline
    /// because it hasn't been refreshed recently (§3, §4.5), independent
    /// of the `status` field the node itself last published.
    pub fn is_stale(&self, now_epoch_secs: i64) -> bool {
        now_epoch_secs - self.update_time > STALENESS_THRESHOLD_SECS
    }

    pub fn is_online(&self, now_epoch_secs: i64) -> bool {
        self.status == Status::Online && !self.is_stale(now_epoch_secs)
    }
}

/// Registry key a [`ServiceInfo`] is stored under: `<prefix>/<nodeType>/<nodeId>`.
pub fn service_key(prefix: &str, node_type: &str, node_id: &str) -> String {
    let prefix = prefix.trim_end_matches('/');
    format!("{prefix}/{node_type}/{node_id}")
}

/// Prefix used to discover every node of a given type.
pub fn node_type_prefix(prefix: &str, node_type: &str) -> String {
    let prefix = prefix.trim_end_matches('/');
    format!("{prefix}/{node_type}/")
}

/// Opaque lease handle. `Grant` mints one; `Revoke` invalidates it; every
/// registration a node owns is bound to exactly one lease at a time (§3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Lease(pub Uuid);

impl Lease {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for Lease {
    fn default() -> Self {
        Self::new()
    }
}
