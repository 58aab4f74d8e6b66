//! # lufy-registry
//!
//! Leased service registration and discovery over a pluggable
//! [`RegistryStore`]. A node grants a lease, publishes itself and keeps
//! the lease alive via [`Registration`]; peers read back snapshots
//! through a [`DiscoveryCache`] that a [`LoadBalancer`] then picks one
//! entry from.
//!
//! [`memory::InMemoryRegistry`] is the store used for tests and
//! single-process setups; production deployments implement
//! [`RegistryStore`] against an external coordination service.

mod balancer;
mod contract;
mod discovery;
mod error;
mod memory;
mod model;
mod registration;

pub use balancer::{LoadBalancer, RoundRobin, WeightedLoadAware};
pub use contract::{RegistryStore, WatchEvent};
pub use discovery::{DiscoveryCache, REFRESH_INTERVAL};
pub use error::RegistryError;
pub use memory::InMemoryRegistry;
pub use model::{node_type_prefix, service_key, Lease, ServiceInfo, Status, DEFAULT_PREFIX, LEASE_TTL_SECS, STALENESS_THRESHOLD_SECS};
pub use registration::Registration;
