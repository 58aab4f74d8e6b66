//! # lufy-broker
//!
//! Typed topic broker façade over a pluggable pub/sub [`Substrate`].
//! [`TopicBroker`] applies the cluster load-balancing/failover publish
//! policy and the idempotent-by-key subscribe policy; [`memory`] provides
//! an in-process substrate for tests and single-node deployments;
//! [`topics`] names the channels the node runtime uses.

mod broker;
mod error;
mod memory;
mod substrate;
mod topics;

pub use broker::{BrokerOptions, Mode, TopicBroker};
pub use error::BrokerError;
pub use memory::InMemorySubstrate;
pub use substrate::{Consumer, ConsumerHandler, Producer, Substrate};
pub use topics::{SystemCommand, SystemMessage, CHAT_MESSAGES_TOPIC, GAME_EVENTS_TOPIC, SYSTEM_MESSAGES_TOPIC};
