//! Broker error taxonomy (§7).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BrokerError {
    /// `Subscribe` called twice for the same `(topic, channel)` (§4.6, §8).
    #[error("already subscribed to {topic}/{channel}")]
    AlreadySubscribed { topic: String, channel: String },

    /// Every producer failed (with or without failover attempted).
    #[error("publish failed: {0}")]
    PublishFailed(String),

    /// A consumer or producer endpoint could not be reached.
    #[error("substrate connect failed: {0}")]
    ConnectFailed(String),

    /// The broker has been closed; no further publish/subscribe is
    /// accepted.
    #[error("broker is closed")]
    Closed,
}
