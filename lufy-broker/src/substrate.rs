//! The pub/sub substrate contract the broker façade wraps (§4.6).

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::BrokerError;

/// Delivers messages received on a subscribed `(topic, channel)`.
#[async_trait]
pub trait ConsumerHandler: Send + Sync {
    async fn on_message(&self, topic: &str, payload: Bytes);
}

/// One upstream producer endpoint.
#[async_trait]
pub trait Producer: Send + Sync {
    async fn publish(&self, topic: &str, payload: Bytes) -> Result<(), BrokerError>;
    async fn deferred_publish(&self, topic: &str, delay: Duration, payload: Bytes) -> Result<(), BrokerError>;
    async fn ping(&self) -> Result<(), BrokerError>;
    async fn close(&self);
}

/// A running subscription; dropping/awaiting [`Consumer::close`] stops its
/// delivery task.
#[async_trait]
pub trait Consumer: Send + Sync {
    async fn close(&self);
}

/// Creates producers and consumers against concrete endpoints. Distinct
/// from [`Producer`]/[`Consumer`] so a single substrate implementation can
/// mediate many endpoints (single-mode: one; cluster-mode: several).
#[async_trait]
pub trait Substrate: Send + Sync {
    /// Takes `self: Arc<Self>` (rather than `&self`) so implementations
    /// backed by shared internal state can hand a true clone of that
    /// state to the producer/consumer they create.
    async fn new_producer(self: Arc<Self>, endpoint: &str) -> Result<Arc<dyn Producer>, BrokerError>;

    async fn new_consumer(
        self: Arc<Self>,
        lookup_endpoint: &str,
        topic: &str,
        channel: &str,
        handler: Arc<dyn ConsumerHandler>,
    ) -> Result<Arc<dyn Consumer>, BrokerError>;
}
