//! Topic broker façade: publish/subscribe policy over a pluggable
//! [`Substrate`] (§4.6).

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use dashmap::DashMap;
use tracing::warn;

use crate::error::BrokerError;
use crate::substrate::{Consumer, ConsumerHandler, Producer, Substrate};

/// Single-producer-and-lookup-endpoint vs. multi-endpoint cluster mode
/// (§4.6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Single,
    Cluster,
}

/// Publish/subscribe tuning (§4.6, §6 `nsq.*`).
#[derive(Debug, Clone)]
pub struct BrokerOptions {
    pub mode: Mode,
    pub load_balancing: bool,
    pub failover: bool,
}

impl Default for BrokerOptions {
    fn default() -> Self {
        Self { mode: Mode::Single, load_balancing: false, failover: false }
    }
}

/// Wraps a [`Substrate`] with the typed publish/subscribe policy the node
/// runtime relies on.
pub struct TopicBroker {
    producers: Vec<Arc<dyn Producer>>,
    lookup_endpoints: Vec<String>,
    substrate: Arc<dyn Substrate>,
    options: BrokerOptions,
    producer_cursor: AtomicUsize,
    consumers: DashMap<(String, String), Vec<Arc<dyn Consumer>>>,
    closed: AtomicBool,
}

impl TopicBroker {
    /// Build producers for every configured endpoint (one in single mode,
    /// one per endpoint in cluster mode).
    pub async fn new(
        substrate: Arc<dyn Substrate>,
        endpoints: Vec<String>,
        lookup_endpoints: Vec<String>,
        options: BrokerOptions,
    ) -> Result<Arc<Self>, BrokerError> {
        let mut producers = Vec::new();
        match options.mode {
            Mode::Single => {
                let endpoint = endpoints.first().cloned().unwrap_or_default();
                producers.push(Arc::clone(&substrate).new_producer(&endpoint).await?);
            }
            Mode::Cluster => {
                for endpoint in &endpoints {
                    producers.push(Arc::clone(&substrate).new_producer(endpoint).await?);
                }
            }
        }
        Ok(Arc::new(Self {
            producers,
            lookup_endpoints,
            substrate,
            options,
            producer_cursor: AtomicUsize::new(0),
            consumers: DashMap::new(),
            closed: AtomicBool::new(false),
        }))
    }

    /// Publish `payload` on `topic`, applying the cluster load-balancing
    /// and failover policy (§4.6).
    pub async fn publish(&self, topic: &str, payload: Bytes) -> Result<(), BrokerError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(BrokerError::Closed);
        }
        if self.options.mode == Mode::Cluster && self.options.load_balancing && self.producers.len() >= 2 {
            let start = self.producer_cursor.fetch_add(1, Ordering::Relaxed) % self.producers.len();
            match self.producers[start].publish(topic, payload.clone()).await {
                Ok(()) => return Ok(()),
                Err(primary_err) => {
                    if !self.options.failover {
                        return Err(primary_err);
                    }
                    for offset in 1..self.producers.len() {
                        let idx = (start + offset) % self.producers.len();
                        if self.producers[idx].publish(topic, payload.clone()).await.is_ok() {
                            return Ok(());
                        }
                    }
                    return Err(BrokerError::PublishFailed(format!("all producers failed for topic {topic}")));
                }
            }
        }

        let primary = self
            .producers
            .first()
            .ok_or_else(|| BrokerError::PublishFailed("no producers configured".to_string()))?;
        primary.publish(topic, payload).await
    }

    /// Idempotent-by-key subscribe: a duplicate `(topic, channel)` fails
    /// with [`BrokerError::AlreadySubscribed`]. In cluster mode connects
    /// to every lookup endpoint; with failover on, a per-endpoint connect
    /// failure is logged and skipped rather than aborting the whole
    /// subscribe.
    pub async fn subscribe(self: &Arc<Self>, topic: &str, channel: &str, handler: Arc<dyn ConsumerHandler>) -> Result<(), BrokerError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(BrokerError::Closed);
        }
        let key = (topic.to_string(), channel.to_string());
        if self.consumers.contains_key(&key) {
            return Err(BrokerError::AlreadySubscribed { topic: topic.to_string(), channel: channel.to_string() });
        }

        let endpoints: Vec<String> = match self.options.mode {
            Mode::Single => vec![self.lookup_endpoints.first().cloned().unwrap_or_default()],
            Mode::Cluster => self.lookup_endpoints.clone(),
        };

        let mut consumers = Vec::new();
        for endpoint in &endpoints {
            match Arc::clone(&self.substrate).new_consumer(endpoint, topic, channel, Arc::clone(&handler)).await {
                Ok(consumer) => consumers.push(consumer),
                Err(e) if self.options.failover => {
                    warn!(topic, channel, endpoint, error = %e, "consumer endpoint unreachable, continuing with failover");
                }
                Err(e) => return Err(e),
            }
        }

        if consumers.is_empty() {
            return Err(BrokerError::ConnectFailed(format!("no lookup endpoint reachable for {topic}/{channel}")));
        }
        self.consumers.insert(key, consumers);
        Ok(())
    }

    /// Stop and remove the subscription for `(topic, channel)`, awaiting
    /// every underlying consumer's drain before returning (§8 invariant).
    pub async fn unsubscribe(&self, topic: &str, channel: &str) {
        if let Some((_, consumers)) = self.consumers.remove(&(topic.to_string(), channel.to_string())) {
            for consumer in consumers {
                consumer.close().await;
            }
        }
    }

    /// Stop every consumer (awaiting drain), then every producer;
    /// subsequent publishes fail with [`BrokerError::Closed`] (§4.6).
    pub async fn close(&self) {
        self.closed.store(true, Ordering::Release);
        let keys: Vec<(String, String)> = self.consumers.iter().map(|e| e.key().clone()).collect();
        for key in keys {
            if let Some((_, consumers)) = self.consumers.remove(&key) {
                for consumer in consumers {
                    consumer.close().await;
                }
            }
        }
        for producer in &self.producers {
            producer.close().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemorySubstrate;
    use std::sync::atomic::AtomicUsize as StdAtomicUsize;

    struct CountingHandler {
        count: Arc<StdAtomicUsize>,
    }

    #[async_trait::async_trait]
    impl ConsumerHandler for CountingHandler {
        async fn on_message(&self, _topic: &str, _payload: Bytes) {
            self.count.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn duplicate_subscribe_fails() {
        let substrate = InMemorySubstrate::new();
        let broker = TopicBroker::new(substrate, vec!["mem".into()], vec!["mem".into()], BrokerOptions::default())
            .await
            .unwrap();
        let handler = Arc::new(CountingHandler { count: Arc::new(StdAtomicUsize::new(0)) });
        broker.subscribe("game_events", "n1", handler.clone()).await.unwrap();
        let err = broker.subscribe("game_events", "n1", handler).await.unwrap_err();
        assert!(matches!(err, BrokerError::AlreadySubscribed { .. }));
    }

    #[tokio::test]
    async fn publish_reaches_subscriber() {
        let substrate = InMemorySubstrate::new();
        let broker = TopicBroker::new(substrate, vec!["mem".into()], vec!["mem".into()], BrokerOptions::default())
            .await
            .unwrap();
        let count = Arc::new(StdAtomicUsize::new(0));
        let handler = Arc::new(CountingHandler { count: count.clone() });
        broker.subscribe("chat_messages", "n1", handler).await.unwrap();

        broker.publish("chat_messages", Bytes::from_static(b"hi")).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn close_rejects_further_publish() {
        let substrate = InMemorySubstrate::new();
        let broker = TopicBroker::new(substrate, vec!["mem".into()], vec!["mem".into()], BrokerOptions::default())
            .await
            .unwrap();
        broker.close().await;
        let err = broker.publish("game_events", Bytes::from_static(b"x")).await.unwrap_err();
        assert!(matches!(err, BrokerError::Closed));
    }
}
