//! In-process [`Substrate`], useful for tests and single-node
//! deployments: every producer created from the same instance fans out to
//! every consumer subscribed to the same topic, ignoring endpoint
//! identity (there's only one process).

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::error::BrokerError;
use crate::substrate::{Consumer, ConsumerHandler, Producer, Substrate};

const TOPIC_CHANNEL_CAPACITY: usize = 256;

#[derive(Default)]
pub struct InMemorySubstrate {
    topics: DashMap<String, Vec<mpsc::Sender<Bytes>>>,
}

impl InMemorySubstrate {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

struct InMemoryProducer {
    substrate: Arc<InMemorySubstrate>,
}

#[async_trait]
impl Producer for InMemoryProducer {
    async fn publish(&self, topic: &str, payload: Bytes) -> Result<(), BrokerError> {
        if let Some(mut senders) = self.substrate.topics.get_mut(topic) {
            senders.retain(|tx| tx.try_send(payload.clone()).is_ok());
        }
        Ok(())
    }

    async fn deferred_publish(&self, topic: &str, delay: Duration, payload: Bytes) -> Result<(), BrokerError> {
        let substrate = Arc::clone(&self.substrate);
        let topic = topic.to_string();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Some(mut senders) = substrate.topics.get_mut(&topic) {
                senders.retain(|tx| tx.try_send(payload.clone()).is_ok());
            }
        });
        Ok(())
    }

    async fn ping(&self) -> Result<(), BrokerError> {
        Ok(())
    }

    async fn close(&self) {}
}

struct InMemoryConsumer {
    cancel: CancellationToken,
}

#[async_trait]
impl Consumer for InMemoryConsumer {
    async fn close(&self) {
        self.cancel.cancel();
    }
}

#[async_trait]
impl Substrate for InMemorySubstrate {
    async fn new_producer(self: Arc<Self>, _endpoint: &str) -> Result<Arc<dyn Producer>, BrokerError> {
        Ok(Arc::new(InMemoryProducer { substrate: self }))
    }

    async fn new_consumer(
        self: Arc<Self>,
        _lookup_endpoint: &str,
        topic: &str,
        _channel: &str,
        handler: Arc<dyn ConsumerHandler>,
    ) -> Result<Arc<dyn Consumer>, BrokerError> {
        let (tx, mut rx) = mpsc::channel(TOPIC_CHANNEL_CAPACITY);
        self.topics.entry(topic.to_string()).or_default().push(tx);

        let cancel = CancellationToken::new();
        let task_cancel = cancel.clone();
        let topic = topic.to_string();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    _ = task_cancel.cancelled() => return,
                    payload = rx.recv() => {
                        match payload {
                            Some(payload) => handler.on_message(&topic, payload).await,
                            None => return,
                        }
                    }
                }
            }
        });

        Ok(Arc::new(InMemoryConsumer { cancel }))
    }
}
