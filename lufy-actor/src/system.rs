//! The actor system: a registry of running actors plus spawn/tell/shutdown.

use std::sync::Arc;

use dashmap::DashMap;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::actor::{ActorContext, ActorHandler};
use crate::error::ActorError;
use crate::mailbox::{self, MailboxSender, SendOutcome, DEFAULT_MAILBOX_CAPACITY};
use crate::message::Message;

struct ActorEntry {
    sender: MailboxSender,
    drain: tokio::task::JoinHandle<()>,
}

/// Arena that owns every running actor, keyed by its stable id.
///
/// Actors never hold a direct handle to one another; all cross-actor
/// communication goes through `ActorSystem::tell`, which resolves the id
/// through this map. This keeps the actor ↔ system ↔ message graph acyclic
/// at the ownership level even though the logical graph is cyclic.
#[derive(Clone)]
pub struct ActorSystem {
    actors: Arc<DashMap<String, ActorEntry>>,
    root_cancel: CancellationToken,
}

impl Default for ActorSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl ActorSystem {
    /// Create an empty actor system.
    pub fn new() -> Self {
        Self {
            actors: Arc::new(DashMap::new()),
            root_cancel: CancellationToken::new(),
        }
    }

    /// Number of actors currently registered.
    pub fn actor_count(&self) -> usize {
        self.actors.len()
    }

    /// Spawn a new actor under `id` with the given `role` tag, using the
    /// default mailbox capacity.
    pub async fn spawn<H>(&self, id: impl Into<String>, role: impl Into<String>, handler: H) -> Result<(), ActorError>
    where
        H: ActorHandler,
    {
        self.spawn_with_capacity(id, role, handler, DEFAULT_MAILBOX_CAPACITY).await
    }

    /// Spawn a new actor with an explicit mailbox capacity.
    pub async fn spawn_with_capacity<H>(
        &self,
        id: impl Into<String>,
        role: impl Into<String>,
        mut handler: H,
        capacity: usize,
    ) -> Result<(), ActorError>
    where
        H: ActorHandler,
    {
        if self.root_cancel.is_cancelled() {
            return Err(ActorError::ShuttingDown);
        }
        let id = id.into();
        let role = role.into();

        if self.actors.contains_key(&id) {
            return Err(ActorError::AlreadyRunning(id));
        }

        let (sender, mut receiver) = mailbox::channel(capacity);
        let drain_cancel = self.root_cancel.child_token();
        let ctx = ActorContext::new(id.clone(), role);

        if let Err(err) = handler.on_start(&ctx).await {
            warn!(actor = %id, error = %err, "actor on_start failed");
        }

        let drain = tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    _ = drain_cancel.cancelled() => break,
                    msg = receiver.recv() => {
                        match msg {
                            Some(msg) => Self::dispatch(&mut handler, &ctx, msg).await,
                            None => break,
                        }
                    }
                }
            }
            handler.on_stop(&ctx).await;
        });

        self.actors.insert(id, ActorEntry { sender, drain });
        Ok(())
    }

    async fn dispatch<H: ActorHandler>(handler: &mut H, ctx: &ActorContext, msg: Message) {
        if let Err(err) = handler.on_receive(ctx, msg).await {
            warn!(actor = ctx.id(), error = %err, "actor on_receive failed, resuming");
        }
    }

    /// Enqueue `msg` for the actor registered under `id`.
    pub async fn tell(&self, id: &str, msg: Message) -> Result<(), ActorError> {
        let sender = {
            let entry = self.actors.get(id).ok_or_else(|| ActorError::NotRunning(id.to_string()))?;
            entry.sender.clone()
        };
        match sender.send(msg).await {
            SendOutcome::Delivered => Ok(()),
            SendOutcome::Full => Err(ActorError::MailboxFull(id.to_string())),
            SendOutcome::Closed => Err(ActorError::NotRunning(id.to_string())),
        }
    }

    /// Cancel every actor's drain loop, await completion (which runs each
    /// `on_stop`), then clear the registry.
    pub async fn shutdown(&self) {
        self.root_cancel.cancel();

        let entries: Vec<_> = self.actors.iter().map(|e| e.key().clone()).collect();
        for id in entries {
            if let Some((_, entry)) = self.actors.remove(&id) {
                let _ = entry.drain.await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, thiserror::Error)]
    #[error("test actor error")]
    struct TestError;

    struct Recorder {
        seen: Arc<parking_lot::Mutex<Vec<String>>>,
    }

    #[async_trait::async_trait]
    impl ActorHandler for Recorder {
        type Error = TestError;

        async fn on_receive(&mut self, _ctx: &ActorContext, msg: Message) -> Result<(), Self::Error> {
            self.seen.lock().push(msg.tag().to_string());
            Ok(())
        }
    }

    #[tokio::test]
    async fn messages_are_delivered_in_enqueue_order() {
        let system = ActorSystem::new();
        let seen = Arc::new(parking_lot::Mutex::new(Vec::new()));
        system
            .spawn("a", "worker", Recorder { seen: seen.clone() })
            .await
            .unwrap();

        system.tell("a", Message::new("1", &b""[..])).await.unwrap();
        system.tell("a", Message::new("2", &b""[..])).await.unwrap();
        system.tell("a", Message::new("3", &b""[..])).await.unwrap();

        // Allow the drain task to catch up.
        for _ in 0..50 {
            if seen.lock().len() == 3 {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        assert_eq!(*seen.lock(), vec!["1", "2", "3"]);
    }

    #[tokio::test]
    async fn spawn_twice_fails_already_running() {
        let system = ActorSystem::new();
        let seen = Arc::new(parking_lot::Mutex::new(Vec::new()));
        system
            .spawn("dup", "worker", Recorder { seen: seen.clone() })
            .await
            .unwrap();
        let err = system
            .spawn("dup", "worker", Recorder { seen })
            .await
            .unwrap_err();
        assert_eq!(err, ActorError::AlreadyRunning("dup".into()));
    }

    #[tokio::test]
    async fn tell_unknown_actor_fails_not_running() {
        let system = ActorSystem::new();
        let err = system.tell("ghost", Message::new("x", &b""[..])).await.unwrap_err();
        assert_eq!(err, ActorError::NotRunning("ghost".into()));
    }

    #[tokio::test]
    async fn shutdown_stops_delivery_to_all_actors() {
        let system = ActorSystem::new();
        let seen = Arc::new(parking_lot::Mutex::new(Vec::new()));
        system
            .spawn("a", "worker", Recorder { seen: seen.clone() })
            .await
            .unwrap();
        system.shutdown().await;
        assert_eq!(system.actor_count(), 0);
        let err = system.tell("a", Message::new("x", &b""[..])).await.unwrap_err();
        assert_eq!(err, ActorError::NotRunning("a".into()));
    }

    #[tokio::test]
    async fn spawn_after_shutdown_is_rejected() {
        let system = ActorSystem::new();
        system.shutdown().await;
        let seen = Arc::new(AtomicUsize::new(0));
        let _ = seen;
        let err = system
            .spawn(
                "late",
                "worker",
                Recorder {
                    seen: Arc::new(parking_lot::Mutex::new(Vec::new())),
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err, ActorError::ShuttingDown);
    }
}
