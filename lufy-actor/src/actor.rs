//! The `ActorHandler` trait implemented by user-supplied actor logic.

use async_trait::async_trait;

use crate::message::Message;

/// Context passed to an actor's lifecycle and receive hooks.
///
/// Exposes the actor's own identity; handlers reach other actors only
/// through the [`crate::ActorSystem`] handle they were constructed with,
/// never through a direct pointer (see the arena + index design in the
/// runtime's module docs).
pub struct ActorContext {
    id: String,
    role: String,
}

impl ActorContext {
    pub(crate) fn new(id: String, role: String) -> Self {
        Self { id, role }
    }

    /// This actor's stable identifier.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// This actor's role tag.
    pub fn role(&self) -> &str {
        &self.role
    }
}

/// User-supplied actor behavior.
///
/// Implementors own no synchronization: the runtime guarantees at most one
/// `on_receive` invocation executes at a time for a given actor, so `&mut
/// self` access is safe without internal locking.
#[async_trait]
pub trait ActorHandler: Send + 'static {
    /// Error type returned by `on_receive`. Errors are logged by the runtime
    /// and do not stop the actor (§4.2).
    type Error: std::error::Error + Send + Sync + 'static;

    /// Called once before the drain task starts consuming the mailbox.
    async fn on_start(&mut self, _ctx: &ActorContext) -> Result<(), Self::Error> {
        Ok(())
    }

    /// Called for every message drained from the mailbox, one at a time.
    async fn on_receive(&mut self, ctx: &ActorContext, msg: Message) -> Result<(), Self::Error>;

    /// Called exactly once when the actor is stopped, whether by
    /// cancellation or by system shutdown.
    async fn on_stop(&mut self, _ctx: &ActorContext) {}
}
