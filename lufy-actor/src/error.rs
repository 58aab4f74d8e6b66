//! Error types for the actor runtime.

use thiserror::Error;

/// Errors surfaced by [`crate::ActorSystem`] operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ActorError {
    /// `Spawn` was called with an id that is already registered and running.
    #[error("actor already running: {0}")]
    AlreadyRunning(String),

    /// `Tell` targeted an id that has no running actor.
    #[error("actor not running: {0}")]
    NotRunning(String),

    /// `Tell` could not enqueue the message within the send deadline.
    #[error("mailbox full for actor: {0}")]
    MailboxFull(String),

    /// The actor system is shutting down and rejects new spawns.
    #[error("actor system is shutting down")]
    ShuttingDown,
}
