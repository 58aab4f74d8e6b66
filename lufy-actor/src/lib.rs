//! # lufy-actor
//!
//! Mailbox-backed actor runtime shared by every role in the lufy cluster.
//!
//! An actor is a stable id bound to a user-supplied [`ActorHandler`]. The
//! system owns the mailbox, drains it serially on a single task, and
//! guarantees at most one `on_receive` in flight per actor at a time.
//! Cross-actor communication goes through [`ActorSystem::tell`], never
//! through a direct handle, so the actor ↔ system ↔ message graph stays an
//! arena-plus-index indirection rather than a web of pointers.
//!
//! ```rust
//! use lufy_actor::{ActorContext, ActorHandler, ActorSystem, Message};
//!
//! struct Echo;
//!
//! #[async_trait::async_trait]
//! impl ActorHandler for Echo {
//!     type Error = std::convert::Infallible;
//!
//!     async fn on_receive(&mut self, _ctx: &ActorContext, _msg: Message) -> Result<(), Self::Error> {
//!         Ok(())
//!     }
//! }
//!
//! # #[tokio::main]
//! # async fn main() {
//! let system = ActorSystem::new();
//! system.spawn("echo-1", "echo", Echo).await.unwrap();
//! system.tell("echo-1", Message::new("ping", &b""[..])).await.unwrap();
//! system.shutdown().await;
//! # }
//! ```

mod actor;
mod error;
mod mailbox;
mod message;
mod system;

pub use actor::{ActorContext, ActorHandler};
pub use error::ActorError;
pub use mailbox::DEFAULT_MAILBOX_CAPACITY;
pub use message::Message;
pub use system::ActorSystem;
