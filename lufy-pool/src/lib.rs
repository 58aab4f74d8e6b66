//! # lufy-pool
//!
//! Bounded object pools used to keep the hot paths of the cluster runtime
//! (TCP reads, RPC envelopes, actor messages) off the allocator.
//!
//! [`Pool<T>`] is the generic primitive: a capped idle list plus a
//! create/reset pair. [`BufferPool`] specializes it into power-of-two byte
//! buffer classes, the shape the TCP and RPC layers actually want.
//!
//! `get()`/`put()` never fail. Past capacity, `get()` waits a short window
//! for a slot to free up and then allocates outside the pool rather than
//! blocking forever or erroring.

mod buffer;
mod pool;
mod stats;

pub use buffer::{BufferPool, BUFFER_SIZES};
pub use pool::{Pool, ACQUIRE_TIMEOUT};
pub use stats::PoolStats;
