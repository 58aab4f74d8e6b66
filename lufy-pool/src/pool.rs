//! Generic bounded object pool.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;

use crate::stats::{Counters, PoolStats};

/// How long `get()` waits for a slot to free up before allocating outside
/// the pool (§4.1).
pub const ACQUIRE_TIMEOUT: Duration = Duration::from_millis(100);

/// A bounded pool of reusable `T` instances.
///
/// `get()` never fails: once `max_size` instances are outstanding it waits
/// up to [`ACQUIRE_TIMEOUT`] for one to be returned, then falls back to a
/// freshly allocated instance that is not retained on release (the pool
/// stays at `max_size`). `put()` resets the instance via the pool's reset
/// hook before reinserting it; if the pool is already full the instance is
/// simply dropped. No pool operation returns an error.
pub struct Pool<T> {
    idle: Arc<Mutex<Vec<T>>>,
    make: Arc<dyn Fn() -> T + Send + Sync>,
    reset: Arc<dyn Fn(&mut T) + Send + Sync>,
    max_size: usize,
    counters: Arc<Counters>,
}

impl<T: Send + 'static> Pool<T> {
    /// Build a pool bounded at `max_size`, creating instances with `make`
    /// and resetting returned instances with `reset`.
    pub fn new(
        max_size: usize,
        make: impl Fn() -> T + Send + Sync + 'static,
        reset: impl Fn(&mut T) + Send + Sync + 'static,
    ) -> Self {
        Self {
            idle: Arc::new(Mutex::new(Vec::with_capacity(max_size.min(64)))),
            make: Arc::new(make),
            reset: Arc::new(reset),
            max_size: max_size.max(1),
            counters: Arc::new(Counters::default()),
        }
    }

    /// Acquire an instance: reused if one is idle, freshly created
    /// otherwise.
    pub async fn get(&self) -> T {
        self.counters.record_gotten();

        if let Some(item) = self.idle.lock().await.pop() {
            return item;
        }

        // Nothing idle yet; give outstanding holders a brief window to
        // return one before allocating beyond the pool.
        let deadline = tokio::time::Instant::now() + ACQUIRE_TIMEOUT;
        loop {
            tokio::time::sleep(Duration::from_millis(5)).await;
            if let Some(item) = self.idle.lock().await.pop() {
                return item;
            }
            if tokio::time::Instant::now() >= deadline {
                self.counters.record_created();
                return (self.make)();
            }
        }
    }

    /// Return an instance to the pool. Resets it first; drops it if the
    /// pool is already at capacity.
    pub async fn put(&self, mut item: T) {
        self.counters.record_put();
        (self.reset)(&mut item);

        let mut idle = self.idle.lock().await;
        if idle.len() < self.max_size {
            idle.push(item);
        }
        // else: drop `item`, pool stays at capacity.
    }

    /// Read-only lifetime counters.
    pub fn stats(&self) -> PoolStats {
        self.counters.snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn get_creates_then_reuses() {
        let created = Arc::new(AtomicUsize::new(0));
        let created_clone = created.clone();
        let pool: Pool<Vec<u8>> = Pool::new(
            4,
            move || {
                created_clone.fetch_add(1, Ordering::SeqCst);
                Vec::new()
            },
            |v: &mut Vec<u8>| v.clear(),
        );

        let mut buf = pool.get().await;
        buf.extend_from_slice(b"hello");
        pool.put(buf).await;

        let reused = pool.get().await;
        assert!(reused.is_empty()); // reset cleared it
        assert_eq!(created.load(Ordering::SeqCst), 1);
        assert_eq!(pool.stats().created, 1);
        assert_eq!(pool.stats().gotten, 2);
        assert_eq!(pool.stats().put, 1);
    }

    #[tokio::test]
    async fn put_beyond_capacity_is_dropped_not_retained() {
        let pool: Pool<Vec<u8>> = Pool::new(1, Vec::new, |v| v.clear());
        let a = pool.get().await;
        let b = pool.get().await;
        pool.put(a).await;
        pool.put(b).await; // pool already holds one; this one is dropped

        // Capacity stays at 1 no matter how many extra puts happen.
        let _ = pool.get().await;
        let extra = pool.get().await;
        pool.put(extra).await;
        assert_eq!(pool.stats().put, 3);
    }
}
