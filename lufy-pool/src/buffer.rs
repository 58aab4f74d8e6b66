//! Power-of-two byte-buffer pool.

use crate::pool::Pool;
use crate::stats::PoolStats;

/// Buffer size classes served by [`BufferPool`]. Requests larger than the
/// biggest class bypass the pool entirely.
pub const BUFFER_SIZES: [usize; 6] = [64, 256, 1024, 4096, 16384, 65536];

/// A pool of reusable byte buffers, bucketed by power-of-two capacity.
///
/// `acquire(n)` rounds `n` up to the smallest class in [`BUFFER_SIZES`] that
/// fits it and serves from that class's pool; requests above the largest
/// class get a plain un-pooled `Vec<u8>`.
pub struct BufferPool {
    classes: Vec<(usize, Pool<Vec<u8>>)>,
}

impl Default for BufferPool {
    fn default() -> Self {
        Self::new(64)
    }
}

impl BufferPool {
    /// Build a pool where each size class is bounded at `max_per_class`
    /// idle buffers.
    pub fn new(max_per_class: usize) -> Self {
        let classes = BUFFER_SIZES
            .iter()
            .map(|&size| {
                (
                    size,
                    Pool::new(max_per_class, move || Vec::with_capacity(size), |v: &mut Vec<u8>| v.clear()),
                )
            })
            .collect();
        Self { classes }
    }

    /// Acquire a buffer with capacity at least `min_capacity`.
    pub async fn acquire(&self, min_capacity: usize) -> Vec<u8> {
        match self.classes.iter().find(|(size, _)| *size >= min_capacity) {
            Some((_, pool)) => pool.get().await,
            None => Vec::with_capacity(min_capacity),
        }
    }

    /// Return a buffer acquired via [`BufferPool::acquire`]. Buffers whose
    /// capacity doesn't match any class (i.e. they bypassed the pool) are
    /// simply dropped.
    pub async fn release(&self, buf: Vec<u8>) {
        let capacity = buf.capacity();
        if let Some((_, pool)) = self
            .classes
            .iter()
            .find(|(size, _)| *size == capacity.next_power_of_two().max(64))
        {
            pool.put(buf).await;
        }
    }

    /// Per-class statistics, in the same order as [`BUFFER_SIZES`].
    pub fn stats(&self) -> Vec<(usize, PoolStats)> {
        self.classes.iter().map(|(size, pool)| (*size, pool.stats())).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn acquire_rounds_up_to_class() {
        let pool = BufferPool::new(4);
        let buf = pool.acquire(200).await;
        assert!(buf.capacity() >= 200);
        assert_eq!(buf.capacity(), 256);
    }

    #[tokio::test]
    async fn requests_above_largest_class_bypass_pool() {
        let pool = BufferPool::new(4);
        let buf = pool.acquire(1_000_000).await;
        assert!(buf.capacity() >= 1_000_000);
        // Bypassed buffers aren't tracked by any class.
        for (_, stats) in pool.stats() {
            assert_eq!(stats.created, 0);
        }
    }

    #[tokio::test]
    async fn release_returns_buffer_to_matching_class() {
        let pool = BufferPool::new(4);
        let buf = pool.acquire(50).await;
        assert_eq!(buf.capacity(), 64);
        pool.release(buf).await;
        let reused = pool.acquire(50).await;
        assert_eq!(reused.capacity(), 64);
    }
}
