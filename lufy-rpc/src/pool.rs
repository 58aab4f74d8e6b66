//! Fixed-capacity pool of idle [`RpcClient`] connections to one peer
//! (§4.4). Guarantees no more than `max_size` live connections to that
//! peer at a time.

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, Notify};

use crate::client::RpcClient;
use crate::error::RpcError;

/// How long [`ClientPool::get`] waits for a slot before giving up (§4.4,
/// §5 concurrency timeouts).
pub const POOL_WAIT_TIMEOUT: Duration = Duration::from_secs(5);

/// Bounded pool of clients connected to a single `addr`.
pub struct ClientPool {
    addr: SocketAddr,
    max_size: usize,
    idle: Mutex<VecDeque<RpcClient>>,
    created: AtomicUsize,
    notify: Notify,
}

impl ClientPool {
    pub fn new(addr: SocketAddr, max_size: usize) -> Arc<Self> {
        Arc::new(Self {
            addr,
            max_size: max_size.max(1),
            idle: Mutex::new(VecDeque::new()),
            created: AtomicUsize::new(0),
            notify: Notify::new(),
        })
    }

    /// Pop an idle client, create a fresh one under `max_size`, or wait up
    /// to [`POOL_WAIT_TIMEOUT`] for one to free up.
    pub async fn get(&self) -> Result<RpcClient, RpcError> {
        let deadline = tokio::time::Instant::now() + POOL_WAIT_TIMEOUT;
        loop {
            if let Some(client) = self.idle.lock().await.pop_front() {
                return Ok(client);
            }
            if self.created.fetch_update(Ordering::AcqRel, Ordering::Acquire, |c| {
                (c < self.max_size).then_some(c + 1)
            }).is_ok() {
                match RpcClient::connect(self.addr).await {
                    Ok(client) => return Ok(client),
                    Err(e) => {
                        self.created.fetch_sub(1, Ordering::AcqRel);
                        return Err(e);
                    }
                }
            }

            let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
            if remaining.is_zero() {
                return Err(RpcError::PoolExhausted);
            }
            let _ = tokio::time::timeout(remaining, self.notify.notified()).await;
        }
    }

    /// Return a client. If the idle queue is already at `max_size` the
    /// client is disconnected and the `created` counter is decremented.
    pub async fn put(&self, client: RpcClient) {
        let mut idle = self.idle.lock().await;
        if idle.len() < self.max_size {
            idle.push_back(client);
            drop(idle);
            self.notify.notify_one();
        } else {
            drop(idle);
            client.disconnect().await;
            self.created.fetch_sub(1, Ordering::AcqRel);
        }
    }

    /// Number of live (idle + checked out) connections.
    pub fn created(&self) -> usize {
        self.created.load(Ordering::Acquire)
    }
}
