//! RPC client: one socket, a response-reader task, and per-request
//! correlation by envelope id (§4.4).

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use lufy_net::{read_frame, write_frame};
use tokio::net::TcpStream;
use tokio::net::tcp::OwnedWriteHalf;
use tokio::sync::{oneshot, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::envelope::{RequestEnvelope, ResponseEnvelope};
use crate::error::RpcError;

type Pending = Arc<DashMap<u64, oneshot::Sender<ResponseEnvelope>>>;

/// Fail every outstanding correlation entry with a disconnect error and
/// remove it, so no entry survives a dropped connection (§8 invariant).
fn drain_pending(pending: &Pending) {
    let ids: Vec<u64> = pending.iter().map(|e| *e.key()).collect();
    for id in ids {
        if let Some((_, tx)) = pending.remove(&id) {
            let _ = tx.send(ResponseEnvelope::err(0, "disconnected"));
        }
    }
}

/// A single RPC connection to a peer node.
pub struct RpcClient {
    write_half: Mutex<OwnedWriteHalf>,
    pending: Pending,
    next_id: AtomicU64,
    cancel: CancellationToken,
    reader: tokio::task::JoinHandle<()>,
}

impl RpcClient {
    /// Open a socket to `addr` and start the response-reader task.
    pub async fn connect(addr: SocketAddr) -> Result<Self, RpcError> {
        let socket = TcpStream::connect(addr).await.map_err(lufy_net::NetError::from)?;
        let _ = socket.set_nodelay(true);
        let (mut read_half, write_half) = socket.into_split();

        let pending: Pending = Arc::new(DashMap::new());
        let cancel = CancellationToken::new();
        let reader_pending = Arc::clone(&pending);
        let reader_cancel = cancel.child_token();

        let reader = tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    _ = reader_cancel.cancelled() => break,
                    frame = read_frame(&mut read_half) => {
                        match frame {
                            Ok(bytes) => match serde_json::from_slice::<ResponseEnvelope>(&bytes) {
                                Ok(response) => {
                                    if let Some((_, tx)) = reader_pending.remove(&response.id) {
                                        let _ = tx.send(response);
                                    }
                                }
                                Err(e) => warn!(error = %e, "rpc response decode failure"),
                            },
                            Err(e) => {
                                warn!(error = %e, "rpc client read error, disconnecting");
                                break;
                            }
                        }
                    }
                }
            }
            drain_pending(&reader_pending);
        });

        Ok(Self {
            write_half: Mutex::new(write_half),
            pending,
            next_id: AtomicU64::new(1),
            cancel,
            reader,
        })
    }

    /// Call `service.method` with `args`, waiting up to `timeout` for a
    /// response. Whichever of response-or-timeout fires first wins; the
    /// loser's correlation entry is cleaned up immediately (§4.4).
    pub async fn call(&self, service: &str, method: &str, args: Vec<u8>, timeout: Duration) -> Result<Vec<u8>, RpcError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();
        self.pending.insert(id, tx);

        let request = RequestEnvelope {
            id,
            service: service.to_string(),
            method: method.to_string(),
            args,
            timeout_ms: timeout.as_millis() as u64,
        };
        let encoded = serde_json::to_vec(&request).map_err(|e| RpcError::Codec(e.to_string()))?;

        {
            let mut w = self.write_half.lock().await;
            if let Err(e) = write_frame(&mut *w, &encoded).await {
                self.pending.remove(&id);
                return Err(e.into());
            }
        }

        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(response)) if response.is_ok() => Ok(response.data),
            Ok(Ok(response)) => Err(RpcError::Remote(response.error)),
            Ok(Err(_recv_error)) => Err(RpcError::Disconnected),
            Err(_elapsed) => {
                self.pending.remove(&id);
                Err(RpcError::Timeout)
            }
        }
    }

    /// Stop the reader task, close the socket, and fail every outstanding
    /// call with [`RpcError::Disconnected`].
    pub async fn disconnect(self) {
        self.cancel.cancel();
        let _ = self.reader.await;
        drain_pending(&self.pending);
        let mut w = self.write_half.lock().await;
        use tokio::io::AsyncWriteExt;
        let _ = w.shutdown().await;
    }
}
