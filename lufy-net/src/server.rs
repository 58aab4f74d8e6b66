//! TCP server: accept loop, per-connection frame loop, heartbeat eviction
//! (§4.3).

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use dashmap::DashMap;
use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::connection::{Connection, UNBOUND};
use crate::error::NetError;
use crate::frame::read_frame;
use crate::handler::FrameHandler;

/// Default per-connection read/write deadline (§6 `network.read_timeout` /
/// `network.write_timeout`).
pub const DEFAULT_IO_TIMEOUT: Duration = Duration::from_secs(30);
/// How often the heartbeat sweep runs.
pub const HEARTBEAT_SWEEP_INTERVAL: Duration = Duration::from_secs(30);
/// Connections idle longer than this are evicted by the sweep.
pub const IDLE_EVICTION_THRESHOLD: Duration = Duration::from_secs(60);

/// Tunables for [`TcpServer`].
#[derive(Debug, Clone)]
pub struct TcpServerConfig {
    /// Hard cap on simultaneously accepted connections (§6 `network.max_connections`).
    pub max_connections: usize,
    /// Per-connection read deadline.
    pub read_timeout: Duration,
}

impl Default for TcpServerConfig {
    fn default() -> Self {
        Self {
            max_connections: 10_000,
            read_timeout: DEFAULT_IO_TIMEOUT,
        }
    }
}

/// Accepts framed TCP connections and dispatches each decoded payload to a
/// [`FrameHandler`].
pub struct TcpServer {
    connections: DashMap<u64, Arc<Connection>>,
    next_id: AtomicU64,
    handler: Arc<dyn FrameHandler>,
    config: TcpServerConfig,
    root_cancel: CancellationToken,
}

impl TcpServer {
    /// Build a server around `handler`. Call [`TcpServer::listen`] to start
    /// accepting.
    pub fn new(handler: Arc<dyn FrameHandler>, config: TcpServerConfig) -> Arc<Self> {
        Arc::new(Self {
            connections: DashMap::new(),
            next_id: AtomicU64::new(1),
            handler,
            config,
            root_cancel: CancellationToken::new(),
        })
    }

    /// Bind `addr` and run the accept loop plus heartbeat sweep until
    /// [`TcpServer::shutdown`] is called. Accept errors that occur while
    /// shutting down are suppressed (§4.3 failure semantics).
    pub async fn listen(self: &Arc<Self>, addr: SocketAddr) -> Result<(), NetError> {
        let listener = TcpListener::bind(addr).await.map_err(|e| NetError::BindFailed(addr, e))?;
        tokio::spawn(Self::heartbeat_sweep(Arc::clone(self)));

        loop {
            tokio::select! {
                biased;
                _ = self.root_cancel.cancelled() => return Ok(()),
                accepted = listener.accept() => {
                    match accepted {
                        Ok((socket, peer)) => self.accept(socket, peer),
                        Err(e) => {
                            if self.root_cancel.is_cancelled() {
                                return Ok(());
                            }
                            warn!(error = %e, "tcp accept error");
                        }
                    }
                }
            }
        }
    }

    fn accept(self: &Arc<Self>, socket: TcpStream, peer: SocketAddr) {
        if self.connections.len() >= self.config.max_connections {
            debug!(%peer, "rejecting connection: max_connections reached");
            return;
        }
        let _ = socket.set_nodelay(true);
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (read_half, write_half) = socket.into_split();
        let conn = Arc::new(Connection::new(id, write_half));
        self.connections.insert(id, Arc::clone(&conn));

        let this = Arc::clone(self);
        tokio::spawn(async move {
            this.connection_loop(conn.clone(), read_half).await;
            this.connections.remove(&id);
            this.handler.on_disconnect(&conn).await;
        });
    }

    async fn connection_loop(&self, conn: Arc<Connection>, mut read_half: tokio::net::tcp::OwnedReadHalf) {
        loop {
            let frame = tokio::time::timeout(self.config.read_timeout, read_frame(&mut read_half)).await;
            let payload = match frame {
                Ok(Ok(payload)) => payload,
                Ok(Err(e)) => {
                    debug!(conn_id = conn.id(), error = %e, "closing connection: frame error");
                    break;
                }
                Err(_elapsed) => {
                    debug!(conn_id = conn.id(), "closing connection: read timeout");
                    break;
                }
            };
            conn.touch();

            if let Err(e) = self.handler.handle(&conn, payload).await {
                warn!(conn_id = conn.id(), error = %e, "frame handler error");
            }
        }
        conn.close().await;
    }

    async fn heartbeat_sweep(self: Arc<Self>) {
        let mut ticker = tokio::time::interval(HEARTBEAT_SWEEP_INTERVAL);
        loop {
            tokio::select! {
                biased;
                _ = self.root_cancel.cancelled() => return,
                _ = ticker.tick() => {
                    let now = Utc::now().timestamp_millis();
                    let threshold_ms = IDLE_EVICTION_THRESHOLD.as_millis() as i64;
                    let stale: Vec<u64> = self
                        .connections
                        .iter()
                        .filter(|entry| now - entry.value().last_activity_ms() > threshold_ms)
                        .map(|entry| *entry.key())
                        .collect();
                    for id in stale {
                        if let Some((_, conn)) = self.connections.remove(&id) {
                            debug!(conn_id = id, "heartbeat sweep evicting idle connection");
                            conn.close().await;
                        }
                    }
                }
            }
        }
    }

    /// Look up a connection by id.
    pub fn get_connection(&self, id: u64) -> Option<Arc<Connection>> {
        self.connections.get(&id).map(|e| Arc::clone(e.value()))
    }

    /// O(n) scan over live connections for the one bound to `user_id`.
    /// Acceptable for thousands of connections, not millions (§4.3).
    pub fn get_connection_by_user_id(&self, user_id: u64) -> Option<Arc<Connection>> {
        if user_id == UNBOUND {
            return None;
        }
        self.connections
            .iter()
            .find(|e| e.value().user_id() == user_id)
            .map(|e| Arc::clone(e.value()))
    }

    /// Current number of live connections.
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Best-effort write to every open connection; individual write
    /// failures are logged, not surfaced.
    pub async fn broadcast(&self, payload: &[u8]) {
        let conns: Vec<Arc<Connection>> = self.connections.iter().map(|e| Arc::clone(e.value())).collect();
        for conn in conns {
            if let Err(e) = conn.write(payload).await {
                debug!(conn_id = conn.id(), error = %e, "broadcast write failed");
            }
        }
    }

    /// Write to the connection bound to `user_id`. Fails with
    /// [`NetError::NotConnected`] if no connection is bound to that user.
    pub async fn send_to_user(&self, user_id: u64, payload: &[u8]) -> Result<(), NetError> {
        let conn = self.get_connection_by_user_id(user_id).ok_or(NetError::NotConnected)?;
        conn.write(payload).await
    }

    /// Stop accepting and close every live connection.
    pub async fn shutdown(&self) {
        self.root_cancel.cancel();
        let ids: Vec<u64> = self.connections.iter().map(|e| *e.key()).collect();
        for id in ids {
            if let Some((_, conn)) = self.connections.remove(&id) {
                conn.close().await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bytes::Bytes;
    use std::sync::atomic::AtomicUsize;
    use tokio::io::AsyncWriteExt;
    use tokio::net::TcpStream as ClientStream;

    struct EchoHandler {
        received: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl FrameHandler for EchoHandler {
        async fn handle(&self, conn: &Arc<Connection>, payload: Bytes) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
            self.received.fetch_add(1, Ordering::SeqCst);
            conn.write(&payload).await?;
            Ok(())
        }
    }

    #[tokio::test]
    async fn echoes_frames_and_counts_connections() {
        let received = Arc::new(AtomicUsize::new(0));
        let handler = Arc::new(EchoHandler { received: received.clone() });
        let server = TcpServer::new(handler, TcpServerConfig::default());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let server_clone = Arc::clone(&server);
        let listen_addr = addr;
        tokio::spawn(async move {
            let _ = server_clone.listen(listen_addr).await;
        });
        tokio::time::sleep(Duration::from_millis(50)).await;

        let mut client = ClientStream::connect(addr).await.unwrap();
        crate::frame::write_frame(&mut client, b"hi").await.unwrap();
        let echoed = crate::frame::read_frame(&mut client).await.unwrap();
        assert_eq!(&echoed[..], b"hi");

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(received.load(Ordering::SeqCst), 1);
        assert_eq!(server.connection_count(), 1);

        server.shutdown().await;
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(server.connection_count(), 0);
    }

    #[tokio::test]
    async fn send_to_user_without_binding_fails() {
        let handler = Arc::new(EchoHandler { received: Arc::new(AtomicUsize::new(0)) });
        let server = TcpServer::new(handler, TcpServerConfig::default());
        let err = server.send_to_user(42, b"x").await.unwrap_err();
        assert!(matches!(err, NetError::NotConnected));
    }
}
