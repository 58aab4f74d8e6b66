//! Per-connection state (§3 Connection, §4.3).

use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering};

use chrono::Utc;
use tokio::io::AsyncWriteExt;
use tokio::net::tcp::OwnedWriteHalf;
use tokio::sync::Mutex;

use crate::error::NetError;
use crate::frame::write_frame;

/// `0` means the connection has no user bound yet.
pub const UNBOUND: u64 = 0;

/// One accepted TCP socket plus the bookkeeping the server needs: a stable
/// id, the user it's bound to (if any), a session id, and a last-activity
/// clock used by the heartbeat sweep.
///
/// Close is idempotent: the `closed` flag is a single-shot CAS, so any
/// task may call [`Connection::close`] safely and concurrently (§3
/// invariant).
pub struct Connection {
    id: u64,
    user_id: AtomicU64,
    session_id: std::sync::RwLock<Option<String>>,
    last_activity_ms: AtomicI64,
    closed: AtomicBool,
    writer: Mutex<OwnedWriteHalf>,
}

impl Connection {
    pub(crate) fn new(id: u64, writer: OwnedWriteHalf) -> Self {
        Self {
            id,
            user_id: AtomicU64::new(UNBOUND),
            session_id: std::sync::RwLock::new(None),
            last_activity_ms: AtomicI64::new(Utc::now().timestamp_millis()),
            closed: AtomicBool::new(false),
            writer: Mutex::new(writer),
        }
    }

    /// Monotonically increasing connection id assigned at accept time.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Currently bound user id, or [`UNBOUND`].
    pub fn user_id(&self) -> u64 {
        self.user_id.load(Ordering::Acquire)
    }

    /// Bind this connection to a user (e.g. after login).
    pub fn bind_user(&self, user_id: u64) {
        self.user_id.store(user_id, Ordering::Release);
    }

    /// Current session id, if any.
    pub fn session_id(&self) -> Option<String> {
        self.session_id.read().ok().and_then(|g| g.clone())
    }

    /// Attach a session id to this connection.
    pub fn set_session_id(&self, session_id: impl Into<String>) {
        if let Ok(mut guard) = self.session_id.write() {
            *guard = Some(session_id.into());
        }
    }

    /// Epoch-millisecond timestamp of the last successful read or write.
    pub fn last_activity_ms(&self) -> i64 {
        self.last_activity_ms.load(Ordering::Acquire)
    }

    /// Record activity now; called on every successful read and write.
    pub fn touch(&self) {
        self.last_activity_ms.store(Utc::now().timestamp_millis(), Ordering::Release);
    }

    /// Whether this connection has been closed.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Mark the connection closed. Returns `true` the first time it is
    /// called on this connection, `false` on every call after.
    pub async fn close(&self) -> bool {
        let first = self
            .closed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();
        if first {
            let mut w = self.writer.lock().await;
            let _ = w.shutdown().await;
        }
        first
    }

    /// Write one length-prefixed frame. Fails with [`NetError::Closed`] if
    /// the connection has already been closed.
    pub async fn write(&self, payload: &[u8]) -> Result<(), NetError> {
        if self.is_closed() {
            return Err(NetError::Closed);
        }
        let mut w = self.writer.lock().await;
        write_frame(&mut *w, payload).await?;
        drop(w);
        self.touch();
        Ok(())
    }
}

// Connection requires a live TCP OwnedWriteHalf to construct; its
// idempotent-close and write-after-close invariants are exercised
// end-to-end by the tests in server.rs.
