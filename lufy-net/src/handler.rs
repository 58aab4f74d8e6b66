//! Pluggable per-frame handler (§1: "pluggable framing handlers").

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;

use crate::connection::Connection;

/// Invoked once per decoded frame. Handler errors are logged by the server
/// and do not close the connection (§4.3 step 3).
#[async_trait]
pub trait FrameHandler: Send + Sync {
    /// Process one payload received on `conn`.
    async fn handle(&self, conn: &Arc<Connection>, payload: Bytes) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;

    /// Called once after a connection closes, for cleanup (e.g. clearing a
    /// presence binding). Default is a no-op.
    async fn on_disconnect(&self, _conn: &Arc<Connection>) {}
}
