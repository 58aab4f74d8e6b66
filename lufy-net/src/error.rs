//! Error taxonomy for the TCP layer (§7: capacity/contract errors are
//! surfaced to the caller, transient I/O is logged and the loop continues).

use thiserror::Error;

/// Errors raised by [`crate::Connection`] and [`crate::TcpServer`] operations.
#[derive(Debug, Error)]
pub enum NetError {
    /// Write attempted after the connection's closed flag was set.
    #[error("connection is closed")]
    Closed,

    /// `SendToUser` found no connection bound to the given user id.
    #[error("no connection bound to user")]
    NotConnected,

    /// Frame length was `0` or exceeded `MAX_FRAME_LEN` (§4.3).
    #[error("invalid frame length: {0}")]
    InvalidFrameLength(u32),

    /// Listener could not bind; this is a fatal-init condition (§7).
    #[error("failed to bind {0}: {1}")]
    BindFailed(std::net::SocketAddr, #[source] std::io::Error),

    /// Underlying socket I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
