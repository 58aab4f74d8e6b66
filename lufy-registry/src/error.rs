//! Registry error taxonomy (§7).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegistryError {
    /// A write to the backing store failed; surfaced to the caller (§7).
    #[error("registry write failed: {0}")]
    WriteFailed(String),

    /// A watch stream failed to establish or was dropped; the watch loop
    /// logs this and continues, relying on the periodic refresh (§4.5).
    #[error("registry watch failed: {0}")]
    WatchFailed(String),

    /// `Grant`/`KeepAlive` referenced a lease the store no longer knows
    /// about.
    #[error("unknown lease")]
    UnknownLease,

    /// Store unreachable at startup; fatal-init per §7.
    #[error("registry unreachable: {0}")]
    Unreachable(String),
}
