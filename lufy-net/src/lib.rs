//! # lufy-net
//!
//! Length-prefixed TCP transport shared by every gateway-facing role and
//! by `lufy-rpc`'s node-to-node connections.
//!
//! A [`TcpServer`] accepts sockets, wraps each one in a [`Connection`], and
//! drives a per-connection frame loop that hands decoded payloads to a
//! [`FrameHandler`]. A background sweep evicts connections that have gone
//! quiet for longer than [`server::IDLE_EVICTION_THRESHOLD`].

mod connection;
mod error;
mod frame;
mod handler;
mod server;

pub use connection::{Connection, UNBOUND};
pub use error::NetError;
pub use frame::{read_frame, write_frame, MAX_FRAME_LEN};
pub use handler::FrameHandler;
pub use server::{TcpServer, TcpServerConfig, DEFAULT_IO_TIMEOUT, HEARTBEAT_SWEEP_INTERVAL, IDLE_EVICTION_THRESHOLD};
