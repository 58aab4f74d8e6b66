//! The always-present system RPC service every role exposes alongside its
//! own handlers (§4.7): `GetServerInfo`, `GetServerStats`, `ReloadConfig`,
//! `UpdateLoad`, `Shutdown`, `HotUpdate`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use lufy_rpc::{JsonMethod, ServiceTable};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Name the system service is registered under (`name.method` dispatch,
/// §4.4).
pub const SYSTEM_SERVICE_NAME: &str = "system";

/// Receives `{name, oldData, newData}` when a role's code module or
/// config is hot-swapped. Live-code-swap itself is platform-specific and
/// out of scope (§9); this is the extension point the core promises.
pub trait ReloadHandler: Send + Sync {
    fn on_reload(&self, name: &str, old_data: &[u8], new_data: &[u8]);
}

/// Shared state backing the system service's RPC methods.
pub struct SystemServiceState {
    pub node_id: String,
    pub node_type: String,
    pub server_name: String,
    pub server_version: String,
    pub tcp_connections: AtomicU64,
    pub actor_count: AtomicU64,
    pub rpc_connections: AtomicU64,
    pub load: AtomicU64,
    pub cancel: CancellationToken,
    pub reload_handler: Option<Arc<dyn ReloadHandler>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Empty {}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerInfoReply {
    pub node_id: String,
    pub node_type: String,
    pub name: String,
    pub version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerStatsReply {
    pub tcp_connections: u64,
    pub actor_count: u64,
    pub rpc_connections: u64,
    pub load: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReloadConfigArgs {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub old_data: Vec<u8>,
    #[serde(default)]
    pub new_data: Vec<u8>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateLoadArgs {
    pub load: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ack {
    pub ok: bool,
}

/// Build the `system` service's method table bound to `state`.
pub fn build_service_table(state: Arc<SystemServiceState>) -> ServiceTable {
    let mut table = ServiceTable::new();

    let s = Arc::clone(&state);
    table.register(
        "GetServerInfo",
        Arc::new(JsonMethod::new(move |_args: Empty| {
            let s = Arc::clone(&s);
            async move {
                Ok(ServerInfoReply {
                    node_id: s.node_id.clone(),
                    node_type: s.node_type.clone(),
                    name: s.server_name.clone(),
                    version: s.server_version.clone(),
                })
            }
        })),
    );

    let s = Arc::clone(&state);
    table.register(
        "GetServerStats",
        Arc::new(JsonMethod::new(move |_args: Empty| {
            let s = Arc::clone(&s);
            async move {
                Ok(ServerStatsReply {
                    tcp_connections: s.tcp_connections.load(Ordering::Relaxed),
                    actor_count: s.actor_count.load(Ordering::Relaxed),
                    rpc_connections: s.rpc_connections.load(Ordering::Relaxed),
                    load: s.load.load(Ordering::Relaxed),
                })
            }
        })),
    );

    let s = Arc::clone(&state);
    table.register(
        "ReloadConfig",
        Arc::new(JsonMethod::new(move |args: ReloadConfigArgs| {
            let s = Arc::clone(&s);
            async move {
                if let Some(handler) = &s.reload_handler {
                    handler.on_reload(&args.name, &args.old_data, &args.new_data);
                }
                info!(name = %args.name, "reload_config applied");
                Ok(Ack { ok: true })
            }
        })),
    );

    let s = Arc::clone(&state);
    table.register(
        "UpdateLoad",
        Arc::new(JsonMethod::new(move |args: UpdateLoadArgs| {
            let s = Arc::clone(&s);
            async move {
                s.load.store(args.load, Ordering::Relaxed);
                Ok(Ack { ok: true })
            }
        })),
    );

    let s = Arc::clone(&state);
    table.register(
        "Shutdown",
        Arc::new(JsonMethod::new(move |_args: Empty| {
            let s = Arc::clone(&s);
            async move {
                info!("shutdown requested via system rpc");
                s.cancel.cancel();
                Ok(Ack { ok: true })
            }
        })),
    );

    let s = Arc::clone(&state);
    table.register(
        "HotUpdate",
        Arc::new(JsonMethod::new(move |args: ReloadConfigArgs| {
            let s = Arc::clone(&s);
            async move {
                if let Some(handler) = &s.reload_handler {
                    handler.on_reload(&args.name, &args.old_data, &args.new_data);
                }
                Ok(Ack { ok: true })
            }
        })),
    );

    table
}
