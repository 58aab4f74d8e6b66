//! Node runtime: boots C1→C6 in dependency order, registers the system
//! service, reports load, and owns the shutdown sequence (§4.7).

use std::net::SocketAddr;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use lufy_actor::ActorSystem;
use lufy_broker::{BrokerOptions, ConsumerHandler, Mode, Substrate, SystemCommand, SystemMessage, TopicBroker, SYSTEM_MESSAGES_TOPIC};
use lufy_net::{FrameHandler, TcpServer, TcpServerConfig};
use lufy_pool::BufferPool;
use lufy_registry::{service_key, DiscoveryCache, Registration, RegistryStore, ServiceInfo};
use lufy_rpc::RpcServer;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::NodeConfig;
use crate::error::NodeError;
use crate::system_service::{build_service_table, ReloadHandler, SystemServiceState, SYSTEM_SERVICE_NAME};

/// How often the load-report task recomputes and republishes load (§4.7).
pub const LOAD_REPORT_INTERVAL: Duration = Duration::from_secs(30);

/// Forwards role-specific system commands the core doesn't interpret
/// itself (`kick_user`, `broadcast_notice`); `reload_config`/`hot_update`
/// go through [`ReloadHandler`] instead, and `shutdown`/`update_load` are
/// handled by the node runtime directly.
#[async_trait]
pub trait SystemCommandHandler: Send + Sync {
    async fn on_command(&self, command: &SystemCommand, args: &serde_json::Value);
}

/// Everything a running node owns. Built in two phases: [`NodeRuntime::build`]
/// constructs every component without starting I/O, so role code can
/// register RPC services and actors; [`NodeRuntime::run`] then starts the
/// listeners and background tasks and blocks until shutdown.
pub struct NodeRuntime {
    config: NodeConfig,
    pools: Arc<BufferPool>,
    actor_system: Arc<ActorSystem>,
    tcp_server: Arc<TcpServer>,
    rpc_tcp_server: Arc<TcpServer>,
    rpc_server: Arc<RpcServer>,
    registry: Arc<dyn RegistryStore>,
    registration: Arc<Registration>,
    discovery: Arc<DiscoveryCache>,
    broker: Arc<TopicBroker>,
    cancel: CancellationToken,
    state: Arc<SystemServiceState>,
    command_handler: Option<Arc<dyn SystemCommandHandler>>,
    background: tokio::sync::Mutex<Vec<tokio::task::JoinHandle<()>>>,
}

struct SystemMessageRelay {
    node_id: String,
    state: Arc<SystemServiceState>,
    command_handler: Option<Arc<dyn SystemCommandHandler>>,
}

#[async_trait]
impl ConsumerHandler for SystemMessageRelay {
    async fn on_message(&self, _topic: &str, payload: Bytes) {
        let message: SystemMessage = match serde_json::from_slice(&payload) {
            Ok(m) => m,
            Err(e) => {
                warn!(error = %e, "failed to decode system message");
                return;
            }
        };
        if !message.addressed_to(&self.node_id) {
            return;
        }
        match message.command {
            SystemCommand::Shutdown => {
                info!("shutdown requested via system_messages");
                self.state.cancel.cancel();
            }
            SystemCommand::UpdateLoad => {
                if let Some(load) = message.args.get("load").and_then(|v| v.as_u64()) {
                    self.state.load.store(load, Ordering::Relaxed);
                }
            }
            SystemCommand::ReloadConfig | SystemCommand::HotUpdate => {
                if let Some(handler) = &self.state.reload_handler {
                    let name = message.args.get("name").and_then(|v| v.as_str()).unwrap_or_default();
                    handler.on_reload(name, &[], &[]);
                }
            }
            ref other => {
                if let Some(handler) = &self.command_handler {
                    handler.on_command(other, &message.args).await;
                }
            }
        }
    }
}

impl NodeRuntime {
    /// Construct every component without starting any I/O. `client_handler`
    /// answers frames on the client-facing TCP port; role code should
    /// register its own RPC services on [`NodeRuntime::rpc_server`] and
    /// actors on [`NodeRuntime::actor_system`] before calling
    /// [`NodeRuntime::run`].
    pub async fn build(
        config: NodeConfig,
        client_handler: Arc<dyn FrameHandler>,
        registry: Arc<dyn RegistryStore>,
        substrate: Arc<dyn Substrate>,
        reload_handler: Option<Arc<dyn ReloadHandler>>,
        command_handler: Option<Arc<dyn SystemCommandHandler>>,
    ) -> Result<Arc<Self>, NodeError> {
        let pools = Arc::new(BufferPool::new(config.object_pool.max_per_class));
        let actor_system = ActorSystem::new();

        let tcp_server = TcpServer::new(
            client_handler,
            TcpServerConfig { max_connections: config.network.max_connections, read_timeout: config.network.read_timeout() },
        );

        let rpc_server = RpcServer::new();
        let rpc_tcp_server = TcpServer::new(
            Arc::clone(&rpc_server) as Arc<dyn FrameHandler>,
            TcpServerConfig { max_connections: config.network.max_connections, read_timeout: config.network.read_timeout() },
        );

        let registration = Registration::start(Arc::clone(&registry)).await?;
        let discovery = DiscoveryCache::new(Arc::clone(&registry), config.registry.prefix.clone());
        discovery.spawn_periodic_refresh();

        let broker_mode = if config.broker.cluster_mode { Mode::Cluster } else { Mode::Single };
        let broker = TopicBroker::new(
            substrate,
            config.broker.endpoints.clone(),
            config.broker.lookup_endpoints.clone(),
            BrokerOptions { mode: broker_mode, load_balancing: config.broker.load_balancing, failover: config.broker.failover },
        )
        .await?;

        let cancel = CancellationToken::new();
        let state = Arc::new(SystemServiceState {
            node_id: config.node_id.clone(),
            node_type: config.node_type.clone(),
            server_name: config.server.name.clone(),
            server_version: config.server.version.clone(),
            tcp_connections: Default::default(),
            actor_count: Default::default(),
            rpc_connections: Default::default(),
            load: Default::default(),
            cancel: cancel.clone(),
            reload_handler,
        });

        rpc_server.register_service(SYSTEM_SERVICE_NAME, build_service_table(Arc::clone(&state)))?;

        broker
            .subscribe(
                SYSTEM_MESSAGES_TOPIC,
                &config.node_id,
                Arc::new(SystemMessageRelay { node_id: config.node_id.clone(), state: Arc::clone(&state), command_handler: command_handler.clone() }),
            )
            .await?;

        Ok(Arc::new(Self {
            config,
            pools,
            actor_system,
            tcp_server,
            rpc_tcp_server,
            rpc_server,
            registry,
            registration,
            discovery,
            broker,
            cancel,
            state,
            command_handler,
            background: tokio::sync::Mutex::new(Vec::new()),
        }))
    }

    pub fn actor_system(&self) -> &Arc<ActorSystem> {
        &self.actor_system
    }

    pub fn rpc_server(&self) -> &Arc<RpcServer> {
        &self.rpc_server
    }

    pub fn pools(&self) -> &Arc<BufferPool> {
        &self.pools
    }

    pub fn discovery(&self) -> &Arc<DiscoveryCache> {
        &self.discovery
    }

    pub fn broker(&self) -> &Arc<TopicBroker> {
        &self.broker
    }

    /// Trigger the same shutdown sequence the `Shutdown` RPC method and
    /// OS signal handler do.
    pub fn trigger_shutdown(&self) {
        self.cancel.cancel();
    }

    /// Register this node (`status=online`, `load=0`), start the
    /// listeners and background tasks, install the OS signal handler, and
    /// block until a shutdown is triggered (by signal, the `Shutdown` RPC
    /// method, or a `shutdown` system message), then run the shutdown
    /// sequence.
    pub async fn run(self: &Arc<Self>) -> Result<(), NodeError> {
        let key = service_key(&self.config.registry.prefix, &self.config.node_type, &self.config.node_id);
        let info = ServiceInfo::new(
            self.config.node_id.clone(),
            self.config.node_type.clone(),
            self.local_address(),
            self.config.network.rpc_port,
        );
        let info_json = serde_json::to_string(&info).map_err(|e| NodeError::Config(e.to_string()))?;
        self.registration.publish(key.clone(), info_json).await?;

        {
            let mut background = self.background.lock().await;
            background.push(self.spawn_load_report(key));
            background.push(self.spawn_signal_handler());
        }

        let tcp_addr: SocketAddr = format!("0.0.0.0:{}", self.config.network.tcp_port).parse().map_err(|_| NodeError::Config("invalid tcp_port".into()))?;
        let rpc_addr: SocketAddr = format!("0.0.0.0:{}", self.config.network.rpc_port).parse().map_err(|_| NodeError::Config("invalid rpc_port".into()))?;

        let tcp = Arc::clone(&self.tcp_server);
        let rpc_tcp = Arc::clone(&self.rpc_tcp_server);
        let tcp_task = tokio::spawn(async move { let _ = tcp.listen(tcp_addr).await; });
        let rpc_task = tokio::spawn(async move { let _ = rpc_tcp.listen(rpc_addr).await; });

        self.cancel.cancelled().await;
        self.shutdown().await;
        let _ = tcp_task.await;
        let _ = rpc_task.await;
        Ok(())
    }

    fn local_address(&self) -> String {
        "0.0.0.0".to_string()
    }

    fn spawn_load_report(self: &Arc<Self>, key: String) -> tokio::task::JoinHandle<()> {
        let this = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(LOAD_REPORT_INTERVAL);
            loop {
                tokio::select! {
                    biased;
                    _ = this.cancel.cancelled() => return,
                    _ = ticker.tick() => {
                        let tcp_connections = this.tcp_server.connection_count() as u64;
                        let rpc_connections = this.rpc_tcp_server.connection_count() as u64;
                        let actor_count = this.actor_system.actor_count() as u64;
                        this.state.tcp_connections.store(tcp_connections, Ordering::Relaxed);
                        this.state.rpc_connections.store(rpc_connections, Ordering::Relaxed);
                        this.state.actor_count.store(actor_count, Ordering::Relaxed);
                        let load = tcp_connections + actor_count + rpc_connections;
                        this.state.load.store(load, Ordering::Relaxed);

                        let mut info = ServiceInfo::new(this.config.node_id.clone(), this.config.node_type.clone(), this.local_address(), this.config.network.rpc_port);
                        info.load = load;
                        if let Ok(json) = serde_json::to_string(&info) {
                            if let Err(e) = this.registration.publish(key.clone(), json).await {
                                warn!(error = %e, "load report publish failed");
                            }
                        }
                    }
                }
            }
        })
    }

    fn spawn_signal_handler(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let this = Arc::clone(self);
        tokio::spawn(async move {
            #[cfg(unix)]
            {
                let mut sigterm = match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                    Ok(s) => s,
                    Err(e) => {
                        warn!(error = %e, "failed to install SIGTERM handler");
                        return;
                    }
                };
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = sigterm.recv() => {}
                    _ = this.cancel.cancelled() => return,
                }
            }
            #[cfg(not(unix))]
            {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = this.cancel.cancelled() => return,
                }
            }
            info!("shutdown signal received");
            this.cancel.cancel();
        })
    }

    /// Stop TCP accept → stop RPC accept → drain/stop actors → close
    /// broker (consumers then producers) → unregister + revoke lease →
    /// await all tasks (§4.7).
    async fn shutdown(&self) {
        info!("node shutdown: stopping tcp accept");
        self.tcp_server.shutdown().await;
        info!("node shutdown: stopping rpc accept");
        self.rpc_tcp_server.shutdown().await;
        info!("node shutdown: draining actors");
        self.actor_system.shutdown().await;
        info!("node shutdown: closing broker");
        self.broker.close().await;
        info!("node shutdown: revoking lease");
        self.registration.shutdown().await;
        self.discovery.shutdown();

        let mut background = self.background.lock().await;
        for task in background.drain(..) {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use lufy_broker::InMemorySubstrate;
    use lufy_net::Connection;
    use lufy_registry::InMemoryRegistry;

    struct NoopHandler;

    #[async_trait]
    impl FrameHandler for NoopHandler {
        async fn handle(&self, _conn: &Arc<Connection>, _payload: Bytes) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
            Ok(())
        }
    }

    fn test_config(node_id: &str, tcp_port: u16, rpc_port: u16) -> NodeConfig {
        NodeConfig {
            node_id: node_id.to_string(),
            node_type: "gateway".to_string(),
            server: crate::config::ServerConfig { name: "gateway".to_string(), version: "0.1.0".to_string(), debug: false },
            network: crate::config::NetworkConfig {
                tcp_port,
                rpc_port,
                http_port: None,
                max_connections: 100,
                read_timeout_secs: 30,
                write_timeout_secs: 30,
            },
            registry: crate::config::RegistryConfig::default(),
            broker: crate::config::BrokerConfig::default(),
            object_pool: crate::config::ObjectPoolConfig::default(),
            rpc: crate::config::RpcConfig::default(),
        }
    }

    #[tokio::test]
    async fn build_registers_system_service_and_publishes() {
        let config = test_config("gateway-1", 18101, 18102);
        let registry = InMemoryRegistry::new();
        let substrate = InMemorySubstrate::new();

        let runtime = NodeRuntime::build(config, Arc::new(NoopHandler), registry.clone(), substrate, None, None).await.unwrap();

        let run_handle = {
            let runtime = Arc::clone(&runtime);
            tokio::spawn(async move {
                let _ = runtime.run().await;
            })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;

        let entries = registry.get("/lufy/services/gateway/").await.unwrap();
        assert_eq!(entries.len(), 1);

        runtime.trigger_shutdown();
        let _ = tokio::time::timeout(Duration::from_secs(2), run_handle).await;
    }
}
