//! RPC server: reuses the shared framed transport, dispatches JSON request
//! envelopes through a typed [`ServiceTable`] per service (§4.4).

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;
use lufy_net::{Connection, FrameHandler};
use tracing::warn;

use crate::dispatch::ServiceTable;
use crate::envelope::{RequestEnvelope, ResponseEnvelope};
use crate::error::RpcError;

/// Owns every registered service's dispatch table and answers frames
/// decoded by the shared [`lufy_net::TcpServer`].
#[derive(Default)]
pub struct RpcServer {
    services: DashMap<String, ServiceTable>,
}

impl RpcServer {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Register a service's method table under `name`. Fails if `name` is
    /// already registered (§7 State errors).
    pub fn register_service(&self, name: impl Into<String>, table: ServiceTable) -> Result<(), RpcError> {
        let name = name.into();
        if self.services.contains_key(&name) {
            return Err(RpcError::ServiceAlreadyRegistered(name));
        }
        self.services.insert(name, table);
        Ok(())
    }
}

#[async_trait]
impl FrameHandler for RpcServer {
    async fn handle(&self, conn: &Arc<Connection>, payload: Bytes) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let request: RequestEnvelope = match serde_json::from_slice(&payload) {
            Ok(r) => r,
            Err(e) => {
                // No request id to correlate a reply to; close is not our
                // call here (frame was structurally valid), log and drop.
                warn!(error = %e, "rpc request envelope decode failure");
                return Ok(());
            }
        };

        let response = match self.services.get(&request.service) {
            None => ResponseEnvelope::err(request.id, format!("unknown service: {}", request.service)),
            Some(table) => match table.get(&request.method) {
                None => ResponseEnvelope::err(request.id, format!("unknown method: {}.{}", request.service, request.method)),
                Some(handler) => match handler.invoke(request.args).await {
                    Ok(data) => ResponseEnvelope::ok(request.id, data),
                    Err(message) => ResponseEnvelope::err(request.id, message),
                },
            },
        };

        let encoded = serde_json::to_vec(&response).map_err(|e| RpcError::Codec(e.to_string()))?;
        conn.write(&encoded).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::JsonMethod;

    #[tokio::test]
    async fn unregistered_service_is_absent() {
        let server = RpcServer::new();
        let mut table = ServiceTable::new();
        table.register("Ping", Arc::new(JsonMethod::new(|_: ()| async { Ok::<_, String>(()) })));
        server.register_service("Echo", table).unwrap();

        assert!(server.services.get("Missing").is_none());
        assert!(server.services.get("Echo").unwrap().get("Ping").is_some());
    }

    #[test]
    fn duplicate_registration_fails() {
        let server = RpcServer::new();
        server.register_service("Echo", ServiceTable::new()).unwrap();
        let err = server.register_service("Echo", ServiceTable::new()).unwrap_err();
        assert!(matches!(err, RpcError::ServiceAlreadyRegistered(_)));
    }
}
