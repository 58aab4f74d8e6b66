//! Typed dispatch table (§9 Design Notes: "Prefer a typed dispatch table
//! ... reflection becomes an optional convenience layer over this table").
//! Rather than reflecting over argument types at call time, each method is
//! registered as a closure pair that already knows how to decode its
//! arguments and encode its reply.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

/// One RPC method: decode args, run the handler, encode the reply. Errors
/// are returned as a display string, matching `response.error` (§4.4).
#[async_trait]
pub trait MethodHandler: Send + Sync {
    async fn invoke(&self, args: Vec<u8>) -> Result<Vec<u8>, String>;
}

/// Adapts an `async fn(Args) -> Result<Reply, String>` closure, decoding
/// `Args` from JSON and encoding `Reply` back to JSON, into a
/// [`MethodHandler`]. This is the convenience layer the design notes
/// describe; a handler that needs a different codec can implement
/// [`MethodHandler`] directly.
pub struct JsonMethod<F> {
    func: F,
}

impl<F> JsonMethod<F> {
    pub fn new(func: F) -> Self {
        Self { func }
    }
}

#[async_trait]
impl<F, Fut, Args, Reply> MethodHandler for JsonMethod<F>
where
    F: Fn(Args) -> Fut + Send + Sync,
    Fut: std::future::Future<Output = Result<Reply, String>> + Send,
    Args: for<'de> serde::Deserialize<'de> + Send,
    Reply: serde::Serialize + Send,
{
    async fn invoke(&self, args: Vec<u8>) -> Result<Vec<u8>, String> {
        let decoded: Args = serde_json::from_slice(&args).map_err(|e| format!("argument decode error: {e}"))?;
        let reply = (self.func)(decoded).await?;
        serde_json::to_vec(&reply).map_err(|e| format!("reply encode error: {e}"))
    }
}

/// Methods registered under a single service name.
#[derive(Default)]
pub struct ServiceTable {
    methods: HashMap<String, Arc<dyn MethodHandler>>,
}

impl ServiceTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a method. Overwrites a prior registration under the same
    /// name — callers register each method exactly once at startup.
    pub fn register(&mut self, method: impl Into<String>, handler: Arc<dyn MethodHandler>) {
        self.methods.insert(method.into(), handler);
    }

    pub fn get(&self, method: &str) -> Option<Arc<dyn MethodHandler>> {
        self.methods.get(method).cloned()
    }
}
