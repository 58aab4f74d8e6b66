//! Wire envelopes (§3, §6): JSON bodies inside the shared length-prefixed
//! frame.

use serde::{Deserialize, Serialize};

/// `{id, service, method, args, timeoutMs}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestEnvelope {
    pub id: u64,
    pub service: String,
    pub method: String,
    pub args: Vec<u8>,
    #[serde(rename = "timeoutMs")]
    pub timeout_ms: u64,
}

/// `{id, error, data}`. `error` is empty on success.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    pub id: u64,
    #[serde(default)]
    pub error: String,
    #[serde(default)]
    pub data: Vec<u8>,
}

impl ResponseEnvelope {
    pub fn ok(id: u64, data: Vec<u8>) -> Self {
        Self { id, error: String::new(), data }
    }

    pub fn err(id: u64, message: impl Into<String>) -> Self {
        Self { id, error: message.into(), data: Vec::new() }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_empty()
    }
}
