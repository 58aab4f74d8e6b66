//! Typed channels the node runtime publishes/subscribes on top of the
//! generic [`crate::TopicBroker`] (§3, §4.6, §6).

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Game lifecycle events; channel = nodeId.
pub const GAME_EVENTS_TOPIC: &str = "game_events";
/// Chat traffic; channel = nodeId.
pub const CHAT_MESSAGES_TOPIC: &str = "chat_messages";
/// Control commands; channel = nodeId. Empty `target` means broadcast.
pub const SYSTEM_MESSAGES_TOPIC: &str = "system_messages";

/// A control command carried on [`SYSTEM_MESSAGES_TOPIC`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemMessage {
    #[serde(rename = "type")]
    pub message_type: String,
    /// Empty means broadcast to every node; otherwise delivered only if
    /// `target == self.node_id` (§4.6).
    #[serde(default)]
    pub target: String,
    pub command: SystemCommand,
    #[serde(default)]
    pub args: serde_json::Value,
    pub timestamp: i64,
}

impl SystemMessage {
    pub fn new(command: SystemCommand, target: impl Into<String>, args: serde_json::Value) -> Self {
        Self {
            message_type: "system".to_string(),
            target: target.into(),
            command,
            args,
            timestamp: Utc::now().timestamp(),
        }
    }

    /// Whether a node with id `self_node_id` should act on this message.
    pub fn addressed_to(&self, self_node_id: &str) -> bool {
        self.target.is_empty() || self.target == self_node_id
    }
}

/// Recognised system commands (§4.6). Unknown commands decode into
/// [`SystemCommand::Unknown`] rather than failing, so forward-compatible
/// senders don't break older subscribers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SystemCommand {
    ReloadConfig,
    UpdateLoad,
    Shutdown,
    HotUpdate,
    KickUser,
    BroadcastNotice,
    #[serde(other)]
    Unknown,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn broadcast_target_reaches_everyone() {
        let msg = SystemMessage::new(SystemCommand::Shutdown, "", serde_json::json!({}));
        assert!(msg.addressed_to("n1"));
        assert!(msg.addressed_to("n2"));
    }

    #[test]
    fn targeted_message_reaches_only_its_node() {
        let msg = SystemMessage::new(SystemCommand::KickUser, "n2", serde_json::json!({"userId": 7}));
        assert!(!msg.addressed_to("n1"));
        assert!(msg.addressed_to("n2"));
    }
}
