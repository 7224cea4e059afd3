use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Snapshot returned by `GET /status`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct StatusReport {
    #[serde(default)]
    pub mode: String,
    /// Slot number (as a JSON object key) to 0/1 occupancy.
    #[serde(default)]
    pub inventory: BTreeMap<String, Value>,
    #[serde(default)]
    pub system_msg: Option<String>,
    /// Optional structured severity for `system_msg`; text markers are used when absent.
    #[serde(default)]
    pub severity: Option<String>,
}

impl StatusReport {
    /// Whether the 1-based `slot` is reported occupied. Missing slots count as free.
    pub fn is_occupied(&self, slot: usize) -> bool {
        match self.inventory.get(&slot.to_string()) {
            Some(Value::Number(n)) => n.as_u64() == Some(1),
            Some(Value::Bool(flag)) => *flag,
            _ => false,
        }
    }
}

#[derive(Debug, Serialize)]
pub(super) struct ChatRequest<'a> {
    pub(super) message: &'a str,
}

/// Non-streamed chat body.
#[derive(Debug, Deserialize)]
pub(super) struct ChatReply {
    #[serde(default)]
    pub(super) reply: String,
}

/// Actions accepted by `POST /command`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CommandAction {
    Start,
    Stop,
}

impl CommandAction {
    pub fn label(self) -> &'static str {
        match self {
            CommandAction::Start => "start",
            CommandAction::Stop => "stop",
        }
    }
}

#[derive(Debug, Serialize)]
pub(super) struct CommandRequest {
    pub(super) action: CommandAction,
}

/// AI provider settings stored by the backend (`/api/settings`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PanelSettings {
    #[serde(default)]
    pub provider: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub base_url: String,
    #[serde(default)]
    pub model_name: String,
    #[serde(default)]
    pub system_prompt: String,
}

#[derive(Debug, Default, Deserialize)]
pub(super) struct SaveSettingsResponse {
    #[serde(default)]
    pub(super) status: String,
    #[serde(default)]
    pub(super) msg: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(super) struct LogsResponse {
    #[serde(default)]
    pub(super) logs: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(super) struct ChatHistoryResponse {
    #[serde(default)]
    pub(super) history: Vec<ChatHistoryEntry>,
}

/// One persisted exchange from `/api/chat_history`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ChatHistoryEntry {
    #[serde(default)]
    pub sender: String,
    #[serde(default)]
    pub message: String,
    /// `user`, `ai` or `system`.
    #[serde(default, rename = "type")]
    pub kind: String,
    /// `%Y-%m-%d %H:%M:%S` in backend local time.
    #[serde(default)]
    pub timestamp: String,
}
