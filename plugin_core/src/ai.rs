use std::sync::Arc;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ConversationRole {
    #[default]
    User,
    System,
}

/// Chunk kind of an LLM stream callback invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ChatStreamDataType {
    #[default]
    Streaming,
    Finished,
    Error,
}

impl ChatStreamDataType {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "streaming" => Some(ChatStreamDataType::Streaming),
            "finished" => Some(ChatStreamDataType::Finished),
            "error" => Some(ChatStreamDataType::Error),
            _ => None,
        }
    }
}

/// Stream callback: chunk kind, text delta and optional model reasoning.
/// Streams are fire-and-forward, so the callback is synchronous.
pub type ChatStreamFunc = Arc<dyn Fn(ChatStreamDataType, String, String) + Send + Sync>;

/// One turn of an LLM conversation passed to `LLMStream`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Conversation {
    #[serde(rename = "Role", default)]
    pub role: ConversationRole,
    #[serde(rename = "Text", default)]
    pub text: String,
    #[serde(rename = "Timestamp", default)]
    pub timestamp: i64,
}
