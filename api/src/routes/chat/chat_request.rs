use ai_llm_service::{ChatMessage, ChatRole};
use serde::Deserialize;
use serde_json::Value;

/// Request payload for POST /api/chat.
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    /// Conversation so far; the last message is the one to answer.
    pub messages: Vec<IncomingMessage>,
}

/// A message as sent by chat clients. `content` may be a string, an array of
/// content parts, or missing.
#[derive(Debug, Deserialize)]
pub struct IncomingMessage {
    pub role: ChatRole,
    #[serde(default)]
    pub content: Value,
}

impl ChatRequest {
    pub fn into_messages(self) -> Vec<ChatMessage> {
        self.messages
            .into_iter()
            .map(|m| ChatMessage {
                role: m.role,
                content: coerce_content(&m.content),
            })
            .collect()
    }
}

/// Strings pass through, `null` is empty, text parts are concatenated, and
/// anything else is kept as its JSON text.
fn coerce_content(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        Value::Array(parts) if parts.iter().all(is_text_part) => parts
            .iter()
            .filter_map(|p| p.get("text").and_then(Value::as_str))
            .collect(),
        other => other.to_string(),
    }
}

fn is_text_part(p: &Value) -> bool {
    p.get("type").and_then(Value::as_str) == Some("text")
        && p.get("text").is_some_and(Value::is_string)
}
