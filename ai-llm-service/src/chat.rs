//! Chat message and streaming event types shared with callers.

use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};

use crate::error_handler::AiLlmError;

/// Author of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

/// One message of a chat completion request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

/// Token accounting reported at the end of a stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}

/// Decoded event of a streamed chat completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatStreamEvent {
    /// Incremental assistant text.
    Delta(String),
    /// Terminal event, emitted once after the provider signalled `[DONE]`.
    ///
    /// `usage` is `None` when the provider did not report token counts.
    Finish {
        reason: String,
        usage: Option<TokenUsage>,
    },
}

/// Owned stream of decoded completion events.
pub type ChatEventStream = BoxStream<'static, Result<ChatStreamEvent, AiLlmError>>;
