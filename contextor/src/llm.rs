//! Completion seam over the shared LLM service.

use ai_llm_service::{AiLlmError, ChatEventStream, ChatMessage, LlmServiceProfiles};
use async_trait::async_trait;

/// Streams a chat completion for an assembled message list.
///
/// Resolving the future means the provider accepted the request; failures
/// after that arrive as `Err` items inside the stream.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    async fn stream_chat(&self, messages: &[ChatMessage]) -> Result<ChatEventStream, AiLlmError>;
}

#[async_trait]
impl CompletionProvider for LlmServiceProfiles {
    async fn stream_chat(&self, messages: &[ChatMessage]) -> Result<ChatEventStream, AiLlmError> {
        self.chat_stream(messages).await
    }
}
