//! Typed error for the contextor crate.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ContextorError {
    /// Errors from the underlying rag-store crate (embedding, retrieval).
    #[error("RAG error: {0}")]
    Rag(#[from] rag_store::RagError),

    /// Completion provider errors, before or during streaming.
    #[error("LLM error: {0}")]
    Llm(#[from] ai_llm_service::AiLlmError),

    /// The conversation had no message to answer.
    #[error("conversation is empty")]
    EmptyConversation,
}
