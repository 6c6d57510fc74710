//! Retrieval-and-response pipeline for the chat endpoint.
//!
//! Public API: [`ChatPipeline::respond`]. It embeds the active query,
//! retrieves context within the token budget, assembles the prompt, starts a
//! streamed completion and returns the relayed data-stream frames.
//!
//! Everything up to the first byte fails with a plain [`ContextorError`];
//! failures after that arrive as an `Err` item that ends the stream.

mod cfg;
mod error;
pub mod frames;
mod llm;
pub mod prompt;
pub mod relay;
mod source;

use std::sync::Arc;
use std::time::Instant;

use ai_llm_service::ChatMessage;
use bytes::Bytes;
use futures::stream::BoxStream;
use futures::TryStreamExt;
use rag_store::{ChunkIndex, EmbeddingsProvider};
use tracing::{debug, info};

pub use cfg::{ContextorConfig, DEFAULT_STREAM_MARKER, TOKEN_BUDGET};
pub use error::ContextorError;
pub use llm::CompletionProvider;
pub use source::decode_source;

/// Relayed frames of one response.
pub type FrameStream = BoxStream<'static, Result<Bytes, ContextorError>>;

/// Collaborators and settings for answering one conversation.
///
/// Cheap to share: wrap in `Arc` or clone the `Arc`-held collaborators.
#[derive(Clone)]
pub struct ChatPipeline {
    embedder: Arc<dyn EmbeddingsProvider>,
    index: Arc<dyn ChunkIndex>,
    completion: Arc<dyn CompletionProvider>,
    cfg: ContextorConfig,
}

impl ChatPipeline {
    pub fn new(
        embedder: Arc<dyn EmbeddingsProvider>,
        index: Arc<dyn ChunkIndex>,
        completion: Arc<dyn CompletionProvider>,
        cfg: ContextorConfig,
    ) -> Self {
        Self {
            embedder,
            index,
            completion,
            cfg,
        }
    }

    pub fn config(&self) -> &ContextorConfig {
        &self.cfg
    }

    /// Answers `conversation`, whose last message is the active query.
    ///
    /// # Errors
    /// - `EmptyConversation` if there is nothing to answer
    /// - `Rag` if embedding or retrieval fails
    /// - `Llm` if the completion request is rejected
    pub async fn respond(&self, conversation: &[ChatMessage]) -> Result<FrameStream, ContextorError> {
        let query = conversation
            .last()
            .ok_or(ContextorError::EmptyConversation)?;
        let started = Instant::now();

        let embedding = self.embedder.embed(&query.content).await?;
        debug!(dim = embedding.len(), "query embedded");

        let context = self
            .index
            .nearest_within_budget(&embedding, self.cfg.token_budget)
            .await?;

        let messages = prompt::assemble(&self.cfg.system_prompt, conversation, &context);
        let events = self.completion.stream_chat(&messages).await?;

        let message_id = format!("msg-{}", uuid::Uuid::new_v4().simple());
        info!(
            message_id = %message_id,
            history = conversation.len() - 1,
            context_chunks = context.len(),
            latency_ms = started.elapsed().as_millis(),
            "completion stream started"
        );

        let frames = frames::encode_events(events, message_id).map_err(ContextorError::from);
        let marker = frames::text_frame(&self.cfg.stream_marker);
        Ok(relay::relay(frames, marker))
    }
}
