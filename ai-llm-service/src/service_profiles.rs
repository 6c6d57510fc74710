//! Shared LLM service with two active profiles: `chat` and `embedding`.
//!
//! - Lives in the same Tokio runtime as the application.
//! - Construct once, wrap in `Arc`, and pass clones to dependents.
//! - Both providers are reached through their OpenAI-compatible endpoints, so
//!   one [`OpenAiService`] client is built per profile up front.
//! - If both profiles share endpoint and model, health is probed only once.
//!
//! # Example
//! ```no_run
//! use std::sync::Arc;
//! use ai_llm_service::service_profiles::LlmServiceProfiles;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let svc = Arc::new(LlmServiceProfiles::from_env()?);
//!
//!     let emb = svc.embed("Ferris").await?;
//!     println!("Embedding dim = {}", emb.len());
//!
//!     for status in svc.health_all().await {
//!         println!("{} ok={}", status.model, status.ok);
//!     }
//!     Ok(())
//! }
//! ```

use tracing::info;

use crate::{
    chat::{ChatEventStream, ChatMessage},
    config::{
        default_config::{config_chat, config_embedding},
        llm_model_config::LlmModelConfig,
    },
    error_handler::AiLlmError,
    health_service::{HealthService, HealthStatus},
    services::open_ai_service::OpenAiService,
};

/// Shared service that owns the **chat** and **embedding** clients.
pub struct LlmServiceProfiles {
    chat: OpenAiService,
    embedding: OpenAiService,
    health: HealthService,
}

impl LlmServiceProfiles {
    /// Creates a new service from two profiles.
    ///
    /// # Errors
    /// Returns [`AiLlmError`] if either client or the health checker cannot be built
    /// (missing key, malformed endpoint, TLS init failure).
    pub fn new(
        chat: LlmModelConfig,
        embedding: LlmModelConfig,
        health_timeout_secs: Option<u64>,
    ) -> Result<Self, AiLlmError> {
        info!(
            chat_provider = ?chat.provider,
            chat_model = %chat.model,
            embedding_model = %embedding.model,
            "initializing LLM profiles"
        );

        Ok(Self {
            chat: OpenAiService::new(chat)?,
            embedding: OpenAiService::new(embedding)?,
            health: HealthService::new(health_timeout_secs)?,
        })
    }

    /// Builds both profiles from environment variables.
    ///
    /// See [`crate::config::default_config`] for the variables read.
    pub fn from_env() -> Result<Self, AiLlmError> {
        Self::new(config_chat()?, config_embedding()?, Some(10))
    }

    /// Starts a streamed completion on the **chat** profile.
    ///
    /// The returned future resolves once the provider accepted the request;
    /// a non-2xx answer is reported here rather than inside the stream.
    pub async fn chat_stream(&self, messages: &[ChatMessage]) -> Result<ChatEventStream, AiLlmError> {
        self.chat.chat_stream(messages).await
    }

    /// Computes embeddings using the **embedding** profile.
    pub async fn embed(&self, input: &str) -> Result<Vec<f32>, AiLlmError> {
        self.embedding.embeddings(input).await
    }

    /// Returns both profiles (chat first).
    pub fn profiles(&self) -> [&LlmModelConfig; 2] {
        [self.chat.config(), self.embedding.config()]
    }

    /// Returns a health snapshot for all distinct profiles.
    pub async fn health_all(&self) -> Vec<HealthStatus> {
        let [chat, embedding] = self.profiles();
        let mut configs = vec![chat.clone()];
        if !same_target(chat, embedding) {
            configs.push(embedding.clone());
        }
        self.health.check_many(&configs).await
    }
}

fn same_target(a: &LlmModelConfig, b: &LlmModelConfig) -> bool {
    a.provider == b.provider && a.endpoint == b.endpoint && a.model == b.model
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::llm_provider::LlmProvider;

    fn ollama(model: &str) -> LlmModelConfig {
        LlmModelConfig {
            provider: LlmProvider::Ollama,
            model: model.into(),
            endpoint: "http://localhost:11434".into(),
            api_key: None,
            max_tokens: None,
            temperature: None,
            timeout_secs: Some(5),
        }
    }

    #[test]
    fn builds_without_api_key_for_ollama() {
        let svc = LlmServiceProfiles::new(ollama("llama3"), ollama("nomic-embed-text"), Some(1))
            .unwrap();
        let [chat, embedding] = svc.profiles();
        assert_eq!(chat.model, "llama3");
        assert_eq!(embedding.model, "nomic-embed-text");
    }

    #[test]
    fn openai_profile_requires_key() {
        let mut cfg = ollama("gpt-4-turbo");
        cfg.provider = LlmProvider::OpenAI;
        assert!(LlmServiceProfiles::new(cfg, ollama("e"), None).is_err());
    }

    #[test]
    fn identical_profiles_share_a_probe() {
        assert!(same_target(&ollama("m"), &ollama("m")));
        assert!(!same_target(&ollama("m"), &ollama("n")));
    }
}
