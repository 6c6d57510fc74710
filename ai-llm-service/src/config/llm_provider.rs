use crate::error_handler::ConfigError;

/// Represents the provider (backend) used for large language model (LLM) inference.
///
/// Both providers are reached through the OpenAI-compatible REST surface
/// (`/v1/chat/completions`, `/v1/embeddings`, `/v1/models`); they differ in
/// authentication and default endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LlmProvider {
    /// OpenAI API (bearer key required).
    OpenAI,
    /// Local Ollama runtime exposing its OpenAI-compatible endpoints.
    Ollama,
}

impl LlmProvider {
    /// Parses the `LLM_KIND` value (`openai` / `chatgpt` / `ollama`).
    pub fn from_kind(kind: &str) -> Result<Self, ConfigError> {
        match kind.trim().to_ascii_lowercase().as_str() {
            "openai" | "chatgpt" => Ok(LlmProvider::OpenAI),
            "ollama" => Ok(LlmProvider::Ollama),
            other => Err(ConfigError::UnsupportedProvider(other.to_string())),
        }
    }

    /// Whether requests must carry a bearer API key.
    pub fn requires_api_key(self) -> bool {
        matches!(self, LlmProvider::OpenAI)
    }
}
