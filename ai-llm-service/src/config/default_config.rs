//! Default LLM configs loaded from environment variables.
//!
//! Two roles are resolved here:
//!
//! - **Chat**      → streamed completion model that answers the user
//! - **Embedding** → embedding generator used for retrieval
//!
//! # Environment variables
//!
//! Common:
//! - `LLM_KIND`          = provider kind (`openai` (default), `ollama`)
//! - `LLM_MAX_TOKENS`    = optional max tokens (u32)
//! - `LLM_TIMEOUT_SECS`  = optional request timeout (u64, default 120)
//! - `CHAT_MODEL`        = completion model (default `gpt-4-turbo`)
//! - `EMBEDDING_MODEL`   = embedding model (default `text-embedding-ada-002`)
//!
//! OpenAI-specific:
//! - `OPENAI_API_KEY`    = bearer key (mandatory)
//! - `OPENAI_BASE_URL`   = endpoint (default `https://api.openai.com`)
//!
//! Ollama-specific:
//! - `OLLAMA_URL`        = endpoint (default `http://localhost:11434`)

use crate::{
    config::{llm_model_config::LlmModelConfig, llm_provider::LlmProvider},
    error_handler::{
        AiLlmError, env_opt, env_opt_u32, env_opt_u64, must_env, validate_http_endpoint,
    },
};

pub const DEFAULT_CHAT_MODEL: &str = "gpt-4-turbo";
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-ada-002";
pub const DEFAULT_OPENAI_URL: &str = "https://api.openai.com";
pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Provider plus connection settings shared by both roles.
struct ProviderEnv {
    provider: LlmProvider,
    endpoint: String,
    api_key: Option<String>,
}

fn provider_env() -> Result<ProviderEnv, AiLlmError> {
    let provider = match env_opt("LLM_KIND") {
        Some(kind) => LlmProvider::from_kind(&kind)?,
        None => LlmProvider::OpenAI,
    };

    let (endpoint, api_key) = match provider {
        LlmProvider::OpenAI => {
            let url = env_opt("OPENAI_BASE_URL").unwrap_or_else(|| DEFAULT_OPENAI_URL.into());
            validate_http_endpoint("OPENAI_BASE_URL", &url)?;
            (url, Some(must_env("OPENAI_API_KEY")?))
        }
        LlmProvider::Ollama => {
            let url = env_opt("OLLAMA_URL").unwrap_or_else(|| DEFAULT_OLLAMA_URL.into());
            validate_http_endpoint("OLLAMA_URL", &url)?;
            (url, None)
        }
    };

    Ok(ProviderEnv {
        provider,
        endpoint,
        api_key,
    })
}

/// Constructs the config for the **chat** (streamed completion) model.
///
/// # Defaults
/// - `model = gpt-4-turbo`
/// - `temperature = None` (provider default)
/// - `timeout_secs = Some(120)`
pub fn config_chat() -> Result<LlmModelConfig, AiLlmError> {
    let env = provider_env()?;
    let model = env_opt("CHAT_MODEL").unwrap_or_else(|| DEFAULT_CHAT_MODEL.into());
    let max_tokens = env_opt_u32("LLM_MAX_TOKENS")?;
    let timeout_secs = env_opt_u64("LLM_TIMEOUT_SECS")?.unwrap_or(DEFAULT_TIMEOUT_SECS);

    Ok(LlmModelConfig {
        provider: env.provider,
        model,
        endpoint: env.endpoint,
        api_key: env.api_key,
        max_tokens,
        temperature: None,
        timeout_secs: Some(timeout_secs),
    })
}

/// Constructs the config for the **embedding** model.
///
/// # Defaults
/// - `model = text-embedding-ada-002`
/// - `timeout_secs = Some(30)`
pub fn config_embedding() -> Result<LlmModelConfig, AiLlmError> {
    let env = provider_env()?;
    let model = env_opt("EMBEDDING_MODEL").unwrap_or_else(|| DEFAULT_EMBEDDING_MODEL.into());

    Ok(LlmModelConfig {
        provider: env.provider,
        model,
        endpoint: env.endpoint,
        api_key: env.api_key,
        max_tokens: None,
        temperature: Some(0.0),
        timeout_secs: Some(30),
    })
}
