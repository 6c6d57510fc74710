//! OpenAI-compatible service for streamed chat completions and embeddings.
//!
//! Endpoints are derived from `LlmModelConfig::endpoint`:
//! - POST {endpoint}/v1/chat/completions: chat completion (`stream: true`, SSE)
//! - POST {endpoint}/v1/embeddings      : embeddings retrieval
//!
//! The same client serves OpenAI and Ollama (which exposes the OpenAI surface);
//! only OpenAI requires a bearer key.
//!
//! Constructor validation:
//! - `cfg.api_key` must be present when the provider requires it
//! - `cfg.endpoint` must start with http:// or https://
//!
//! Errors are normalized via unified error types in `error_handler`.

use std::time::{Duration, Instant};

use futures::StreamExt;
use reqwest::header;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::{
    chat::{ChatEventStream, ChatMessage, ChatStreamEvent, TokenUsage},
    config::{llm_model_config::LlmModelConfig, llm_provider::LlmProvider},
    error_handler::{
        AiLlmError, HttpError, Provider, ProviderError, ProviderErrorKind, make_snippet,
    },
    services::sse::SseDecoder,
};

/// Thin client for an OpenAI-compatible API.
///
/// Constructed from a complete [`LlmModelConfig`]. Internally keeps a
/// preconfigured `reqwest::Client` (with timeouts and default headers).
///
/// `timeout_secs` bounds the idle time between reads, so a long completion
/// keeps streaming as long as tokens arrive. Embedding requests additionally
/// get it as a total deadline.
///
/// High-level operations:
/// - [`OpenAiService::chat_stream`]: streamed chat completion
/// - [`OpenAiService::embeddings`] : single embeddings vector retrieval
#[derive(Debug)]
pub struct OpenAiService {
    client: reqwest::Client,
    cfg: LlmModelConfig,
    timeout: Duration,
    url_chat: String,
    url_embeddings: String,
}

impl OpenAiService {
    /// Creates a new [`OpenAiService`] from the given config.
    ///
    /// # Errors
    /// - [`AiLlmError::Provider`] with `MissingApiKey` if a key is required but absent
    /// - [`AiLlmError::Provider`] with `InvalidEndpoint` if `cfg.endpoint` is invalid
    /// - [`AiLlmError::HttpTransport`] if the HTTP client cannot be built
    pub fn new(cfg: LlmModelConfig) -> Result<Self, AiLlmError> {
        let provider = provider_tag(cfg.provider);

        if cfg.provider.requires_api_key() && cfg.api_key.is_none() {
            return Err(ProviderError::new(provider, ProviderErrorKind::MissingApiKey).into());
        }

        let endpoint = cfg.endpoint.trim();
        if endpoint.is_empty()
            || !(endpoint.starts_with("http://") || endpoint.starts_with("https://"))
        {
            return Err(ProviderError::new(
                provider,
                ProviderErrorKind::InvalidEndpoint(cfg.endpoint.clone()),
            )
            .into());
        }

        let timeout = cfg
            .timeout_secs
            .map(Duration::from_secs)
            .unwrap_or_else(|| Duration::from_secs(60));

        let mut headers = header::HeaderMap::new();
        if let Some(key) = cfg.api_key.as_deref() {
            headers.insert(
                header::AUTHORIZATION,
                header::HeaderValue::from_str(&format!("Bearer {key}")).map_err(|e| {
                    ProviderError::new(
                        provider,
                        ProviderErrorKind::Decode(format!("invalid API key header: {e}")),
                    )
                })?,
            );
        }
        headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );

        let client = reqwest::Client::builder()
            .read_timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .default_headers(headers)
            .build()?;

        let base = endpoint.trim_end_matches('/').to_string();
        let url_chat = format!("{base}/v1/chat/completions");
        let url_embeddings = format!("{base}/v1/embeddings");

        info!(
            provider = ?cfg.provider,
            model = %cfg.model,
            endpoint = %cfg.endpoint,
            timeout_secs = timeout.as_secs(),
            "OpenAiService initialized"
        );

        Ok(Self {
            client,
            cfg,
            timeout,
            url_chat,
            url_embeddings,
        })
    }

    pub fn config(&self) -> &LlmModelConfig {
        &self.cfg
    }

    /// Starts a **streamed** chat completion (`stream: true`).
    ///
    /// The returned future resolves once the provider accepted the request
    /// (2xx status). The stream then yields [`ChatStreamEvent::Delta`] for
    /// every non-empty content delta and a single [`ChatStreamEvent::Finish`]
    /// after `[DONE]`.
    ///
    /// # Errors
    /// - [`AiLlmError::Provider`] with `HttpStatus` for non-2xx responses
    /// - [`AiLlmError::HttpTransport`] for client/network failures
    ///
    /// Stream items fail with `Decode` for malformed chunks and `Stream` when
    /// the body ends before `[DONE]`.
    pub async fn chat_stream(&self, messages: &[ChatMessage]) -> Result<ChatEventStream, AiLlmError> {
        let started = Instant::now();
        let body = ChatCompletionRequest {
            model: &self.cfg.model,
            messages,
            stream: true,
            stream_options: StreamOptions {
                include_usage: true,
            },
            temperature: self.cfg.temperature,
            max_tokens: self.cfg.max_tokens,
        };

        debug!(
            model = %self.cfg.model,
            endpoint = %self.cfg.endpoint,
            messages = messages.len(),
            "POST {}", self.url_chat
        );

        let resp = self.client.post(&self.url_chat).json(&body).send().await?;

        if !resp.status().is_success() {
            return Err(self
                .status_error(resp, &self.url_chat, started, "/v1/chat/completions")
                .await);
        }

        info!(
            model = %self.cfg.model,
            latency_ms = started.elapsed().as_millis(),
            "chat completion stream opened"
        );

        let provider = provider_tag(self.cfg.provider);
        let model = self.cfg.model.clone();
        let mut bytes = Box::pin(resp.bytes_stream());

        let stream: ChatEventStream = Box::pin(async_stream::try_stream! {
            let mut decoder = SseDecoder::default();
            let mut finish_reason: Option<String> = None;
            let mut usage: Option<TokenUsage> = None;
            let mut done = false;

            while !done {
                let Some(chunk) = bytes.next().await else { break };
                let chunk = chunk.map_err(AiLlmError::from)?;

                for data in decoder.push(&chunk) {
                    if data.trim() == "[DONE]" {
                        done = true;
                        break;
                    }
                    let parsed = parse_chunk(provider, &data)?;
                    if let Some(u) = parsed.usage {
                        usage = Some(TokenUsage {
                            prompt_tokens: u.prompt_tokens,
                            completion_tokens: u.completion_tokens,
                        });
                    }
                    for choice in parsed.choices {
                        if let Some(reason) = choice.finish_reason {
                            finish_reason = Some(reason);
                        }
                        if let Some(text) = choice.delta.content {
                            if !text.is_empty() {
                                yield ChatStreamEvent::Delta(text);
                            }
                        }
                    }
                }
            }

            if !done {
                done = decoder.finish().is_some_and(|d| d.trim() == "[DONE]");
            }
            if !done {
                warn!(model = %model, "completion stream ended before [DONE]");
                Err::<(), AiLlmError>(
                    ProviderError::new(
                        provider,
                        ProviderErrorKind::Stream("connection closed before [DONE]".into()),
                    )
                    .into(),
                )?;
            }

            debug!(model = %model, ?finish_reason, ?usage, "completion stream finished");
            yield ChatStreamEvent::Finish {
                reason: finish_reason.unwrap_or_else(|| "unknown".to_string()),
                usage,
            };
        });

        Ok(stream)
    }

    /// Retrieves a single embeddings vector via `/v1/embeddings`.
    ///
    /// # Errors
    /// - [`AiLlmError::Provider`] with `HttpStatus` for non-2xx responses
    /// - [`AiLlmError::HttpTransport`] for client/network failures
    /// - [`AiLlmError::Provider`] with `Decode` if the JSON cannot be parsed
    pub async fn embeddings(&self, input: &str) -> Result<Vec<f32>, AiLlmError> {
        let started = Instant::now();
        let provider = provider_tag(self.cfg.provider);
        let body = EmbeddingsRequest {
            model: &self.cfg.model,
            input,
        };

        debug!(
            model = %self.cfg.model,
            endpoint = %self.cfg.endpoint,
            input_len = input.len(),
            "POST {}", self.url_embeddings
        );

        let resp = self
            .client
            .post(&self.url_embeddings)
            .timeout(self.timeout)
            .json(&body)
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(self
                .status_error(resp, &self.url_embeddings, started, "/v1/embeddings")
                .await);
        }

        let out: EmbeddingsResponse = match resp.json().await {
            Ok(v) => v,
            Err(e) => {
                error!(
                    error = %e,
                    model = %self.cfg.model,
                    endpoint = %self.cfg.endpoint,
                    latency_ms = started.elapsed().as_millis(),
                    "failed to decode /v1/embeddings response"
                );
                return Err(ProviderError::new(
                    provider,
                    ProviderErrorKind::Decode(format!(
                        "serde error: {e}; expected `data[0].embedding`"
                    )),
                )
                .into());
            }
        };

        let first = out.data.into_iter().next().ok_or_else(|| {
            ProviderError::new(
                provider,
                ProviderErrorKind::Decode("empty `data` in embeddings response".into()),
            )
        })?;

        info!(
            model = %self.cfg.model,
            dim = first.embedding.len(),
            latency_ms = started.elapsed().as_millis(),
            "embeddings completed"
        );

        Ok(first.embedding)
    }

    async fn status_error(
        &self,
        resp: reqwest::Response,
        url: &str,
        started: Instant,
        route: &str,
    ) -> AiLlmError {
        let status = resp.status();
        let text = resp.text().await.unwrap_or_default();
        let snippet = make_snippet(&text);

        error!(
            %status,
            %url,
            %snippet,
            model = %self.cfg.model,
            endpoint = %self.cfg.endpoint,
            latency_ms = started.elapsed().as_millis(),
            "{route} returned non-success status"
        );

        ProviderError::new(
            provider_tag(self.cfg.provider),
            ProviderErrorKind::HttpStatus(HttpError {
                status,
                url: url.to_string(),
                snippet,
            }),
        )
        .into()
    }
}

pub(crate) fn provider_tag(provider: LlmProvider) -> Provider {
    match provider {
        LlmProvider::OpenAI => Provider::OpenAI,
        LlmProvider::Ollama => Provider::Ollama,
    }
}

fn parse_chunk(provider: Provider, data: &str) -> Result<ChatCompletionChunk, AiLlmError> {
    serde_json::from_str(data).map_err(|e| {
        ProviderError::new(
            provider,
            ProviderErrorKind::Decode(format!(
                "serde error: {e}; in stream chunk `{}`",
                make_snippet(data)
            )),
        )
        .into()
    })
}

/* ===========================================================================
HTTP payloads
======================================================================== */

/// Request body for `/v1/chat/completions` (streaming).
#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
    stream_options: StreamOptions,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Serialize)]
struct StreamOptions {
    include_usage: bool,
}

/// One SSE `data:` payload of a streamed completion.
#[derive(Debug, Deserialize)]
struct ChatCompletionChunk {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
    #[serde(default)]
    usage: Option<ChunkUsage>,
}

#[derive(Debug, Deserialize)]
struct ChunkChoice {
    #[serde(default)]
    delta: ChunkDelta,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ChunkDelta {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChunkUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

/// Request body for `/v1/embeddings`.
#[derive(Debug, Serialize)]
struct EmbeddingsRequest<'a> {
    model: &'a str,
    input: &'a str,
}

/// Response body for `/v1/embeddings`.
#[derive(Debug, Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingItem>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingItem {
    embedding: Vec<f32>,
}
