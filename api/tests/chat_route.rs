use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use ai_llm_service::error_handler::{Provider, ProviderError, ProviderErrorKind};
use ai_llm_service::{AiLlmError, ChatEventStream, ChatMessage, ChatStreamEvent, TokenUsage};
use api::{AppState, router};
use async_trait::async_trait;
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode},
};
use contextor::{ChatPipeline, CompletionProvider, ContextorConfig};
use futures::stream;
use rag_store::memory::{MemoryChunkIndex, MemoryUsageLog};
use rag_store::{EmbeddingsProvider, RagError, StoredChunk};
use serde_json::{Value, json};
use tower::ServiceExt;

struct FixedEmbedder;

impl EmbeddingsProvider for FixedEmbedder {
    fn embed<'a>(
        &'a self,
        _text: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<f32>, RagError>> + Send + 'a>> {
        Box::pin(async { Ok(vec![1.0, 0.0]) })
    }
}

#[derive(Clone, Copy)]
enum Script {
    Answer,
    Rejected,
    BreaksMidStream,
}

struct FakeCompletion {
    script: Script,
    seen: Mutex<Vec<Vec<ChatMessage>>>,
}

fn stream_err(msg: &str) -> AiLlmError {
    ProviderError::new(Provider::OpenAI, ProviderErrorKind::Stream(msg.into())).into()
}

#[async_trait]
impl CompletionProvider for FakeCompletion {
    async fn stream_chat(&self, messages: &[ChatMessage]) -> Result<ChatEventStream, AiLlmError> {
        self.seen.lock().unwrap().push(messages.to_vec());
        let events = match self.script {
            Script::Rejected => {
                return Err(ProviderError::new(
                    Provider::OpenAI,
                    ProviderErrorKind::InvalidEndpoint("http://down".into()),
                )
                .into());
            }
            Script::Answer => vec![
                Ok(ChatStreamEvent::Delta("Run ".into())),
                Ok(ChatStreamEvent::Delta("cargo install.".into())),
                Ok(ChatStreamEvent::Finish {
                    reason: "stop".into(),
                    usage: Some(TokenUsage {
                        prompt_tokens: 40,
                        completion_tokens: 4,
                    }),
                }),
            ],
            Script::BreaksMidStream => vec![
                Ok(ChatStreamEvent::Delta("Run ".into())),
                Err(stream_err("connection reset")),
            ],
        };
        Ok(Box::pin(stream::iter(events)))
    }
}

struct Harness {
    app: Router,
    usage: Arc<MemoryUsageLog>,
    completion: Arc<FakeCompletion>,
}

fn harness(script: Script) -> Harness {
    let usage = Arc::new(MemoryUsageLog::new());
    let completion = Arc::new(FakeCompletion {
        script,
        seen: Mutex::default(),
    });
    let index = MemoryChunkIndex::new(vec![StoredChunk {
        text: "Use cargo install.".into(),
        file_path: "docs_install.txt".into(),
        n_tokens: 120,
        embedding: vec![1.0, 0.0],
    }]);
    let pipeline = ChatPipeline::new(
        Arc::new(FixedEmbedder),
        Arc::new(index),
        completion.clone(),
        ContextorConfig::default(),
    );
    let state = AppState::new(usage.clone(), pipeline);
    Harness {
        app: router(Arc::new(state)),
        usage,
        completion,
    }
}

fn chat_request(body: Value, ip: Option<&str>) -> Request<Body> {
    let mut req = Request::builder()
        .method("POST")
        .uri("/api/chat")
        .header("content-type", "application/json");
    if let Some(ip) = ip {
        req = req.header("x-real-ip", ip);
    }
    req.body(Body::from(body.to_string())).unwrap()
}

fn question() -> Value {
    json!({"messages": [
        {"role": "user", "content": "hello"},
        {"role": "assistant", "content": "hi"},
        {"role": "user", "content": "how do I install?"}
    ]})
}

async fn body_text(resp: axum::response::Response) -> String {
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn streams_frames_with_marker_before_metadata() {
    let h = harness(Script::Answer);
    let resp = h
        .app
        .clone()
        .oneshot(chat_request(question(), Some("1.2.3.4")))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers()["content-type"], "text/plain; charset=utf-8");
    assert_eq!(resp.headers()["x-vercel-ai-data-stream"], "v1");

    let body = body_text(resp).await;
    let lines: Vec<&str> = body.lines().collect();
    assert_eq!(lines.len(), 6, "{body}");
    assert!(lines[0].starts_with("f:{\"messageId\":"));
    assert_eq!(lines[1], "0:\"Run \"");
    assert_eq!(lines[2], "0:\"cargo install.\"");
    assert_eq!(lines[3], "0:\"-- Custom string added at the End --\"");
    assert!(lines[4].starts_with("e:"));
    assert!(lines[4].contains("\"promptTokens\":40"));
    assert!(lines[5].starts_with("d:"));

    let seen = h.completion.seen.lock().unwrap();
    let sent = &seen[0];
    assert_eq!(sent.len(), 5);
    assert_eq!(sent[3].content, "Context:\ndocs/install:\nUse cargo install.");
    assert_eq!(sent[4], ChatMessage::user("how do I install?"));

    assert_eq!(h.usage.events().len(), 1);
    assert_eq!(h.usage.events()[0].ip_address.as_deref(), Some("1.2.3.4"));
}

#[tokio::test]
async fn sixth_request_in_window_gets_429() {
    let h = harness(Script::Answer);
    for _ in 0..5 {
        let resp = h
            .app
            .clone()
            .oneshot(chat_request(question(), Some("9.9.9.9")))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    let resp = h
        .app
        .clone()
        .oneshot(chat_request(question(), Some("9.9.9.9")))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);
    let body: Value = serde_json::from_str(&body_text(resp).await).unwrap();
    assert_eq!(body["error"], "Too many requests");

    // Completion was not requested for the rejected call.
    assert_eq!(h.completion.seen.lock().unwrap().len(), 5);
}

#[tokio::test]
async fn callers_without_identity_share_one_bucket() {
    let h = harness(Script::Answer);
    for _ in 0..5 {
        let resp = h.app.clone().oneshot(chat_request(question(), None)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }
    let resp = h.app.clone().oneshot(chat_request(question(), None)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn provider_rejection_is_a_structured_502() {
    let h = harness(Script::Rejected);
    let resp = h
        .app
        .clone()
        .oneshot(chat_request(question(), Some("1.1.1.1")))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
    let body: Value = serde_json::from_str(&body_text(resp).await).unwrap();
    assert_eq!(body["code"], "UPSTREAM_ERROR");
}

#[tokio::test]
async fn mid_stream_failure_ends_with_error_frame() {
    let h = harness(Script::BreaksMidStream);
    let resp = h
        .app
        .clone()
        .oneshot(chat_request(question(), Some("1.1.1.1")))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let body = body_text(resp).await;
    let lines: Vec<&str> = body.lines().collect();
    assert_eq!(lines.len(), 3, "{body}");
    assert_eq!(lines[1], "0:\"Run \"");
    assert!(lines[2].starts_with("3:\""));
    assert!(lines[2].contains("connection reset"));
    assert!(!body.contains("Custom string"));
}

#[tokio::test]
async fn empty_or_malformed_bodies_are_400_and_not_counted() {
    let h = harness(Script::Answer);

    let resp = h
        .app
        .clone()
        .oneshot(chat_request(json!({"messages": []}), Some("2.2.2.2")))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let bad = Request::builder()
        .method("POST")
        .uri("/api/chat")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let resp = h.app.clone().oneshot(bad).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    assert!(h.usage.events().is_empty());
}

#[tokio::test]
async fn health_without_targets_is_ok() {
    let h = harness(Script::Answer);
    let resp = h
        .app
        .clone()
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = serde_json::from_str(&body_text(resp).await).unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["providers"], json!([]));
}

#[tokio::test]
async fn unknown_route_is_404_json() {
    let h = harness(Script::Answer);
    let resp = h
        .app
        .clone()
        .oneshot(Request::get("/nope").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: Value = serde_json::from_str(&body_text(resp).await).unwrap();
    assert_eq!(body["code"], "NOT_FOUND");
}
