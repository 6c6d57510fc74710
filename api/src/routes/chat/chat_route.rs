//! POST /api/chat: rate-limit, retrieve context and stream the answer.

use std::convert::Infallible;
use std::sync::Arc;

use async_stream::stream;
use axum::{
    Json,
    body::Body,
    extract::{State, rejection::JsonRejection},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::Response,
};
use contextor::{FrameStream, frames};
use futures::StreamExt;
use tracing::{debug, error};

use crate::{
    core::{app_state::AppState, client_identity::client_identity, rate_limiter},
    error_handler::{AppError, AppResult},
    routes::chat::chat_request::ChatRequest,
};

const DATA_STREAM_HEADER: &str = "x-vercel-ai-data-stream";

/// Handler: POST /api/chat
///
/// # Example
/// ```bash
/// curl -N -X POST http://127.0.0.1:3000/api/chat \
///   -H 'content-type: application/json' \
///   -d '{"messages":[{"role":"user","content":"How do I install it?"}]}'
/// ```
pub async fn chat_route(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> AppResult<Response> {
    let Json(body) = payload?;
    let messages = body.into_messages();
    if messages.is_empty() {
        return Err(AppError::BadRequest("messages must not be empty".into()));
    }

    let identity = client_identity(&headers);
    debug!(identity = ?identity, messages = messages.len(), "chat_route: start");

    rate_limiter::check_and_record(state.usage.as_ref(), identity.as_deref()).await?;

    let relayed = state.pipeline.respond(&messages).await?;

    let mut resp = Response::new(Body::from_stream(terminate_on_error(relayed)));
    *resp.status_mut() = StatusCode::OK;
    let h = resp.headers_mut();
    h.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    h.insert(DATA_STREAM_HEADER, HeaderValue::from_static("v1"));
    Ok(resp)
}

/// Turns a failure after streaming started into one error frame, then ends
/// the body. Headers are already sent at that point, so no status can change.
fn terminate_on_error(
    relayed: FrameStream,
) -> impl futures::Stream<Item = Result<axum::body::Bytes, Infallible>> + Send + 'static {
    stream! {
        let mut relayed = relayed;
        while let Some(item) = relayed.next().await {
            match item {
                Ok(chunk) => {
                    yield Ok::<_, Infallible>(chunk);
                }
                Err(err) => {
                    error!(error = %err, "chat_route: completion failed mid-stream");
                    yield Ok(frames::error_frame(&err.to_string()));
                    break;
                }
            }
        }
    }
}
