//! Data-stream protocol framing.
//!
//! Every frame is `<type>:<json>\n` and travels as its own chunk, so a
//! chunk's first two bytes identify its kind:
//!
//! | prefix | payload |
//! |--------|---------|
//! | `f:` | `{"messageId"}` start of message |
//! | `0:` | JSON string, text delta |
//! | `e:` | `{"finishReason","usage","isContinued"}` step finish |
//! | `d:` | `{"finishReason","usage"}` message finish |
//! | `3:` | JSON string, error |

use ai_llm_service::{AiLlmError, ChatEventStream, ChatStreamEvent, TokenUsage};
use async_stream::try_stream;
use bytes::Bytes;
use futures::StreamExt;
use futures::stream::BoxStream;
use serde::Serialize;
use serde_json::json;

/// Prefixes of end-of-stream metadata frames.
pub const CONTROL_PREFIXES: [&[u8]; 2] = [b"e:", b"d:"];

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Usage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

impl From<Option<TokenUsage>> for Usage {
    fn from(u: Option<TokenUsage>) -> Self {
        let u = u.unwrap_or_default();
        Self {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
        }
    }
}

fn frame(kind: char, payload: &serde_json::Value) -> Bytes {
    Bytes::from(format!("{kind}:{payload}\n"))
}

pub fn start_frame(message_id: &str) -> Bytes {
    frame('f', &json!({ "messageId": message_id }))
}

pub fn text_frame(text: &str) -> Bytes {
    frame('0', &json!(text))
}

pub fn error_frame(message: &str) -> Bytes {
    frame('3', &json!(message))
}

pub fn step_finish_frame(reason: &str, usage: Option<TokenUsage>) -> Bytes {
    frame(
        'e',
        &json!({
            "finishReason": finish_reason(reason),
            "usage": Usage::from(usage),
            "isContinued": false,
        }),
    )
}

pub fn finish_frame(reason: &str, usage: Option<TokenUsage>) -> Bytes {
    frame(
        'd',
        &json!({
            "finishReason": finish_reason(reason),
            "usage": Usage::from(usage),
        }),
    )
}

/// True for frames that must wait until the content stream has ended.
pub fn is_control(chunk: &[u8]) -> bool {
    CONTROL_PREFIXES.iter().any(|p| chunk.starts_with(p))
}

/// Maps provider finish reasons onto the protocol's kebab-case names.
fn finish_reason(raw: &str) -> &'static str {
    match raw {
        "stop" => "stop",
        "length" => "length",
        "content_filter" => "content-filter",
        "tool_calls" | "function_call" => "tool-calls",
        "error" => "error",
        _ => "unknown",
    }
}

/// Encodes completion events as frames: one start frame, a text frame per
/// non-empty delta, then step-finish and finish frames on completion.
pub fn encode_events(
    events: ChatEventStream,
    message_id: String,
) -> BoxStream<'static, Result<Bytes, AiLlmError>> {
    Box::pin(try_stream! {
        yield start_frame(&message_id);
        let mut events = events;
        while let Some(event) = events.next().await {
            match event? {
                ChatStreamEvent::Delta(text) if text.is_empty() => {}
                ChatStreamEvent::Delta(text) => {
                    yield text_frame(&text);
                }
                ChatStreamEvent::Finish { reason, usage } => {
                    yield step_finish_frame(&reason, usage);
                    yield finish_frame(&reason, usage);
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::{TryStreamExt, stream};

    fn text(b: &Bytes) -> &str {
        std::str::from_utf8(b).unwrap()
    }

    #[test]
    fn text_frames_are_json_strings() {
        assert_eq!(text(&text_frame("say \"hi\"\n")), "0:\"say \\\"hi\\\"\\n\"\n");
        assert_eq!(text(&error_frame("boom")), "3:\"boom\"\n");
    }

    #[test]
    fn finish_frames_carry_usage() {
        let usage = Some(TokenUsage {
            prompt_tokens: 12,
            completion_tokens: 3,
        });
        let e: serde_json::Value =
            serde_json::from_str(&text(&step_finish_frame("stop", usage))[2..]).unwrap();
        assert_eq!(
            e,
            json!({
                "finishReason": "stop",
                "usage": {"promptTokens": 12, "completionTokens": 3},
                "isContinued": false
            })
        );
        let d = text(&finish_frame("content_filter", None)).to_string();
        assert!(d.starts_with("d:{"));
        assert!(d.contains("\"finishReason\":\"content-filter\""));
        assert!(d.contains("\"promptTokens\":0"));
    }

    #[test]
    fn recognises_control_frames() {
        assert!(is_control(&finish_frame("stop", None)));
        assert!(is_control(&step_finish_frame("stop", None)));
        assert!(!is_control(&text_frame("e: not control")));
        assert!(!is_control(&start_frame("m")));
    }

    #[tokio::test]
    async fn encodes_event_sequence() {
        let events: ChatEventStream = Box::pin(stream::iter(vec![
            Ok(ChatStreamEvent::Delta("Hel".into())),
            Ok(ChatStreamEvent::Delta(String::new())),
            Ok(ChatStreamEvent::Delta("lo".into())),
            Ok(ChatStreamEvent::Finish {
                reason: "stop".into(),
                usage: None,
            }),
        ]));
        let frames: Vec<Bytes> = encode_events(events, "msg-1".into())
            .try_collect()
            .await
            .unwrap();
        let kinds: Vec<&str> = frames.iter().map(|f| &text(f)[..2]).collect();
        assert_eq!(kinds, ["f:", "0:", "0:", "e:", "d:"]);
        assert_eq!(text(&frames[0]), "f:{\"messageId\":\"msg-1\"}\n");
    }
}
