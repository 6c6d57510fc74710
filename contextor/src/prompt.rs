//! Prompt assembly: system instruction, prior turns, retrieved context, query.

use ai_llm_service::{ChatMessage, ChatRole};
use rag_store::ContextChunk;

use crate::source::decode_source;

/// Default system instructions for documentation-grounded answers.
pub const DEFAULT_SYSTEM: &str = r#"
You are a helpful assistant answering questions about the documentation you are given.
Use the context provided with each question as ground truth and mention the source you relied on.
If the context does not contain the answer, say so instead of guessing.
"#;

/// Renders retrieved chunks as `source:\ntext` blocks separated by blank lines.
///
/// # Example
/// ```
/// # use contextor::prompt::format_context;
/// # use rag_store::ContextChunk;
/// let chunks = vec![ContextChunk {
///     text: "Install with cargo.".into(),
///     file_path: "guide_install.txt".into(),
///     n_tokens: 4,
///     distance: 0.1,
/// }];
/// assert_eq!(format_context(&chunks), "guide/install:\nInstall with cargo.");
/// ```
pub fn format_context(chunks: &[ContextChunk]) -> String {
    chunks
        .iter()
        .map(|c| format!("{}:\n{}", decode_source(&c.file_path), c.text))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Builds the ordered completion request.
///
/// `conversation` is the caller's full message list; its last element is the
/// active query. Earlier `system` messages are not forwarded, so the only
/// system messages are the instruction and the context block.
pub fn assemble(
    system_prompt: &str,
    conversation: &[ChatMessage],
    context: &[ContextChunk],
) -> Vec<ChatMessage> {
    let (query, history) = match conversation.split_last() {
        Some((last, rest)) => (last.content.as_str(), rest),
        None => ("", conversation),
    };

    let mut out = Vec::with_capacity(history.len() + 3);
    out.push(ChatMessage::system(system_prompt));
    out.extend(
        history
            .iter()
            .filter(|m| m.role != ChatRole::System)
            .cloned(),
    );
    out.push(ChatMessage::system(format!(
        "Context:\n{}",
        format_context(context)
    )));
    out.push(ChatMessage::user(query));
    out
}
