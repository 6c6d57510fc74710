//! Runtime configuration loaded from environment variables.

use crate::prompt::DEFAULT_SYSTEM;

/// Cumulative token budget for retrieved context.
pub const TOKEN_BUDGET: i64 = 1700;

/// Text of the synthetic frame emitted ahead of end-of-stream metadata.
pub const DEFAULT_STREAM_MARKER: &str = "-- Custom string added at the End --";

/// Config bag for the pipeline. All fields have defaults via `from_env`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContextorConfig {
    pub system_prompt: String,
    pub stream_marker: String,
    pub token_budget: i64,
}

impl Default for ContextorConfig {
    fn default() -> Self {
        Self {
            system_prompt: DEFAULT_SYSTEM.trim().to_string(),
            stream_marker: DEFAULT_STREAM_MARKER.to_string(),
            token_budget: TOKEN_BUDGET,
        }
    }
}

impl ContextorConfig {
    /// Build from environment variables with sensible defaults.
    ///
    /// Reads `CHAT_SYSTEM_PROMPT` and `CHAT_STREAM_MARKER`. The token budget
    /// is fixed.
    ///
    /// # Example
    /// ```
    /// # use contextor::ContextorConfig;
    /// let cfg = ContextorConfig::from_env();
    /// assert_eq!(cfg.token_budget, 1700);
    /// ```
    pub fn from_env() -> Self {
        let dflt = Self::default();
        Self {
            system_prompt: env("CHAT_SYSTEM_PROMPT", &dflt.system_prompt),
            stream_marker: env("CHAT_STREAM_MARKER", &dflt.stream_marker),
            token_budget: dflt.token_budget,
        }
    }
}

fn env(k: &str, dflt: &str) -> String {
    std::env::var(k)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| dflt.to_string())
}
