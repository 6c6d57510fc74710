//! Process-wide `tracing` setup shared by the binary and tests.
//!
//! Two output formats are supported: compact human-readable lines (ANSI only
//! on a terminal) and one JSON object per event for log collectors.

use std::io::{self, IsTerminal};
use std::str::FromStr;

use tracing::{Level, debug};
use tracing_subscriber::filter::Directive;
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::time::FormatTime;
use tracing_subscriber::{EnvFilter, fmt};

/// Crate target prefix used to raise verbosity for this library only.
pub const TARGET_PREFIX: &str = "ai_llm_service";

/// RFC3339 UTC timer implemented via `chrono` (no extra features).
/// Example output: `2025-09-12T10:20:30Z`
#[derive(Clone, Debug, Default)]
pub struct Rfc3339Utc;

impl FormatTime for Rfc3339Utc {
    fn format_time(&self, w: &mut Writer<'_>) -> std::fmt::Result {
        let now = chrono::Utc::now();
        let s = now.to_rfc3339_opts(chrono::SecondsFormat::Secs, true);
        w.write_str(&s)
    }
}

/// Output format selected by `LOG_FORMAT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Compact,
    Json,
}

impl LogFormat {
    /// `json` (case-insensitive) selects JSON; anything else is compact.
    pub fn from_env() -> Self {
        match std::env::var("LOG_FORMAT") {
            Ok(v) if v.trim().eq_ignore_ascii_case("json") => Self::Json,
            _ => Self::Compact,
        }
    }
}

/// Builds a level directive for **this** library only, e.g. `ai_llm_service=debug`.
pub fn level_directive(level: Level) -> Option<Directive> {
    let s = format!("{TARGET_PREFIX}={}", level.as_str().to_lowercase());
    Directive::from_str(&s).ok()
}

/// Creates an `EnvFilter` from `RUST_LOG` or falls back to `default`,
/// then applies a per-crate level directive for this library.
///
/// An explicit `RUST_LOG` always wins over the library directive.
pub fn env_filter_with_level(default: &str, level: Level) -> EnvFilter {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => {
            let base = EnvFilter::new(default);
            match level_directive(level) {
                Some(d) => base.add_directive(d),
                None => base,
            }
        }
    }
}

/// Installs the global subscriber.
///
/// Returns `false` when a subscriber was already installed; the existing one
/// is kept and the refusal is logged through it.
pub fn init(format: LogFormat, filter: EnvFilter) -> bool {
    let builder = fmt()
        .with_env_filter(filter)
        .with_timer(Rfc3339Utc)
        .with_target(true);

    let installed = match format {
        LogFormat::Json => builder.json().flatten_event(true).try_init(),
        LogFormat::Compact => builder
            .compact()
            .with_ansi(io::stdout().is_terminal())
            .try_init(),
    };

    match installed {
        Ok(()) => true,
        Err(e) => {
            debug!(error = %e, ?format, "tracing subscriber already installed; keeping it");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_crate_directive() {
        let d = level_directive(Level::DEBUG).unwrap();
        assert_eq!(d.to_string(), "ai_llm_service=debug");
    }

    #[test]
    fn second_init_reports_existing_subscriber() {
        init(LogFormat::Compact, EnvFilter::new("warn"));
        assert!(!init(LogFormat::Json, EnvFilter::new("debug")));
    }
}
