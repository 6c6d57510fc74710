//! Core data models used by the library.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// One accepted request, as persisted in the `usage` table.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct UsageEvent {
    /// Caller identity; `None` is the shared anonymous bucket.
    pub ip_address: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A retrieved document chunk, in ranked order.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ContextChunk {
    pub text: String,
    /// Raw `file_path` column (still encoded, see `contextor::source`).
    pub file_path: String,
    pub n_tokens: i64,
    /// Cosine distance to the query (lower is closer).
    pub distance: f64,
}

/// A chunk as held by the in-memory index.
#[derive(Clone, Debug, PartialEq)]
pub struct StoredChunk {
    pub text: String,
    pub file_path: String,
    pub n_tokens: i64,
    pub embedding: Vec<f32>,
}
