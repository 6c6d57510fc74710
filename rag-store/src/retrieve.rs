//! Nearest-chunk retrieval bounded by a cumulative token budget.

use async_trait::async_trait;
use sqlx::{PgPool, Row};
use tracing::{debug, trace};

use crate::errors::RagError;
use crate::record::ContextChunk;

/// Ranked document chunks reachable by embedding similarity.
#[async_trait]
pub trait ChunkIndex: Send + Sync {
    /// Returns chunks by ascending distance to `query`, keeping the ranked
    /// prefix whose inclusive running `n_tokens` sum is at most `token_budget`.
    async fn nearest_within_budget(
        &self,
        query: &[f32],
        token_budget: i64,
    ) -> Result<Vec<ContextChunk>, RagError>;
}

/// `documents` table with a pgvector `embeddings` column.
#[derive(Clone, Debug)]
pub struct PgChunkIndex {
    pool: PgPool,
}

impl PgChunkIndex {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const NEAREST_WITHIN_BUDGET: &str = "\
SELECT text, file_path, n_tokens, distance
FROM (
    SELECT text, file_path, n_tokens::BIGINT AS n_tokens,
           (embeddings <=> $1::vector) AS distance,
           SUM(n_tokens) OVER (ORDER BY embeddings <=> $1::vector) AS cum_n_tokens
    FROM documents
) ranked
WHERE cum_n_tokens <= $2
ORDER BY distance ASC";

#[async_trait]
impl ChunkIndex for PgChunkIndex {
    async fn nearest_within_budget(
        &self,
        query: &[f32],
        token_budget: i64,
    ) -> Result<Vec<ContextChunk>, RagError> {
        if query.is_empty() {
            return Err(RagError::Config("query embedding is empty".into()));
        }

        let rows = sqlx::query(NEAREST_WITHIN_BUDGET)
            .bind(vector_literal(query))
            .bind(token_budget)
            .fetch_all(&self.pool)
            .await?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(ContextChunk {
                text: row.try_get("text")?,
                file_path: row.try_get("file_path")?,
                n_tokens: row.try_get("n_tokens")?,
                distance: row.try_get("distance")?,
            });
        }

        debug!(
            chunks = out.len(),
            tokens = out.iter().map(|c| c.n_tokens).sum::<i64>(),
            budget = token_budget,
            "context retrieved"
        );
        Ok(out)
    }
}

/// Renders a vector in pgvector's text input form, `[x1,x2,...]`.
pub fn vector_literal(v: &[f32]) -> String {
    let mut s = String::with_capacity(v.len() * 10 + 2);
    s.push('[');
    for (i, x) in v.iter().enumerate() {
        if i > 0 {
            s.push(',');
        }
        s.push_str(&x.to_string());
    }
    s.push(']');
    trace!(dim = v.len(), "vector literal rendered");
    s
}
