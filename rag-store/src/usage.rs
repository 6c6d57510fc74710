//! Append-only usage log backing the per-identity rate limiter.

use std::time::Duration;

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::trace;

use crate::errors::RagError;

/// Persisted request counter keyed by caller identity.
///
/// `None` identities are one shared bucket. Counting and recording are
/// independent operations; callers must not assume atomicity between them.
#[async_trait]
pub trait UsageLog: Send + Sync {
    /// Counts events for `identity` strictly younger than `window`.
    async fn count_recent(&self, identity: Option<&str>, window: Duration) -> Result<i64, RagError>;

    /// Appends one event stamped with the store's clock.
    async fn record(&self, identity: Option<&str>) -> Result<(), RagError>;
}

/// `usage` table in Postgres.
#[derive(Clone, Debug)]
pub struct PgUsageLog {
    pool: PgPool,
}

impl PgUsageLog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UsageLog for PgUsageLog {
    async fn count_recent(&self, identity: Option<&str>, window: Duration) -> Result<i64, RagError> {
        // IS NOT DISTINCT FROM lets NULL identities match each other.
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM usage \
             WHERE ip_address IS NOT DISTINCT FROM $1 \
               AND created_at > NOW() - make_interval(secs => $2)",
        )
        .bind(identity)
        .bind(window.as_secs_f64())
        .fetch_one(&self.pool)
        .await?;
        trace!(identity = ?identity, count, "usage counted");
        Ok(count)
    }

    async fn record(&self, identity: Option<&str>) -> Result<(), RagError> {
        sqlx::query("INSERT INTO usage (ip_address) VALUES ($1)")
            .bind(identity)
            .execute(&self.pool)
            .await?;
        trace!(identity = ?identity, "usage recorded");
        Ok(())
    }
}
