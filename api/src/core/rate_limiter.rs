//! Sliding-window request limiter over the persisted usage log.
//!
//! Count and record are two separate store calls with no transaction, so
//! concurrent requests from one identity can both pass. The limit is advisory.

use std::time::Duration;

use rag_store::{RagError, UsageLog};
use thiserror::Error;
use tracing::{debug, warn};

/// Trailing window in which accepted requests are counted.
pub const RATE_WINDOW: Duration = Duration::from_secs(10 * 60);

/// Accepted requests allowed per identity within [`RATE_WINDOW`].
pub const RATE_THRESHOLD: i64 = 5;

#[derive(Debug, Error)]
pub enum RateLimitError {
    #[error("too many requests: {count} in window for {identity:?}")]
    Exceeded { identity: Option<String>, count: i64 },

    #[error("usage store unavailable: {0}")]
    Store(#[from] RagError),
}

/// Rejects the caller if one more request would exceed the threshold,
/// otherwise records the request.
///
/// `None` identities share one anonymous bucket.
pub async fn check_and_record(
    log: &dyn UsageLog,
    identity: Option<&str>,
) -> Result<(), RateLimitError> {
    let count = log.count_recent(identity, RATE_WINDOW).await?;
    if count + 1 > RATE_THRESHOLD {
        warn!(identity = ?identity, count, "rate limit exceeded");
        return Err(RateLimitError::Exceeded {
            identity: identity.map(str::to_owned),
            count,
        });
    }

    log.record(identity).await?;
    debug!(identity = ?identity, count = count + 1, "request admitted");
    Ok(())
}
