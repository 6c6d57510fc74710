//! Process-wide Postgres handle.
//!
//! The pool is created lazily: no connection is opened until the first query,
//! and every caller in the process shares the same pool afterwards.

use std::str::FromStr;
use std::sync::OnceLock;
use std::time::Duration;

use sqlx::PgPool;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use tracing::{debug, info};

use crate::config::StoreConfig;
use crate::errors::RagError;

static SHARED: OnceLock<PgPool> = OnceLock::new();

/// Returns the shared pool, creating it from `cfg` on first call.
///
/// Later calls ignore `cfg` and hand out a clone of the existing pool.
///
/// # Errors
/// Returns `RagError::Sqlx` if the connection string cannot be parsed.
pub fn shared_pool(cfg: &StoreConfig) -> Result<PgPool, RagError> {
    if let Some(pool) = SHARED.get() {
        return Ok(pool.clone());
    }
    let pool = lazy_pool(cfg)?;
    // A concurrent initializer may win; its pool is the one everyone keeps.
    Ok(SHARED.get_or_init(|| pool).clone())
}

/// Builds a new lazily-connecting pool without touching the shared slot.
pub fn lazy_pool(cfg: &StoreConfig) -> Result<PgPool, RagError> {
    let options = PgConnectOptions::from_str(&cfg.database_url)?;
    let pool = PgPoolOptions::new()
        .max_connections(cfg.max_connections)
        .acquire_timeout(Duration::from_secs(10))
        .connect_lazy_with(options);
    info!(max_connections = cfg.max_connections, "postgres pool configured (lazy)");
    Ok(pool)
}

/// Applies the bundled schema migrations.
pub async fn migrate(pool: &PgPool) -> Result<(), RagError> {
    sqlx::migrate!("./migrations").run(pool).await?;
    info!("database migrations applied");
    Ok(())
}

/// Round-trips a trivial query; used by health checks.
pub async fn ping(pool: &PgPool) -> Result<(), RagError> {
    let one: i32 = sqlx::query_scalar("SELECT 1").fetch_one(pool).await?;
    debug!(result = one, "postgres ping");
    Ok(())
}
