use std::sync::Arc;

use ai_llm_service::{AiLlmError, LlmServiceProfiles};
use contextor::{ChatPipeline, ContextorConfig};
use rag_store::{
    PgChunkIndex, PgPool, PgUsageLog, RagError, ServiceEmbedder, StoreConfig, UsageLog, pool,
};
use thiserror::Error;
use tracing::info;

/// Startup failures while wiring the shared state.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("store configuration: {0}")]
    Store(#[from] RagError),

    #[error("LLM configuration: {0}")]
    Llm(#[from] AiLlmError),
}

/// Shared state for all HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    /// Usage log consulted by the rate limiter.
    pub usage: Arc<dyn UsageLog>,
    /// Embed, retrieve, assemble and stream.
    pub pipeline: ChatPipeline,
    /// Provider profiles probed by `/health` (absent in tests).
    pub llm: Option<Arc<LlmServiceProfiles>>,
    /// Database pinged by `/health` (absent in tests).
    pub db: Option<PgPool>,
}

impl AppState {
    /// State without health targets.
    pub fn new(usage: Arc<dyn UsageLog>, pipeline: ChatPipeline) -> Self {
        Self {
            usage,
            pipeline,
            llm: None,
            db: None,
        }
    }

    /// Load shared state from environment variables.
    ///
    /// The database pool connects lazily; nothing is dialled here unless
    /// `DATABASE_RUN_MIGRATIONS` is set.
    pub async fn from_env() -> Result<Self, ConfigError> {
        let store_cfg = StoreConfig::from_env()?;
        let db = pool::shared_pool(&store_cfg)?;
        if store_cfg.run_migrations {
            pool::migrate(&db).await?;
        }

        let llm = Arc::new(LlmServiceProfiles::from_env()?);
        let embedder = Arc::new(ServiceEmbedder::new(llm.clone(), store_cfg.embedding_dim));
        let pipeline = ChatPipeline::new(
            embedder,
            Arc::new(PgChunkIndex::new(db.clone())),
            llm.clone(),
            ContextorConfig::from_env(),
        );

        info!(
            max_connections = store_cfg.max_connections,
            embedding_dim = ?store_cfg.embedding_dim,
            "application state ready"
        );

        Ok(Self {
            usage: Arc::new(PgUsageLog::new(db.clone())),
            pipeline,
            llm: Some(llm),
            db: Some(db),
        })
    }
}
