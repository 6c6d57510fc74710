//! Postgres/pgvector storage for the chat backend.
//!
//! This crate provides:
//! - A lazily-connected, process-wide pool ([`pool::shared_pool`])
//! - The usage log behind the rate limiter ([`UsageLog`])
//! - Token-budgeted nearest-chunk retrieval ([`ChunkIndex`])
//! - The embedding seam ([`EmbeddingsProvider`])
//!
//! Every store has an in-memory twin in [`memory`] with matching semantics.

pub mod budget;
mod config;
mod embed;
mod errors;
pub mod memory;
pub mod pool;
mod record;
mod retrieve;
mod usage;

pub use config::StoreConfig;
pub use embed::{EmbeddingsProvider, service::ServiceEmbedder};
pub use errors::RagError;
pub use record::{ContextChunk, StoredChunk, UsageEvent};
pub use retrieve::{ChunkIndex, PgChunkIndex, vector_literal};
pub use usage::{PgUsageLog, UsageLog};

pub use sqlx::PgPool;
