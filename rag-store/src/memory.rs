//! In-process stores with the same semantics as the Postgres ones.
//!
//! Used by tests and local runs without a database.

use std::cmp::Ordering;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::budget::take_within_budget;
use crate::errors::RagError;
use crate::record::{ContextChunk, StoredChunk, UsageEvent};
use crate::retrieve::ChunkIndex;
use crate::usage::UsageLog;

fn locked<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Usage log held in memory. The clock can be frozen to make windows testable.
#[derive(Debug, Default)]
pub struct MemoryUsageLog {
    events: Mutex<Vec<UsageEvent>>,
    frozen_now: Option<DateTime<Utc>>,
}

impl MemoryUsageLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// A log whose "now" is fixed at `now`.
    pub fn frozen_at(now: DateTime<Utc>) -> Self {
        Self {
            events: Mutex::default(),
            frozen_now: Some(now),
        }
    }

    /// Inserts an event with an explicit timestamp (seeding history).
    pub fn push_event(&self, identity: Option<&str>, created_at: DateTime<Utc>) {
        locked(&self.events).push(UsageEvent {
            ip_address: identity.map(str::to_owned),
            created_at,
        });
    }

    /// Snapshot of all recorded events in insertion order.
    pub fn events(&self) -> Vec<UsageEvent> {
        locked(&self.events).clone()
    }

    fn now(&self) -> DateTime<Utc> {
        self.frozen_now.unwrap_or_else(Utc::now)
    }
}

#[async_trait]
impl UsageLog for MemoryUsageLog {
    async fn count_recent(&self, identity: Option<&str>, window: Duration) -> Result<i64, RagError> {
        let window = chrono::Duration::from_std(window)
            .map_err(|e| RagError::Config(format!("window out of range: {e}")))?;
        let cutoff = self.now() - window;
        let count = locked(&self.events)
            .iter()
            .filter(|e| e.ip_address.as_deref() == identity && e.created_at > cutoff)
            .count();
        Ok(count as i64)
    }

    async fn record(&self, identity: Option<&str>) -> Result<(), RagError> {
        self.push_event(identity, self.now());
        Ok(())
    }
}

/// Chunk index held in memory, ranked by cosine distance like pgvector's `<=>`.
#[derive(Debug, Default)]
pub struct MemoryChunkIndex {
    chunks: Vec<StoredChunk>,
}

impl MemoryChunkIndex {
    pub fn new(chunks: Vec<StoredChunk>) -> Self {
        Self { chunks }
    }
}

#[async_trait]
impl ChunkIndex for MemoryChunkIndex {
    async fn nearest_within_budget(
        &self,
        query: &[f32],
        token_budget: i64,
    ) -> Result<Vec<ContextChunk>, RagError> {
        let mut ranked = Vec::with_capacity(self.chunks.len());
        for chunk in &self.chunks {
            if chunk.embedding.len() != query.len() {
                return Err(RagError::VectorSizeMismatch {
                    got: query.len(),
                    want: chunk.embedding.len(),
                });
            }
            ranked.push(ContextChunk {
                text: chunk.text.clone(),
                file_path: chunk.file_path.clone(),
                n_tokens: chunk.n_tokens,
                distance: cosine_distance(&chunk.embedding, query),
            });
        }
        ranked.sort_by(|a, b| nan_last(a.distance, b.distance));
        Ok(take_within_budget(ranked, token_budget, |c| c.n_tokens))
    }
}

/// Ascending order with NaN after every number, matching Postgres `ORDER BY`.
fn nan_last(a: f64, b: f64) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (false, false) => a.total_cmp(&b),
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
    }
}

/// `1 - cos(a, b)`; NaN when either vector has zero norm, as in pgvector.
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f64 {
    let (mut dot, mut na, mut nb) = (0f64, 0f64, 0f64);
    for (x, y) in a.iter().zip(b) {
        let (x, y) = (f64::from(*x), f64::from(*y));
        dot += x * y;
        na += x * x;
        nb += y * y;
    }
    if na == 0.0 || nb == 0.0 {
        return f64::NAN;
    }
    1.0 - dot / (na.sqrt() * nb.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(path: &str, n_tokens: i64, embedding: Vec<f32>) -> StoredChunk {
        StoredChunk {
            text: format!("text of {path}"),
            file_path: path.into(),
            n_tokens,
            embedding,
        }
    }

    #[tokio::test]
    async fn window_excludes_old_and_edge_events() {
        let now = Utc::now();
        let log = MemoryUsageLog::frozen_at(now);
        let window = Duration::from_secs(600);
        log.push_event(Some("1.2.3.4"), now - chrono::Duration::seconds(601));
        log.push_event(Some("1.2.3.4"), now - chrono::Duration::seconds(600));
        log.push_event(Some("1.2.3.4"), now - chrono::Duration::seconds(599));
        log.push_event(Some("5.6.7.8"), now);

        assert_eq!(log.count_recent(Some("1.2.3.4"), window).await.unwrap(), 1);
        assert_eq!(log.count_recent(None, window).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn anonymous_events_share_a_bucket() {
        let log = MemoryUsageLog::new();
        log.record(None).await.unwrap();
        log.record(None).await.unwrap();
        log.record(Some("9.9.9.9")).await.unwrap();
        let window = Duration::from_secs(600);
        assert_eq!(log.count_recent(None, window).await.unwrap(), 2);
        assert_eq!(log.events().len(), 3);
    }

    #[tokio::test]
    async fn retrieval_ranks_then_applies_budget() {
        let index = MemoryChunkIndex::new(vec![
            chunk("far.txt", 700, vec![0.0, 1.0]),
            chunk("near.txt", 500, vec![1.0, 0.0]),
            chunk("mid.txt", 600, vec![1.0, 1.0]),
        ]);
        let got = index.nearest_within_budget(&[1.0, 0.0], 1700).await.unwrap();
        let paths: Vec<_> = got.iter().map(|c| c.file_path.as_str()).collect();
        assert_eq!(paths, ["near.txt", "mid.txt"]);
        assert!(got[0].distance < got[1].distance);
    }

    #[tokio::test]
    async fn oversized_nearest_chunk_gives_empty_context() {
        let index = MemoryChunkIndex::new(vec![
            chunk("big.txt", 1800, vec![1.0, 0.0]),
            chunk("small.txt", 10, vec![0.0, 1.0]),
        ]);
        let got = index.nearest_within_budget(&[1.0, 0.0], 1700).await.unwrap();
        assert!(got.is_empty());
    }

    #[tokio::test]
    async fn zero_norm_chunk_ranks_after_every_other() {
        let index = MemoryChunkIndex::new(vec![
            chunk("zero.txt", 1700, vec![0.0, 0.0]),
            chunk("near.txt", 100, vec![1.0, 0.0]),
            chunk("far.txt", 100, vec![-1.0, 0.0]),
        ]);
        let got = index.nearest_within_budget(&[1.0, 0.0], 1700).await.unwrap();
        let paths: Vec<_> = got.iter().map(|c| c.file_path.as_str()).collect();
        assert_eq!(paths, ["near.txt", "far.txt"]);
    }

    #[test]
    fn nan_sorts_last_regardless_of_sign() {
        let mut v = vec![f64::NAN, 1.0, -f64::NAN, 0.0];
        v.sort_by(|a, b| nan_last(*a, *b));
        assert_eq!(&v[..2], &[0.0, 1.0]);
        assert!(v[2].is_nan() && v[3].is_nan());
    }

    #[tokio::test]
    async fn dimension_mismatch_is_an_error() {
        let index = MemoryChunkIndex::new(vec![chunk("a.txt", 1, vec![1.0, 0.0])]);
        let err = index.nearest_within_budget(&[1.0], 10).await.unwrap_err();
        assert!(matches!(err, RagError::VectorSizeMismatch { got: 1, want: 2 }));
    }

    #[test]
    fn cosine_distance_matches_pgvector() {
        assert!(cosine_distance(&[1.0, 0.0], &[1.0, 0.0]).abs() < 1e-12);
        assert!((cosine_distance(&[1.0, 0.0], &[0.0, 1.0]) - 1.0).abs() < 1e-12);
        assert!((cosine_distance(&[1.0, 0.0], &[-1.0, 0.0]) - 2.0).abs() < 1e-12);
        assert!(cosine_distance(&[0.0, 0.0], &[1.0, 0.0]).is_nan());
        assert!(cosine_distance(&[1.0, 0.0], &[0.0, 0.0]).is_sign_positive());
    }
}
