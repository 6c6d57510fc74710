//! Embedding provider backed by the shared LLM service profiles.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::{EmbeddingsProvider, RagError};
use ai_llm_service::service_profiles::LlmServiceProfiles;

/// Calls the embedding profile of [`LlmServiceProfiles`], optionally checking
/// the returned dimension.
#[derive(Clone)]
pub struct ServiceEmbedder {
    svc: Arc<LlmServiceProfiles>,
    dim: Option<usize>,
}

impl ServiceEmbedder {
    pub fn new(svc: Arc<LlmServiceProfiles>, dim: Option<usize>) -> Self {
        Self { svc, dim }
    }
}

impl EmbeddingsProvider for ServiceEmbedder {
    fn embed<'a>(
        &'a self,
        text: &'a str,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<Vec<f32>, RagError>> + Send + 'a>>
    {
        Box::pin(async move {
            let resp = self.svc.embed(text).await?;
            check_dim(resp, self.dim)
        })
    }
}

fn check_dim(v: Vec<f32>, want: Option<usize>) -> Result<Vec<f32>, RagError> {
    match want {
        Some(want) if v.len() != want => {
            warn!(got = v.len(), want, "embedding dimension mismatch");
            Err(RagError::VectorSizeMismatch { got: v.len(), want })
        }
        _ => {
            debug!(dim = v.len(), "embedding ok");
            Ok(v)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dimension_check_is_optional() {
        assert_eq!(check_dim(vec![0.1; 3], None).unwrap().len(), 3);
        assert_eq!(check_dim(vec![0.1; 3], Some(3)).unwrap().len(), 3);
        assert!(matches!(
            check_dim(vec![0.1; 3], Some(1536)),
            Err(RagError::VectorSizeMismatch { got: 3, want: 1536 })
        ));
    }
}
