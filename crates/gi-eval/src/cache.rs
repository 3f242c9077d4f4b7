//! Memo of viable evaluations keyed by patch signature

use gi_program::PatchSignature;
use moka::future::Cache;

use crate::evaluation::Evaluation;

/// Signature-addressed evaluation cache
///
/// Structurally identical patches share a signature and therefore one
/// entry. Only viable evaluations are stored.
#[derive(Debug, Clone)]
pub struct EvaluationCache {
    inner: Cache<PatchSignature, Evaluation>,
}

impl EvaluationCache {
    /// Create new cache with max capacity
    #[inline]
    #[must_use]
    pub fn new(max_capacity: u64) -> Self {
        Self {
            inner: Cache::new(max_capacity),
        }
    }

    /// Cached evaluation for `signature`
    pub async fn get(&self, signature: &PatchSignature) -> Option<Evaluation> {
        self.inner.get(signature).await
    }

    /// Store `evaluation` if it is viable
    pub async fn insert(&self, signature: PatchSignature, evaluation: Evaluation) {
        if evaluation.is_viable() {
            self.inner.insert(signature, evaluation).await;
        }
    }

    /// Check if an evaluation is cached
    pub async fn contains(&self, signature: &PatchSignature) -> bool {
        self.inner.get(signature).await.is_some()
    }
}

impl Default for EvaluationCache {
    /// Create cache with default capacity (10,000 entries)
    fn default() -> Self {
        Self::new(10_000)
    }
}
