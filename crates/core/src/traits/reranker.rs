//! Reranker interface (spec §4.4, C5).
//!
//! Cross-encoder, late-interaction, and LLM-as-judge rerankers all implement
//! this trait. On any failure a reranker must degrade to the input list
//! sorted by existing score, truncated to `top_n` — never raise.

use async_trait::async_trait;

use crate::model::SearchResult;
use crate::Result;

#[derive(Debug, Clone, Default)]
pub struct RerankerStats {
    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
    pub total_processing_time_ms: u64,
    pub total_tokens: Option<u64>,
}

impl RerankerStats {
    pub fn avg_processing_time_ms(&self) -> f64 {
        if self.total_requests == 0 {
            0.0
        } else {
            self.total_processing_time_ms as f64 / self.total_requests as f64
        }
    }
}

#[async_trait]
pub trait Reranker: Send + Sync {
    async fn rerank(
        &self,
        query: &str,
        results: Vec<SearchResult>,
        top_n: Option<usize>,
    ) -> Result<Vec<SearchResult>>;

    /// True iff the reranker is deterministic for a given (query, docs) pair
    /// — API-based cross-encoders and ColBERT are; LLM-as-judge is not.
    fn supports_caching(&self) -> bool;

    fn stats(&self) -> RerankerStats {
        RerankerStats::default()
    }

    fn name(&self) -> &str;
}

/// Degrade-to-identity fallback shared by every reranker implementation:
/// sort by existing score descending, truncate to `top_n`.
pub fn fallback_sort(mut results: Vec<SearchResult>, top_n: Option<usize>) -> Vec<SearchResult> {
    results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    if let Some(n) = top_n {
        results.truncate(n);
    }
    results
}
