//! Hybrid vector+graph search strategy interface (spec §4.5, C6).

use async_trait::async_trait;

use crate::model::HybridSearchResult;
use crate::traits::retriever::Filters;
use crate::Result;

#[async_trait]
pub trait HybridSearchStrategy: Send + Sync {
    async fn search(
        &self,
        query: &str,
        top_k: usize,
        filters: Option<&Filters>,
    ) -> Result<HybridSearchResult>;

    /// Current `(vector_weight, graph_weight)`, already normalized to sum to
    /// 1.0 (or `(1.0, 0.0)` if both configured weights are zero).
    fn weights(&self) -> (f32, f32);
}
