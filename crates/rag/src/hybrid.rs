//! Hybrid vector+graph search (spec §4.5, C6).
//!
//! Parallel dense vector search and knowledge-graph search, fused with
//! weighted Reciprocal Rank Fusion into one ranked list.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use rag_core::{
    metadata_keys, Filters, GraphStore, HybridSearchResult, HybridSearchStrategy, Result,
    Retriever, SearchResult,
};

pub struct VectorGraphHybridSearch {
    retriever: Arc<dyn Retriever>,
    graph_store: Option<Arc<dyn GraphStore>>,
    vector_weight: f32,
    graph_weight: f32,
    rrf_k: f32,
}

impl VectorGraphHybridSearch {
    pub fn new(
        retriever: Arc<dyn Retriever>,
        graph_store: Option<Arc<dyn GraphStore>>,
        vector_weight: f32,
        graph_weight: f32,
        rrf_k: f32,
    ) -> Self {
        Self { retriever, graph_store, vector_weight, graph_weight, rrf_k }
    }

    async fn graph_search_as_results(&self, query: &str, top_k: usize) -> Vec<SearchResult> {
        let Some(graph_store) = &self.graph_store else { return Vec::new() };
        let graph_result = match graph_store.search(query, None, top_k).await {
            Ok(r) => r,
            Err(e) => {
                tracing::error!(error = %e, "graph search failed, degrading to vector-only");
                return Vec::new();
            }
        };

        graph_result
            .entities
            .iter()
            .enumerate()
            .filter_map(|(rank, entity)| {
                let doc_id = entity.doc_id()?;
                Some(
                    SearchResult::new(
                        doc_id,
                        format!("[graph] {}", entity.name),
                        graph_result.score * (1.0 / (rank as f32 + 1.0)),
                    )
                    .with_metadata("source", "graph")
                    .with_metadata("entity_id", entity.id.clone())
                    .with_metadata("entity_type", entity.entity_type.clone()),
                )
            })
            .collect()
    }
}

fn rank_map(results: &[SearchResult]) -> HashMap<String, usize> {
    results.iter().enumerate().map(|(i, r)| (r.id.clone(), i + 1)).collect()
}

#[async_trait]
impl HybridSearchStrategy for VectorGraphHybridSearch {
    async fn search(&self, query: &str, top_k: usize, filters: Option<&Filters>) -> Result<HybridSearchResult> {
        if top_k == 0 {
            return Ok(HybridSearchResult::default());
        }

        let (mut v_weight, mut g_weight) = (self.vector_weight, self.graph_weight);
        let total = v_weight + g_weight;
        if total > 0.0 {
            v_weight /= total;
            g_weight /= total;
        } else {
            v_weight = 1.0;
            g_weight = 0.0;
        }

        let vector_results = self.retriever.search(query, top_k * 2, filters).await?;
        let vector_count = vector_results.len();

        let graph_results = if g_weight > 0.0 && self.graph_store.is_some() {
            self.graph_search_as_results(query, top_k * 2).await
        } else {
            Vec::new()
        };
        let graph_count = graph_results.len();

        let vector_ranks = rank_map(&vector_results);
        let graph_ranks = rank_map(&graph_results);

        let mut by_id: HashMap<String, SearchResult> = HashMap::new();
        let mut order: Vec<String> = Vec::new();
        for result in vector_results.into_iter().chain(graph_results) {
            if !by_id.contains_key(&result.id) {
                order.push(result.id.clone());
            }
            by_id.entry(result.id.clone()).or_insert(result);
        }

        // Iterate in first-appearance order, not HashMap key order, so ties
        // on rrf_score break by insertion order under the stable sort below.
        let mut rrf_scores: Vec<(String, f32)> = order
            .iter()
            .map(|id| {
                let v_rank = vector_ranks.get(id.as_str());
                let g_rank = graph_ranks.get(id.as_str());
                let mut score = 0.0;
                if let Some(rank) = v_rank {
                    score += v_weight / (self.rrf_k + *rank as f32);
                }
                if let Some(rank) = g_rank {
                    score += g_weight / (self.rrf_k + *rank as f32);
                }
                (id.clone(), score)
            })
            .collect();

        rrf_scores.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        rrf_scores.truncate(top_k);

        let documents: Vec<SearchResult> = rrf_scores
            .into_iter()
            .filter_map(|(id, rrf_score)| {
                let mut doc = by_id.remove(&id)?;
                doc.metadata.insert(metadata_keys::HYBRID_SCORE.to_string(), rrf_score.to_string());
                if let Some(rank) = vector_ranks.get(id.as_str()) {
                    doc.metadata.insert(metadata_keys::VECTOR_RANK.to_string(), rank.to_string());
                }
                if let Some(rank) = graph_ranks.get(id.as_str()) {
                    doc.metadata.insert(metadata_keys::GRAPH_RANK.to_string(), rank.to_string());
                }
                doc.score = rrf_score;
                Some(doc)
            })
            .collect();

        let total_score = if documents.is_empty() {
            0.0
        } else {
            documents.iter().map(|d| d.score).sum::<f32>() / documents.len() as f32
        };

        Ok(HybridSearchResult {
            documents,
            vector_count,
            graph_count,
            total_score,
            metadata: HashMap::from([
                ("vector_weight".to_string(), v_weight.to_string()),
                ("graph_weight".to_string(), g_weight.to_string()),
                ("rrf_k".to_string(), self.rrf_k.to_string()),
            ]),
        })
    }

    fn weights(&self) -> (f32, f32) {
        (self.vector_weight, self.graph_weight)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Arc;

    struct StubRetriever(Vec<SearchResult>);

    #[async_trait]
    impl Retriever for StubRetriever {
        async fn search(&self, _query: &str, top_k: usize, _filters: Option<&Filters>) -> Result<Vec<SearchResult>> {
            Ok(self.0.iter().take(top_k).cloned().collect())
        }
    }

    #[tokio::test]
    async fn top_k_zero_returns_empty() {
        let hybrid = VectorGraphHybridSearch::new(Arc::new(StubRetriever(vec![])), None, 0.6, 0.4, 60.0);
        let result = hybrid.search("q", 0, None).await.unwrap();
        assert!(result.documents.is_empty());
    }

    #[tokio::test]
    async fn vector_only_when_no_graph_store() {
        let docs = vec![SearchResult::new("a", "x", 0.9), SearchResult::new("b", "y", 0.5)];
        let hybrid = VectorGraphHybridSearch::new(Arc::new(StubRetriever(docs)), None, 0.6, 0.4, 60.0);
        let result = hybrid.search("q", 2, None).await.unwrap();
        assert_eq!(result.graph_count, 0);
        assert_eq!(result.documents.len(), 2);
        assert_eq!(result.documents[0].id, "a");
    }

    #[tokio::test]
    async fn zero_weights_force_vector_only() {
        let docs = vec![SearchResult::new("a", "x", 0.9)];
        let hybrid = VectorGraphHybridSearch::new(Arc::new(StubRetriever(docs)), None, 0.0, 0.0, 60.0);
        let result = hybrid.search("q", 1, None).await.unwrap();
        assert_eq!(result.metadata.get("vector_weight").unwrap(), "1");
    }

    #[tokio::test]
    async fn rrf_ties_break_by_first_appearance_order() {
        // "a" only in vector results at rank 1, "b" only in graph results at
        // rank 1: with equal weights their RRF contributions tie exactly.
        let vector_docs = vec![SearchResult::new("a", "x", 0.9)];
        let graph_store = crate::graph::InMemoryGraphStore::new();
        graph_store
            .add_entity(rag_core::Entity {
                id: "b".to_string(),
                name: "b".to_string(),
                entity_type: "topic".to_string(),
                properties: HashMap::from([("doc_id".to_string(), "b".to_string())]),
            })
            .await
            .unwrap();
        let hybrid = VectorGraphHybridSearch::new(
            Arc::new(StubRetriever(vector_docs)),
            Some(Arc::new(graph_store)),
            0.5,
            0.5,
            60.0,
        );

        for _ in 0..20 {
            let result = hybrid.search("b", 5, None).await.unwrap();
            let ids: Vec<_> = result.documents.iter().map(|d| d.id.as_str()).collect();
            assert_eq!(ids, vec!["a", "b"]);
        }
    }
}
