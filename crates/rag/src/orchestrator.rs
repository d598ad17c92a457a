//! Retrieval orchestrator facade (spec §4.7, C8).
//!
//! Wires a retriever, and optionally a reranker, cache, query expander,
//! graph store, and hybrid search strategy, into the single
//! `search_and_rerank` pipeline the server calls per request.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use rag_config::{GraphRagConfig, RagConfig};
use rag_core::{
    generate_cache_key, metadata_keys, CacheManager, Filters, GraphStore, HybridSearchStrategy,
    QueryExpansionEngine, Reranker, Retriever, SearchResult,
};

use crate::scoring::ScoringService;

#[derive(Debug, Clone, Default)]
pub struct OrchestratorStats {
    pub total_requests: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub query_expansion_count: u64,
    pub hybrid_search_count: u64,
    pub retrieval_count: u64,
    pub rerank_count: u64,
}

/// Constructor arguments for [`RetrievalOrchestrator`]. Only `retriever` is
/// required; every other collaborator degrades the pipeline stage it backs
/// when absent.
pub struct OrchestratorConfig {
    pub retriever: Arc<dyn Retriever>,
    pub reranker: Option<Arc<dyn Reranker>>,
    pub cache: Option<Arc<dyn CacheManager>>,
    pub query_expander: Option<Arc<dyn QueryExpansionEngine>>,
    pub graph_store: Option<Arc<dyn GraphStore>>,
    pub hybrid: Option<Arc<dyn HybridSearchStrategy>>,
    pub rag_config: RagConfig,
    pub graph_rag_config: GraphRagConfig,
    pub scoring: ScoringService,
}

pub struct RetrievalOrchestrator {
    retriever: Arc<dyn Retriever>,
    reranker: Option<Arc<dyn Reranker>>,
    cache: Option<Arc<dyn CacheManager>>,
    query_expander: Option<Arc<dyn QueryExpansionEngine>>,
    hybrid: Option<Arc<dyn HybridSearchStrategy>>,
    rag_config: RagConfig,
    scoring: ScoringService,
    /// Set at construction when `graph_rag.hybrid_search.auto_enable` is
    /// true, a hybrid strategy exists, and hybrid search is enabled — the
    /// default for `use_graph` when a caller doesn't override it.
    auto_use_graph: bool,

    total_requests: AtomicU64,
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
    query_expansion_count: AtomicU64,
    hybrid_search_count: AtomicU64,
    retrieval_count: AtomicU64,
    rerank_count: AtomicU64,
}

impl RetrievalOrchestrator {
    pub fn new(config: OrchestratorConfig) -> Self {
        let hybrid_enabled = config.graph_rag_config.hybrid_search.enabled && config.graph_store.is_some();
        let auto_use_graph =
            hybrid_enabled && config.graph_rag_config.hybrid_search.auto_enable && config.hybrid.is_some();

        Self {
            retriever: config.retriever,
            reranker: config.reranker,
            cache: config.cache,
            query_expander: config.query_expander,
            hybrid: config.hybrid,
            rag_config: config.rag_config,
            scoring: config.scoring,
            auto_use_graph,
            total_requests: AtomicU64::new(0),
            cache_hits: AtomicU64::new(0),
            cache_misses: AtomicU64::new(0),
            query_expansion_count: AtomicU64::new(0),
            hybrid_search_count: AtomicU64::new(0),
            retrieval_count: AtomicU64::new(0),
            rerank_count: AtomicU64::new(0),
        }
    }

    /// True iff the base retriever reports healthy. Other collaborators
    /// (cache, reranker, query expander) already degrade gracefully inside
    /// `search_and_rerank`, so only the one stage with no fallback gates
    /// health (spec §9 restored `health_check`).
    pub async fn health_check(&self) -> bool {
        self.retriever.health_check().await
    }

    /// `None` when no cache is configured — distinct from a cache present
    /// but empty (spec §6 `GET /cache-stats`).
    pub fn cache_stats(&self) -> Option<rag_core::CacheStats> {
        self.cache.as_ref().map(|c| c.stats())
    }

    pub fn stats(&self) -> OrchestratorStats {
        OrchestratorStats {
            total_requests: self.total_requests.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            cache_misses: self.cache_misses.load(Ordering::Relaxed),
            query_expansion_count: self.query_expansion_count.load(Ordering::Relaxed),
            hybrid_search_count: self.hybrid_search_count.load(Ordering::Relaxed),
            retrieval_count: self.retrieval_count.load(Ordering::Relaxed),
            rerank_count: self.rerank_count.load(Ordering::Relaxed),
        }
    }

    /// Caps the number of `TXT`-typed results to `txt_diversity_cap`,
    /// passing every other file type through unchanged (spec §4.7 step 7).
    fn apply_diversity_cap(&self, results: Vec<SearchResult>) -> Vec<SearchResult> {
        let cap = self.rag_config.txt_diversity_cap;
        let mut txt_seen = 0usize;
        results
            .into_iter()
            .filter(|r| {
                if r.file_type().eq_ignore_ascii_case("txt") {
                    txt_seen += 1;
                    txt_seen <= cap
                } else {
                    true
                }
            })
            .collect()
    }

    fn apply_scoring_weights(&self, results: &mut [SearchResult]) {
        for result in results.iter_mut() {
            let collection = if result.collection().is_empty() { None } else { Some(result.collection()) };
            let file_type = if result.file_type().is_empty() { None } else { Some(result.file_type()) };
            let before = result.score;
            let weighted = self.scoring.apply_weight(before, collection, file_type);
            if weighted != before {
                result.metadata.insert(metadata_keys::SCORE_BEFORE_WEIGHT.to_string(), before.to_string());
                result.score = weighted;
            }
        }
    }

    /// Runs `retriever.search` for each weighted query in parallel and
    /// merges the per-query rankings with RRF, recording how many distinct
    /// queries surfaced each document in `metadata.query_appearances`.
    async fn multi_query_retrieve(
        &self,
        queries: &[rag_core::WeightedQuery],
        top_k: usize,
        filters: Option<&Filters>,
        rrf_k: f32,
    ) -> Vec<SearchResult> {
        let futures = queries.iter().map(|q| {
            let retriever = Arc::clone(&self.retriever);
            let text = q.text.clone();
            let weight = q.weight;
            async move {
                let results = retriever.search(&text, top_k, filters).await.unwrap_or_else(|e| {
                    tracing::warn!(error = %e, query = %text, "multi-query retrieval leg failed");
                    Vec::new()
                });
                (weight, results)
            }
        });
        let per_query: Vec<(f32, Vec<SearchResult>)> = futures::future::join_all(futures).await;

        let mut merged: HashMap<String, SearchResult> = HashMap::new();
        let mut rrf_score: HashMap<String, f32> = HashMap::new();
        let mut appearances: HashMap<String, usize> = HashMap::new();
        let mut order: Vec<String> = Vec::new();

        for (weight, results) in per_query {
            for (rank, result) in results.into_iter().enumerate() {
                let id = result.id.clone();
                if !rrf_score.contains_key(&id) {
                    order.push(id.clone());
                }
                *rrf_score.entry(id.clone()).or_insert(0.0) += weight / (rrf_k + (rank as f32 + 1.0));
                *appearances.entry(id.clone()).or_insert(0) += 1;
                merged.entry(id).or_insert(result);
            }
        }

        // Stable sort on a Vec built in first-appearance order so that
        // documents tied on RRF score keep the order they were first seen
        // in, rather than the randomized order HashMap iteration would give.
        let mut scored: Vec<(String, f32)> =
            order.into_iter().map(|id| { let score = rrf_score[&id]; (id, score) }).collect();
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(top_k);

        scored
            .into_iter()
            .filter_map(|(id, score)| {
                let mut result = merged.remove(&id)?;
                result.score = score;
                let count = appearances.get(&id).copied().unwrap_or(1);
                result
                    .metadata
                    .insert(metadata_keys::QUERY_APPEARANCES.to_string(), count.to_string());
                Some(result)
            })
            .collect()
    }

    pub async fn search_and_rerank(
        &self,
        query: &str,
        top_k: usize,
        filters: Option<&Filters>,
        rerank_enabled: bool,
        query_expansion_enabled: bool,
        use_graph: Option<bool>,
    ) -> Vec<SearchResult> {
        match self.search_and_rerank_inner(query, top_k, filters, rerank_enabled, query_expansion_enabled, use_graph).await {
            Ok(results) => results,
            Err(e) => {
                tracing::error!(error = %e, query, "orchestrator pipeline failed, returning empty");
                Vec::new()
            }
        }
    }

    async fn search_and_rerank_inner(
        &self,
        query: &str,
        top_k: usize,
        filters: Option<&Filters>,
        rerank_enabled: bool,
        query_expansion_enabled: bool,
        use_graph: Option<bool>,
    ) -> rag_core::Result<Vec<SearchResult>> {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
        let effective_use_graph = use_graph.unwrap_or(self.auto_use_graph);
        let fan_out = top_k.saturating_mul(2).max(top_k);

        if let Some(cache) = &self.cache {
            let key = generate_cache_key(query, top_k, filters);
            match cache.get(&key).await {
                Ok(Some(hit)) => {
                    self.cache_hits.fetch_add(1, Ordering::Relaxed);
                    return Ok(self.apply_diversity_cap(hit));
                }
                Ok(None) => {
                    self.cache_misses.fetch_add(1, Ordering::Relaxed);
                }
                Err(e) => {
                    tracing::warn!(error = %e, "cache lookup failed, continuing without cache");
                }
            }
        }

        let expanded = if query_expansion_enabled {
            if let Some(expander) = &self.query_expander {
                match expander.expand(query, None).await {
                    Ok(expanded) => {
                        self.query_expansion_count.fetch_add(1, Ordering::Relaxed);
                        expanded
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, query, "query expansion failed, using unexpanded query");
                        rag_core::ExpandedQuery::unexpanded(query)
                    }
                }
            } else {
                rag_core::ExpandedQuery::unexpanded(query)
            }
        } else {
            rag_core::ExpandedQuery::unexpanded(query)
        };

        let mut results = if effective_use_graph {
            if let Some(hybrid) = &self.hybrid {
                self.hybrid_search_count.fetch_add(1, Ordering::Relaxed);
                match hybrid.search(query, fan_out, filters).await {
                    Ok(result) => result.documents,
                    Err(e) => {
                        tracing::warn!(error = %e, query, "hybrid search failed, returning empty");
                        Vec::new()
                    }
                }
            } else {
                Vec::new()
            }
        } else if expanded.queries.len() <= 1 {
            self.retrieval_count.fetch_add(1, Ordering::Relaxed);
            self.retriever.search(query, fan_out, filters).await?
        } else {
            self.retrieval_count.fetch_add(expanded.queries.len() as u64, Ordering::Relaxed);
            self.multi_query_retrieve(&expanded.queries, fan_out, filters, 60.0).await
        };

        self.apply_scoring_weights(&mut results);

        if rerank_enabled && !results.is_empty() {
            if let Some(reranker) = &self.reranker {
                match reranker.rerank(query, results.clone(), Some(top_k)).await {
                    Ok(reranked) if !reranked.is_empty() => {
                        self.rerank_count.fetch_add(1, Ordering::Relaxed);
                        results = reranked;
                    }
                    Ok(_) => {}
                    Err(e) => {
                        tracing::warn!(error = %e, query, "reranking failed, keeping pre-rerank order");
                    }
                }
            }
        }

        results.truncate(top_k);
        let results = self.apply_diversity_cap(results);

        if let Some(cache) = &self.cache {
            let key = generate_cache_key(query, top_k, filters);
            if let Err(e) = cache.set(&key, results.clone(), None).await {
                tracing::warn!(error = %e, "cache store failed");
            }
        }

        Ok(results)
    }

    /// Legacy single-shot search without reranking, query expansion, or
    /// the graph path — equivalent to `search_and_rerank` with everything
    /// but the base retriever disabled.
    pub async fn search(&self, query: &str, top_k: usize, filters: Option<&Filters>) -> Vec<SearchResult> {
        self.search_and_rerank(query, top_k, filters, false, false, Some(false)).await
    }

    /// Legacy standalone rerank entry point: applies the configured
    /// reranker (if any) to an already-retrieved list.
    pub async fn rerank(&self, query: &str, results: Vec<SearchResult>, top_n: Option<usize>) -> Vec<SearchResult> {
        match &self.reranker {
            Some(reranker) => reranker.rerank(query, results.clone(), top_n).await.unwrap_or(results),
            None => rag_core::fallback_sort(results, top_n),
        }
    }

    /// Legacy document-ingestion passthrough to the underlying retriever.
    pub async fn add_documents(&self, documents: Vec<SearchResult>) -> rag_core::Result<usize> {
        self.retriever.add_documents(documents).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use rag_config::ScoringConfig;

    struct StubRetriever(Vec<SearchResult>);

    #[async_trait]
    impl Retriever for StubRetriever {
        async fn search(&self, _query: &str, top_k: usize, _filters: Option<&Filters>) -> rag_core::Result<Vec<SearchResult>> {
            Ok(self.0.iter().take(top_k).cloned().collect())
        }
    }

    fn orchestrator(results: Vec<SearchResult>) -> RetrievalOrchestrator {
        RetrievalOrchestrator::new(OrchestratorConfig {
            retriever: Arc::new(StubRetriever(results)),
            reranker: None,
            cache: None,
            query_expander: None,
            graph_store: None,
            hybrid: None,
            rag_config: RagConfig::default(),
            graph_rag_config: GraphRagConfig::default(),
            scoring: ScoringService::new(ScoringConfig::default()),
        })
    }

    #[tokio::test]
    async fn plain_search_returns_retriever_results() {
        let docs = vec![SearchResult::new("1", "a", 0.9), SearchResult::new("2", "b", 0.5)];
        let orch = orchestrator(docs);

        let results = orch.search_and_rerank("q", 5, None, false, false, Some(false)).await;

        assert_eq!(results.len(), 2);
        assert_eq!(orch.stats().total_requests, 1);
        assert_eq!(orch.stats().retrieval_count, 1);
    }

    #[tokio::test]
    async fn diversity_cap_limits_txt_results() {
        let mut docs = Vec::new();
        for i in 0..20 {
            docs.push(SearchResult::new(i.to_string(), "x", 1.0).with_metadata(metadata_keys::FILE_TYPE, "TXT"));
        }
        let mut orch = orchestrator(docs);
        orch.rag_config.txt_diversity_cap = 3;

        let results = orch.search_and_rerank("q", 20, None, false, false, Some(false)).await;

        assert_eq!(results.len(), 3);
    }

    #[tokio::test]
    async fn multi_query_retrieve_breaks_rrf_ties_by_first_appearance() {
        struct QueryAwareRetriever;
        #[async_trait]
        impl Retriever for QueryAwareRetriever {
            async fn search(&self, query: &str, _top_k: usize, _filters: Option<&Filters>) -> rag_core::Result<Vec<SearchResult>> {
                let id = if query == "q1" { "b" } else { "a" };
                Ok(vec![SearchResult::new(id, "x", 1.0)])
            }
        }
        let orch = RetrievalOrchestrator::new(OrchestratorConfig {
            retriever: Arc::new(QueryAwareRetriever),
            reranker: None,
            cache: None,
            query_expander: None,
            graph_store: None,
            hybrid: None,
            rag_config: RagConfig::default(),
            graph_rag_config: GraphRagConfig::default(),
            scoring: ScoringService::new(ScoringConfig::default()),
        });

        // "b" (from q1) and "a" (from q2) land on the same rank with equal
        // weight, so their RRF scores tie exactly — the result must keep
        // the order they were first seen in, every time.
        let queries = vec![
            rag_core::WeightedQuery { text: "q1".to_string(), weight: 0.5 },
            rag_core::WeightedQuery { text: "q2".to_string(), weight: 0.5 },
        ];

        for _ in 0..20 {
            let results = orch.multi_query_retrieve(&queries, 5, None, 60.0).await;
            assert_eq!(results.iter().map(|r| r.id.as_str()).collect::<Vec<_>>(), vec!["b", "a"]);
        }
    }

    #[tokio::test]
    async fn failed_pipeline_returns_empty_not_panic() {
        struct FailingRetriever;
        #[async_trait]
        impl Retriever for FailingRetriever {
            async fn search(&self, _query: &str, _top_k: usize, _filters: Option<&Filters>) -> rag_core::Result<Vec<SearchResult>> {
                Err(rag_core::Error::Embedding("boom".to_string()))
            }
        }
        let orch = RetrievalOrchestrator::new(OrchestratorConfig {
            retriever: Arc::new(FailingRetriever),
            reranker: None,
            cache: None,
            query_expander: None,
            graph_store: None,
            hybrid: None,
            rag_config: RagConfig::default(),
            graph_rag_config: GraphRagConfig::default(),
            scoring: ScoringService::new(ScoringConfig::default()),
        });

        let results = orch.search_and_rerank("q", 5, None, false, false, Some(false)).await;

        assert!(results.is_empty());
    }
}
