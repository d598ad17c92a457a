//! Translates a loaded [`rag_config::Settings`] into the collaborator set
//! `RetrievalOrchestrator`/`RagPipeline` need (spec §6 config schema).
//!
//! Every concrete type choice here is a deployment decision, not a spec
//! requirement — documented in DESIGN.md. Construction failures (a missing
//! API key, an unbuildable HTTP client) surface once at startup, never per
//! request, per spec §7.

use std::sync::Arc;
use std::time::Duration;

use rag_config::{CacheConfig, GraphRagConfig, RerankingConfig, Settings};
use rag_core::{CacheManager, Evaluator, GraphStore, QueryExpansionEngine, Reranker, Retriever};
use rag_eval::{InternalEvaluator, RagasEvaluator};
use rag_llm::{LlmConfig, LlmFactory, LlmProvider, LlmProviderConfig, OllamaBackend};
use rag_retrieval::{
    ApiReranker, InMemoryGraphStore, LlmJudgeReranker, LlmQueryExpander, MemoryCacheManager,
    ScoringService, SemanticCacheManager, SparseIndex, SparseRetriever, VectorGraphHybridSearch,
};

use crate::ServerError;

/// The one retrieval backend this deployment boots with: BM25 over an
/// in-process Tantivy index (spec §4.2) — no Qdrant or embedding endpoint
/// required, so the server always starts.
pub fn build_retriever() -> Result<Arc<dyn Retriever>, ServerError> {
    let index = SparseIndex::new(rag_retrieval::SparseConfig::default())
        .map_err(|e| ServerError::Configuration(format!("failed to build sparse index: {e}")))?;
    Ok(Arc::new(SparseRetriever::new(Arc::new(index), "default")))
}

pub fn build_cache(config: &CacheConfig) -> Option<Arc<dyn CacheManager>> {
    match config {
        CacheConfig::Memory(c) => Some(Arc::new(MemoryCacheManager::new(c.maxsize, Some(c.ttl)))),
        CacheConfig::Semantic(c) => {
            Some(Arc::new(SemanticCacheManager::new(c.max_entries, c.similarity_threshold, Some(c.ttl))))
        }
        // No Redis client lives in this workspace's dependency stack
        // (DESIGN.md); a redis-selecting config degrades to no cache at
        // all rather than failing startup.
        CacheConfig::Redis(_) => {
            tracing::warn!("cache.provider=redis has no implementation in this build, running without a cache");
            None
        }
    }
}

/// Shared local judge backend for reranking, query expansion, and internal
/// evaluation — the same `OllamaBackend::new(LlmConfig::default())` the
/// `evaluate` CLI already uses, so this isn't a second code path.
fn build_judge_backend() -> Result<Arc<OllamaBackend>, ServerError> {
    OllamaBackend::new(LlmConfig::default())
        .map(Arc::new)
        .map_err(|e| ServerError::Configuration(format!("failed to build judge backend: {e}")))
}

pub fn build_reranker(config: &RerankingConfig) -> Result<Arc<dyn Reranker>, ServerError> {
    match config {
        RerankingConfig::GeminiFlash(c) | RerankingConfig::OpenaiLlm(c) => {
            let backend = build_judge_backend()?;
            Ok(Arc::new(LlmJudgeReranker::new(backend, c.max_documents, c.doc_preview_chars)))
        }
        RerankingConfig::Jina(c) => Ok(Arc::new(ApiReranker::new(
            "https://api.jina.ai/v1/rerank",
            std::env::var("JINA_API_KEY").ok(),
            c.model.clone(),
            Duration::from_secs(c.timeout),
            "jina",
        ))),
        RerankingConfig::JinaColbert(c) => Ok(Arc::new(ApiReranker::new(
            "https://api.jina.ai/v1/rerank",
            std::env::var("JINA_API_KEY").ok(),
            c.model.clone(),
            Duration::from_secs(c.timeout),
            "jina-colbert",
        ))),
    }
}

pub fn build_query_expander(enabled: bool) -> Result<Option<Arc<dyn QueryExpansionEngine>>, ServerError> {
    if !enabled {
        return Ok(None);
    }
    let backend = build_judge_backend()?;
    Ok(Some(Arc::new(LlmQueryExpander::new(backend))))
}

/// Only `networkx` (the in-memory graph store) has a Rust implementation in
/// this build — a `neo4j`-selecting config still gets the in-memory store
/// rather than failing startup (DESIGN.md: no neo4rs-equivalent dependency
/// adopted).
pub fn build_graph_store(config: &GraphRagConfig) -> Option<Arc<dyn GraphStore>> {
    if !config.enabled {
        return None;
    }
    if matches!(config.provider, rag_config::GraphProvider::Neo4j) {
        tracing::warn!("graph_rag.provider=neo4j has no implementation in this build, using the in-memory graph store");
    }
    Some(Arc::new(InMemoryGraphStore::new()))
}

pub fn build_hybrid(
    retriever: Arc<dyn Retriever>,
    graph_store: Option<Arc<dyn GraphStore>>,
    config: &GraphRagConfig,
) -> Option<Arc<dyn rag_core::HybridSearchStrategy>> {
    if !config.hybrid_search.enabled || graph_store.is_none() {
        return None;
    }
    Some(Arc::new(VectorGraphHybridSearch::new(
        retriever,
        graph_store,
        config.hybrid_search.vector_weight,
        config.hybrid_search.graph_weight,
        config.hybrid_search.rrf_k,
    )))
}

pub fn build_scoring(config: rag_config::ScoringConfig) -> ScoringService {
    ScoringService::new(config)
}

/// Picks the generation provider from whichever API key is present in the
/// environment, falling back to a local Ollama model (spec §6 env vars:
/// `OPENAI_API_KEY`; Claude via `ANTHROPIC_API_KEY` per `ClaudeConfig`'s own
/// default). Generation gets the strongest available model; the judge
/// tasks above stay on the cheaper local backend.
pub fn build_generator() -> Result<Arc<dyn rag_core::Generator>, ServerError> {
    let provider_config = if let Ok(api_key) = std::env::var("OPENAI_API_KEY") {
        LlmProviderConfig {
            provider: LlmProvider::OpenAI,
            api_key: Some(api_key),
            endpoint: None,
            model: "gpt-4o-mini".to_string(),
            max_tokens: 1024,
            temperature: 0.7,
        }
    } else if let Ok(api_key) = std::env::var("ANTHROPIC_API_KEY") {
        LlmProviderConfig {
            provider: LlmProvider::Claude,
            api_key: Some(api_key),
            endpoint: None,
            model: "claude-sonnet-4-20250514".to_string(),
            max_tokens: 1024,
            temperature: 0.7,
        }
    } else {
        LlmProviderConfig {
            provider: LlmProvider::Ollama,
            api_key: None,
            endpoint: None,
            model: "llama3".to_string(),
            max_tokens: 1024,
            temperature: 0.7,
        }
    };

    LlmFactory::create(&provider_config)
        .map_err(|e| ServerError::Configuration(format!("failed to build generator: {e}")))
}

/// Both evaluators are always built — `POST /admin/evaluate` picks between
/// them per request via its own `provider` field (spec §6), not at startup.
pub type EvaluatorPair = (Arc<dyn Evaluator>, Arc<dyn Evaluator>);

pub fn build_evaluators(settings: &Settings) -> Result<EvaluatorPair, ServerError> {
    let backend = build_judge_backend()?;
    let internal: Arc<dyn Evaluator> = Arc::new(InternalEvaluator::new(backend));
    let ragas: Arc<dyn Evaluator> = Arc::new(RagasEvaluator::new(settings.evaluation.ragas.clone()));
    Ok((internal, ragas))
}
