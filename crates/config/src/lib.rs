//! Layered configuration for the retrieval orchestrator and Self-RAG
//! pipeline: YAML/TOML files plus `RAG__`-prefixed environment variables,
//! decoded into typed structs per spec §6's config schema (never a
//! dynamic map — each recognized provider is a closed enum variant).

pub mod cache;
pub mod error;
pub mod evaluation;
pub mod graph_rag;
pub mod reranking;
pub mod retrieval;
pub mod scoring;
pub mod settings;

pub use cache::{CacheConfig, MemoryCacheConfig, RedisCacheConfig, SemanticCacheConfig};
pub use error::ConfigError;
pub use evaluation::{
    EvaluationConfig, EvaluationThresholds, EvaluatorProvider, InternalEvaluatorConfig,
    RagasEvaluatorConfig,
};
pub use graph_rag::{
    ConnectionPoolConfig, GraphProvider, GraphRagConfig, HybridSearchConfig, Neo4jConfig,
    RetryConfig,
};
pub use reranking::{ApiRerankerConfig, LlmJudgeRerankerConfig, RerankingConfig};
pub use retrieval::{QueryExpansionConfig, RagConfig, RetrievalFilterConfig, SelfRagConfig};
pub use scoring::ScoringConfig;
pub use settings::{load_settings, RuntimeEnvironment, ServerConfig, Settings};
