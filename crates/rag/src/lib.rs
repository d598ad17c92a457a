//! Retrieval, scoring, caching, and fusion (spec §4, C1-C8).
//!
//! - Dense vector search via Qdrant, sparse BM25 via Tantivy, fused with RRF
//! - Vector+graph hybrid search over an in-memory graph store
//! - LLM-as-judge and HTTP cross-encoder reranking, chainable
//! - LRU and semantic (embedding-similarity) caching
//! - LLM-backed query expansion
//! - `RetrievalOrchestrator` facade tying every stage together

pub mod cache;
pub mod error;
pub mod graph;
pub mod hybrid;
pub mod ollama_embeddings;
pub mod orchestrator;
pub mod query_expansion;
pub mod reranker;
pub mod retriever;
pub mod scoring;
pub mod sparse_search;
pub mod vector_store;

pub use cache::{MemoryCacheManager, SemanticCacheManager};
pub use error::RagError;
pub use graph::InMemoryGraphStore;
pub use hybrid::VectorGraphHybridSearch;
pub use ollama_embeddings::{OllamaEmbedder, OllamaEmbeddingConfig};
pub use orchestrator::{OrchestratorConfig, OrchestratorStats, RetrievalOrchestrator};
pub use query_expansion::LlmQueryExpander;
pub use reranker::{ApiReranker, LlmJudgeReranker, RerankerChain};
pub use retriever::{DenseRetriever, HybridDenseSparseRetriever, SparseRetriever};
pub use scoring::ScoringService;
pub use sparse_search::{SparseConfig, SparseIndex};
pub use vector_store::{VectorDistance, VectorStore, VectorStoreConfig};
