//! One capability per file, mirroring the spec's component boundaries.

pub mod cache;
pub mod embedder;
pub mod evaluator;
pub mod feedback;
pub mod generator;
pub mod graph;
pub mod hybrid;
pub mod query_expansion;
pub mod reranker;
pub mod retriever;
pub mod session;

pub use cache::{generate_cache_key, CacheManager, CacheStats};
pub use embedder::Embedder;
pub use evaluator::Evaluator;
pub use feedback::FeedbackStore;
pub use generator::Generator;
pub use graph::{GraphStats, GraphStore};
pub use hybrid::HybridSearchStrategy;
pub use query_expansion::QueryExpansionEngine;
pub use reranker::{fallback_sort, Reranker, RerankerStats};
pub use retriever::{Filters, Retriever};
pub use session::{ChatTurn, SessionStore};
