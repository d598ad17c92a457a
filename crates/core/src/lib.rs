//! Core types and traits shared by every crate in the workspace.
//!
//! - [`model`] — the per-request data model (spec §3)
//! - [`traits`] — one async trait per pluggable component (spec §4, §6)
//! - [`error`] — the crate-wide error type

pub mod error;
pub mod model;
pub mod traits;

pub use error::{Error, Result};
pub use model::{
    metadata_keys, DebugDocument, DebugTrace, Entity, EvaluationResult, ExpandedQuery,
    FeedbackData, GraphSearchResult, HybridSearchResult, QueryComplexity, Rating, Relation,
    SearchResult, SelfRagTrace, WeightedQuery,
};
pub use traits::{
    fallback_sort, generate_cache_key, CacheManager, CacheStats, ChatTurn, Embedder, Evaluator,
    FeedbackStore, Filters, Generator, GraphStats, GraphStore, HybridSearchStrategy,
    QueryExpansionEngine, Reranker, RerankerStats, Retriever, SessionStore,
};
