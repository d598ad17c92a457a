//! Crate-wide error type.
//!
//! Individual components (cache, retriever, reranker, graph store, ...) each
//! define their own `thiserror` enum and convert into this one at the crate
//! boundary. The orchestrator and the Self-RAG pipeline never propagate
//! these further — they convert every `Err` into a degraded, neutral value
//! (empty list, neutral evaluation) at their own boundary instead.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("retriever error: {0}")]
    Retriever(String),

    #[error("graph store error: {0}")]
    Graph(String),

    #[error("reranker error: {0}")]
    Reranker(String),

    #[error("cache error: {0}")]
    Cache(String),

    #[error("query expansion error: {0}")]
    QueryExpansion(String),

    #[error("evaluation error: {0}")]
    Evaluation(String),

    #[error("generation error: {0}")]
    Generation(String),

    #[error("embedding error: {0}")]
    Embedding(String),

    #[error("session error: {0}")]
    Session(String),

    #[error("feedback error: {0}")]
    Feedback(String),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("not found: {0}")]
    NotFound(String),
}
