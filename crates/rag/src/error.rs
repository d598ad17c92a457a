//! Retrieval crate error type.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RagError {
    #[error("embedding error: {0}")]
    Embedding(String),

    #[error("vector store error: {0}")]
    VectorStore(String),

    #[error("search error: {0}")]
    Search(String),

    #[error("reranker error: {0}")]
    Reranker(String),

    #[error("index error: {0}")]
    Index(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("connection error: {0}")]
    Connection(String),
}

impl From<RagError> for rag_core::Error {
    fn from(err: RagError) -> Self {
        match err {
            RagError::Embedding(m) => rag_core::Error::Embedding(m),
            RagError::Reranker(m) => rag_core::Error::Reranker(m),
            other => rag_core::Error::Retriever(other.to_string()),
        }
    }
}
