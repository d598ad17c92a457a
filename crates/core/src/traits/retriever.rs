//! Vector retriever interface (spec §4.2, C3).
//!
//! Two reference backends are expected to implement this trait — a
//! dense-only backend (Chroma-like) and a hybrid dense+sparse backend
//! (Weaviate-like) — behind the exact same interface. Which one is active
//! is a wiring decision, never a runtime branch inside the orchestrator.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::model::SearchResult;
use crate::Result;

/// Conjunctive metadata filter: every pair must match.
pub type Filters = HashMap<String, String>;

#[async_trait]
pub trait Retriever: Send + Sync {
    /// Search for up to `top_k` documents, ordered by descending similarity.
    ///
    /// Must never raise to the caller on a backend failure — the retriever
    /// returns `[]` and logs (spec §4.2 Failure). Embedding failures are the
    /// one exception: those propagate so the orchestrator's catch-all can
    /// account for them.
    async fn search(
        &self,
        query: &str,
        top_k: usize,
        filters: Option<&Filters>,
    ) -> Result<Vec<SearchResult>>;

    async fn health_check(&self) -> bool {
        true
    }

    /// Optional: bulk-insert pre-embedded documents. Retrievers that don't
    /// support ingestion leave this as the default `Err`.
    async fn add_documents(&self, _documents: Vec<SearchResult>) -> Result<usize> {
        Err(crate::Error::Retriever(
            "this retriever does not support add_documents".to_string(),
        ))
    }
}
