//! Vector retriever backends (spec §4.2, C3).
//!
//! Two backends share [`rag_core::Retriever`]: [`DenseRetriever`] embeds the
//! query and searches Qdrant alone; [`HybridDenseSparseRetriever`] also
//! queries a BM25 sparse index and fuses both with RRF. Which one is wired
//! in is a deployment decision made by whoever constructs the orchestrator.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use rag_core::{metadata_keys, Embedder, Filters, Result, Retriever, SearchResult};

use crate::sparse_search::SparseIndex;
use crate::vector_store::{Document, SearchFilter, VectorStore};

fn to_search_filter(filters: Option<&Filters>) -> Option<SearchFilter> {
    let filters = filters?;
    let mut filter = SearchFilter::new();
    if let Some(category) = filters.get("category") {
        filter = filter.category(category.clone());
    }
    if let Some(language) = filters.get("language") {
        filter = filter.language(language.clone());
    }
    Some(filter)
}

/// Cosine similarity from Qdrant is already in `[-1, 1]`; normalize to the
/// `[0, 1]` the spec's `Retriever::search` contract requires.
fn normalize_cosine(score: f32) -> f32 {
    ((score + 1.0) / 2.0).clamp(0.0, 1.0)
}

/// BM25 scores are unbounded; squash monotonically into `[0, 1)`.
fn normalize_bm25(score: f32) -> f32 {
    (score / (score + 1.0)).clamp(0.0, 1.0)
}

/// Dense-only retriever backend (Chroma-like): embeds the query, issues a
/// nearest-neighbor search, no BM25.
pub struct DenseRetriever<E: Embedder> {
    store: Arc<VectorStore>,
    embedder: Arc<E>,
    collection: String,
}

impl<E: Embedder> DenseRetriever<E> {
    pub fn new(store: Arc<VectorStore>, embedder: Arc<E>, collection: impl Into<String>) -> Self {
        Self { store, embedder, collection: collection.into() }
    }
}

#[async_trait]
impl<E: Embedder> Retriever for DenseRetriever<E> {
    async fn search(&self, query: &str, top_k: usize, filters: Option<&Filters>) -> Result<Vec<SearchResult>> {
        // Embedding failures propagate per spec §4.2 Failure.
        let embedding = self.embedder.embed(query).await?;

        let results = match self.store.search(&embedding, top_k, to_search_filter(filters)).await {
            Ok(results) => results,
            Err(e) => {
                tracing::warn!(error = %e, "dense retriever search failed, returning empty");
                return Ok(Vec::new());
            }
        };

        Ok(results
            .into_iter()
            .map(|r| {
                let mut result = SearchResult::new(r.id, r.content, normalize_cosine(r.score));
                result.metadata = r.metadata;
                result.metadata.insert(metadata_keys::COLLECTION.to_string(), self.collection.clone());
                result
            })
            .collect())
    }

    async fn health_check(&self) -> bool {
        self.store.collection_info().await.is_ok()
    }
}

/// Hybrid dense+sparse retriever backend (Weaviate-like): sends both a
/// dense vector and a BM25 textual query, fuses with RRF internally (the
/// backend does the fusion, per spec §4.2 — distinct from the orchestrator's
/// hybrid vector+graph fusion in C6).
pub struct HybridDenseSparseRetriever<E: Embedder> {
    store: Arc<VectorStore>,
    sparse_index: Arc<crate::sparse_search::SparseIndex>,
    embedder: Arc<E>,
    collection: String,
    rrf_k: f32,
}

impl<E: Embedder> HybridDenseSparseRetriever<E> {
    pub fn new(
        store: Arc<VectorStore>,
        sparse_index: Arc<crate::sparse_search::SparseIndex>,
        embedder: Arc<E>,
        collection: impl Into<String>,
        rrf_k: f32,
    ) -> Self {
        Self { store, sparse_index, embedder, collection: collection.into(), rrf_k }
    }
}

#[async_trait]
impl<E: Embedder> Retriever for HybridDenseSparseRetriever<E> {
    async fn search(&self, query: &str, top_k: usize, filters: Option<&Filters>) -> Result<Vec<SearchResult>> {
        let embedding = self.embedder.embed(query).await?;

        let dense = self
            .store
            .search(&embedding, top_k, to_search_filter(filters))
            .await
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "hybrid retriever dense leg failed, continuing sparse-only");
                Vec::new()
            });
        let sparse = self.sparse_index.search(query, Some(top_k)).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "hybrid retriever sparse leg failed, continuing dense-only");
            Vec::new()
        });

        let dense_ranks: HashMap<String, usize> =
            dense.iter().enumerate().map(|(i, r)| (r.id.clone(), i + 1)).collect();
        let sparse_ranks: HashMap<String, usize> =
            sparse.iter().enumerate().map(|(i, r)| (r.id.clone(), i + 1)).collect();

        let mut merged: HashMap<String, SearchResult> = HashMap::new();
        let mut order: Vec<String> = Vec::new();
        for r in dense {
            if !merged.contains_key(&r.id) {
                order.push(r.id.clone());
            }
            merged.entry(r.id.clone()).or_insert_with(|| {
                let mut result = SearchResult::new(r.id, r.content, normalize_cosine(r.score));
                result.metadata = r.metadata;
                result
            });
        }
        for r in sparse {
            if !merged.contains_key(&r.id) {
                order.push(r.id.clone());
            }
            merged.entry(r.id.clone()).or_insert_with(|| {
                let mut result = SearchResult::new(r.id, r.content, normalize_bm25(r.score));
                result.metadata = r.metadata;
                result
            });
        }

        // Iterate in first-appearance order (dense then sparse), not HashMap
        // key order, so RRF ties break by insertion order under the stable sort.
        let mut scored: Vec<(String, f32)> = order
            .iter()
            .map(|id| {
                let mut score = 0.0;
                if let Some(rank) = dense_ranks.get(id.as_str()) {
                    score += 1.0 / (self.rrf_k + *rank as f32);
                }
                if let Some(rank) = sparse_ranks.get(id.as_str()) {
                    score += 1.0 / (self.rrf_k + *rank as f32);
                }
                (id.clone(), score)
            })
            .collect();

        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(top_k);

        Ok(scored
            .into_iter()
            .filter_map(|(id, score)| {
                let mut result = merged.remove(&id)?;
                result.score = score;
                result.metadata.insert(metadata_keys::COLLECTION.to_string(), self.collection.clone());
                Some(result)
            })
            .collect())
    }

    async fn health_check(&self) -> bool {
        self.store.collection_info().await.is_ok()
    }
}

/// Standalone BM25 retriever (spec §4.2, no embedder or network dependency).
/// Wraps [`SparseIndex`] directly rather than pairing it with a dense leg —
/// the default backend a server can boot with when no vector store is
/// configured.
pub struct SparseRetriever {
    index: Arc<SparseIndex>,
    collection: String,
}

impl SparseRetriever {
    pub fn new(index: Arc<SparseIndex>, collection: impl Into<String>) -> Self {
        Self { index, collection: collection.into() }
    }
}

#[async_trait]
impl Retriever for SparseRetriever {
    async fn search(&self, query: &str, top_k: usize, _filters: Option<&Filters>) -> Result<Vec<SearchResult>> {
        let results = self.index.search(query, Some(top_k)).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "sparse retriever search failed, returning empty");
            Vec::new()
        });

        Ok(results
            .into_iter()
            .map(|r| {
                let mut result = SearchResult::new(r.id, r.content, normalize_bm25(r.score));
                result.metadata = r.metadata;
                result.metadata.insert(metadata_keys::COLLECTION.to_string(), self.collection.clone());
                result
            })
            .collect())
    }

    async fn add_documents(&self, documents: Vec<SearchResult>) -> Result<usize> {
        let docs: Vec<Document> = documents
            .into_iter()
            .map(|r| Document {
                id: r.id,
                content: r.content,
                title: None,
                category: r.metadata.get(metadata_keys::COLLECTION).cloned(),
                language: None,
                metadata: r.metadata,
            })
            .collect();
        let count = docs.len();
        self.index.index_documents(&docs)?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_cosine_clamps_to_unit_interval() {
        assert_eq!(normalize_cosine(1.0), 1.0);
        assert_eq!(normalize_cosine(-1.0), 0.0);
        assert_eq!(normalize_cosine(0.0), 0.5);
    }

    #[test]
    fn normalize_bm25_is_monotonic_and_bounded() {
        assert!(normalize_bm25(0.0) < normalize_bm25(1.0));
        assert!(normalize_bm25(1.0) < normalize_bm25(100.0));
        assert!(normalize_bm25(100.0) < 1.0);
    }

    #[tokio::test]
    async fn sparse_retriever_finds_indexed_documents() {
        let index = Arc::new(SparseIndex::new(crate::sparse_search::SparseConfig::default()).unwrap());
        let retriever = SparseRetriever::new(index, "docs");

        let added = retriever
            .add_documents(vec![
                SearchResult::new("1", "kotak gold loan interest rate is seven percent", 0.0),
                SearchResult::new("2", "unrelated content about weather", 0.0),
            ])
            .await
            .unwrap();
        assert_eq!(added, 2);

        let results = retriever.search("gold loan interest rate", 5, None).await.unwrap();
        assert_eq!(results.first().unwrap().id, "1");
    }
}
