//! The per-request data model shared by every component (spec §3).
//!
//! None of these types persist across requests except via the external
//! feedback store and the cache, which own copies of `SearchResult` lists.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Reserved `SearchResult::metadata` keys, collected here so stages agree on
/// spelling instead of each hand-rolling a string literal.
pub mod metadata_keys {
    pub const COLLECTION: &str = "_collection";
    pub const FILE_TYPE: &str = "file_type";
    pub const RERANK_METHOD: &str = "rerank_method";
    pub const ORIGINAL_SCORE: &str = "original_score";
    pub const RRF_SCORE: &str = "rrf_score";
    pub const HYBRID_SCORE: &str = "hybrid_score";
    pub const VECTOR_RANK: &str = "vector_rank";
    pub const GRAPH_RANK: &str = "graph_rank";
    pub const SCORE_BEFORE_WEIGHT: &str = "_score_before_weight";
    pub const QUERY_APPEARANCES: &str = "query_appearances";
}

/// A single retrieved (and possibly reranked) document.
///
/// `id` must be unique within one merged list — a duplicate `id` surviving a
/// merge stage is a bug (spec §3 invariant, §8 "Uniqueness").
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchResult {
    pub id: String,
    pub content: String,
    pub score: f32,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl SearchResult {
    pub fn new(id: impl Into<String>, content: impl Into<String>, score: f32) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
            score,
            metadata: HashMap::new(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn collection(&self) -> &str {
        self.metadata
            .get(metadata_keys::COLLECTION)
            .map(String::as_str)
            .unwrap_or("")
    }

    pub fn file_type(&self) -> &str {
        self.metadata
            .get(metadata_keys::FILE_TYPE)
            .map(String::as_str)
            .unwrap_or("")
    }
}

/// A graph entity. `properties["doc_id"]` links it back to a retrievable
/// document (used by hybrid search to materialize a pseudo-`SearchResult`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Entity {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub entity_type: String,
    #[serde(default)]
    pub properties: HashMap<String, String>,
}

impl Entity {
    pub fn doc_id(&self) -> Option<&str> {
        self.properties.get("doc_id").map(String::as_str)
    }
}

/// A directed graph relation. Direction is structural; traversal may ignore
/// it when the caller asks for a bidirectional walk.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Relation {
    pub source_id: String,
    pub target_id: String,
    #[serde(rename = "type")]
    pub relation_type: String,
    pub weight: f32,
    #[serde(default)]
    pub properties: HashMap<String, String>,
}

/// Result of a graph-store text or neighbor search.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct GraphSearchResult {
    pub entities: Vec<Entity>,
    pub relations: Vec<Relation>,
    /// Aggregate relevance in [0, 1]; 0 when `entities` is empty.
    pub score: f32,
}

/// Result of a hybrid vector+graph search (spec §4.5).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct HybridSearchResult {
    pub documents: Vec<SearchResult>,
    pub vector_count: usize,
    pub graph_count: usize,
    /// Mean `hybrid_score` of `documents`; 0.0 when empty.
    pub total_score: f32,
    pub metadata: HashMap<String, String>,
}

/// Complexity classification attached to an expanded query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryComplexity {
    Simple,
    Moderate,
    Complex,
}

/// A single alternate phrasing of the original query, with a fusion weight.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WeightedQuery {
    pub text: String,
    /// In [0, 1], monotonically non-increasing across the list.
    pub weight: f32,
}

/// Result of query expansion (spec §4.6). `queries[0]` is always the
/// original query at weight 1.0.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExpandedQuery {
    pub original: String,
    pub queries: Vec<WeightedQuery>,
    pub complexity: QueryComplexity,
    pub intent: String,
}

impl ExpandedQuery {
    /// The degraded fallback used whenever expansion fails: the original
    /// query alone, unexpanded (spec §4.6).
    pub fn unexpanded(original: impl Into<String>) -> Self {
        let original = original.into();
        Self {
            queries: vec![WeightedQuery {
                text: original.clone(),
                weight: 1.0,
            }],
            original,
            complexity: QueryComplexity::Simple,
            intent: "unknown".to_string(),
        }
    }

    pub fn all_queries(&self) -> impl Iterator<Item = &str> {
        self.queries.iter().map(|q| q.text.as_str())
    }
}

/// Outcome of scoring a (query, answer, context) triple (spec §4.9).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EvaluationResult {
    pub faithfulness: f32,
    pub relevance: f32,
    pub overall: f32,
    pub reasoning: String,
    pub context_precision: Option<f32>,
    pub answer_similarity: Option<f32>,
    #[serde(default)]
    pub raw_scores: HashMap<String, f32>,
    pub evaluated_at: DateTime<Utc>,
}

impl EvaluationResult {
    /// The internal evaluator's definition: `overall = 0.5*faithfulness + 0.5*relevance`.
    pub fn from_faithfulness_relevance(
        faithfulness: f32,
        relevance: f32,
        reasoning: impl Into<String>,
    ) -> Self {
        let faithfulness = faithfulness.clamp(0.0, 1.0);
        let relevance = relevance.clamp(0.0, 1.0);
        Self {
            faithfulness,
            relevance,
            overall: 0.5 * faithfulness + 0.5 * relevance,
            reasoning: reasoning.into(),
            context_precision: None,
            answer_similarity: None,
            raw_scores: HashMap::new(),
            evaluated_at: Utc::now(),
        }
    }

    /// The neutral degraded result returned when the evaluator is
    /// unavailable or every parse attempt fails.
    pub fn neutral(reason: impl Into<String>) -> Self {
        Self::from_faithfulness_relevance(0.5, 0.5, reason)
    }

    pub fn is_acceptable(&self, threshold: f32) -> bool {
        self.overall >= threshold
    }
}

/// Rating on a single chat turn. `0` is invalid by construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(i8)]
pub enum Rating {
    Down = -1,
    Up = 1,
}

impl Rating {
    pub fn from_i8(value: i8) -> crate::Result<Self> {
        match value {
            -1 => Ok(Rating::Down),
            1 => Ok(Rating::Up),
            other => Err(crate::Error::Validation(format!(
                "rating must be -1 or +1, got {other}"
            ))),
        }
    }
}

/// User feedback on one chat response. A write-only record — the core only
/// defines the shape, persistence lives in the external feedback store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackData {
    pub session_id: String,
    pub message_id: String,
    pub rating: Rating,
    pub comment: Option<String>,
    pub query: Option<String>,
    pub response: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl FeedbackData {
    /// True iff a positive rating came with both `query` and `response` —
    /// worth curating into a golden evaluation set.
    pub fn is_golden_candidate(&self) -> bool {
        matches!(self.rating, Rating::Up) && self.query.is_some() && self.response.is_some()
    }
}

/// Per-stage score trail for one retrieved document, used in a `DebugTrace`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebugDocument {
    pub id: String,
    pub stage_scores: HashMap<String, f32>,
}

/// Self-RAG evaluation record captured in a `DebugTrace`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelfRagTrace {
    pub initial_quality: f32,
    pub regenerated: bool,
    pub final_quality: f32,
}

/// Full per-request debug trace, only collected when explicitly requested
/// (spec §3, §4.10 step 8 — never collected by default, for performance).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebugTrace {
    pub original_query: String,
    pub expanded_queries: Vec<String>,
    pub final_query: String,
    pub retrieved: Vec<DebugDocument>,
    pub self_rag: Option<SelfRagTrace>,
    pub generation_prompt: Option<String>,
}
