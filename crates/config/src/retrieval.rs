//! Top-level retrieval/RAG/Self-RAG knobs (spec §6).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct QueryExpansionConfig {
    #[serde(default)]
    pub enabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RagConfig {
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    #[serde(default = "default_rerank_top_k")]
    pub rerank_top_k: usize,
    /// Cap on `TXT`-typed results in any returned list (spec §4.7 step 7,
    /// §9 Open Question — kept configurable rather than hardcoded).
    #[serde(default = "default_txt_diversity_cap")]
    pub txt_diversity_cap: usize,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            rerank_top_k: default_rerank_top_k(),
            txt_diversity_cap: default_txt_diversity_cap(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RetrievalFilterConfig {
    #[serde(default)]
    pub min_score: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelfRagConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_accept_threshold")]
    pub accept_threshold: f32,
    #[serde(default = "default_regenerate_threshold")]
    pub regenerate_threshold: f32,
}

impl Default for SelfRagConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            accept_threshold: default_accept_threshold(),
            regenerate_threshold: default_regenerate_threshold(),
        }
    }
}

fn default_top_k() -> usize {
    15
}
fn default_rerank_top_k() -> usize {
    15
}
fn default_txt_diversity_cap() -> usize {
    15
}
fn default_accept_threshold() -> f32 {
    0.7
}
fn default_regenerate_threshold() -> f32 {
    0.5
}
