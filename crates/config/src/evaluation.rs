//! C9 evaluator configuration (spec §4.9, §6).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct EvaluationConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub provider: EvaluatorProvider,
    #[serde(default)]
    pub thresholds: EvaluationThresholds,
    #[serde(default)]
    pub internal: InternalEvaluatorConfig,
    #[serde(default)]
    pub ragas: RagasEvaluatorConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum EvaluatorProvider {
    #[default]
    Internal,
    Ragas,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationThresholds {
    #[serde(default = "default_min_acceptable")]
    pub min_acceptable: f32,
    #[serde(default = "default_good_quality")]
    pub good_quality: f32,
    #[serde(default = "default_excellent_quality")]
    pub excellent_quality: f32,
}

impl Default for EvaluationThresholds {
    fn default() -> Self {
        Self {
            min_acceptable: default_min_acceptable(),
            good_quality: default_good_quality(),
            excellent_quality: default_excellent_quality(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InternalEvaluatorConfig {
    #[serde(default = "default_internal_model")]
    pub model: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout: u64,
}

impl Default for InternalEvaluatorConfig {
    fn default() -> Self {
        Self {
            model: default_internal_model(),
            timeout: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RagasEvaluatorConfig {
    #[serde(default = "default_ragas_metrics")]
    pub metrics: Vec<String>,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_ragas_llm_model")]
    pub llm_model: String,
    #[serde(default = "default_ragas_embedding_model")]
    pub embedding_model: String,
}

impl Default for RagasEvaluatorConfig {
    fn default() -> Self {
        Self {
            metrics: default_ragas_metrics(),
            batch_size: default_batch_size(),
            llm_model: default_ragas_llm_model(),
            embedding_model: default_ragas_embedding_model(),
        }
    }
}

fn default_min_acceptable() -> f32 {
    0.5
}
fn default_good_quality() -> f32 {
    0.7
}
fn default_excellent_quality() -> f32 {
    0.9
}
fn default_internal_model() -> String {
    "gemini-flash".to_string()
}
fn default_timeout_secs() -> u64 {
    20
}
fn default_ragas_metrics() -> Vec<String> {
    vec!["faithfulness".to_string(), "answer_relevancy".to_string()]
}
fn default_batch_size() -> usize {
    8
}
fn default_ragas_llm_model() -> String {
    "gpt-4o-mini".to_string()
}
fn default_ragas_embedding_model() -> String {
    "text-embedding-3-small".to_string()
}
