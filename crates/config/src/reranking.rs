//! C5 reranker configuration (spec §4.4, §6).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "provider", rename_all = "kebab-case")]
pub enum RerankingConfig {
    GeminiFlash(LlmJudgeRerankerConfig),
    Jina(ApiRerankerConfig),
    JinaColbert(ApiRerankerConfig),
    OpenaiLlm(LlmJudgeRerankerConfig),
}

impl Default for RerankingConfig {
    fn default() -> Self {
        RerankingConfig::GeminiFlash(LlmJudgeRerankerConfig::default())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmJudgeRerankerConfig {
    #[serde(default = "default_llm_judge_model")]
    pub model: String,
    #[serde(default = "default_max_documents")]
    pub max_documents: usize,
    #[serde(default = "default_timeout_secs")]
    pub timeout: u64,
    #[serde(default = "default_doc_preview_chars")]
    pub doc_preview_chars: usize,
}

impl Default for LlmJudgeRerankerConfig {
    fn default() -> Self {
        Self {
            model: default_llm_judge_model(),
            max_documents: default_max_documents(),
            timeout: default_timeout_secs(),
            doc_preview_chars: default_doc_preview_chars(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiRerankerConfig {
    pub model: String,
    #[serde(default = "default_max_documents")]
    pub max_documents: usize,
    #[serde(default = "default_timeout_secs")]
    pub timeout: u64,
}

fn default_llm_judge_model() -> String {
    "gemini-flash".to_string()
}

fn default_max_documents() -> usize {
    20
}

fn default_timeout_secs() -> u64 {
    15
}

fn default_doc_preview_chars() -> usize {
    250
}
