//! Reranker layer (spec §4.4, C5).
//!
//! Cross-encoder (API), late-interaction, and LLM-as-judge rerankers behind
//! [`Reranker`], plus a [`RerankerChain`] that pipes one stage's output into
//! the next with per-stage fallback.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::Mutex;
use rag_core::{fallback_sort, Reranker, RerankerStats, Result, SearchResult};
use rag_llm::{LlmBackend, Message};
use serde::Deserialize;

fn record(stats: &Mutex<RerankerStats>, success: bool, elapsed: Duration) {
    let mut stats = stats.lock();
    stats.total_requests += 1;
    if success {
        stats.successful_requests += 1;
    } else {
        stats.failed_requests += 1;
    }
    stats.total_processing_time_ms += elapsed.as_millis() as u64;
}

/// Builds the single prompt the LLM-as-judge reranker sends: candidates
/// truncated to `doc_preview_chars`, capped at `max_documents`.
fn build_judge_prompt(query: &str, results: &[SearchResult], max_documents: usize, preview_chars: usize, top_n: usize) -> String {
    let mut documents_text = String::new();
    for (i, result) in results.iter().take(max_documents).enumerate() {
        let preview: String = result.content.chars().take(preview_chars).collect();
        let preview = preview.replace('\n', " ");
        documents_text.push_str(&format!("\n[{i}] {}...", preview.trim()));
    }

    format!(
        "You are a document ranking expert. Evaluate and rank documents based on their relevance to the query.\n\n\
         Query: \"{query}\"\n\nDocuments:{documents_text}\n\n\
         Task: Score each document from 0.0 to 1.0 based on relevance to the query.\n\
         Select only the top {top_n} most relevant documents.\n\n\
         IMPORTANT: Respond ONLY with valid JSON in this exact format:\n\
         {{\"results\": [{{\"index\": 0, \"score\": 0.95}}, {{\"index\": 2, \"score\": 0.8}}]}}\n\n\
         Do not include any other text, explanation, or formatting. Only the JSON object."
    )
}

#[derive(Debug, Deserialize)]
struct JudgeItem {
    index: usize,
    score: f32,
}

#[derive(Debug, Deserialize)]
struct JudgeResponse {
    results: Vec<JudgeItem>,
}

/// Three-stage JSON parse: direct, fenced code block, greedy `{...}` regex.
/// Shared with the evaluator (spec §4.4, §4.9 use the identical policy).
pub fn parse_json_with_fallback(text: &str) -> Option<serde_json::Value> {
    let text = text.trim();
    if let Ok(value) = serde_json::from_str(text) {
        return Some(value);
    }

    if let Some(start) = text.find("```") {
        let rest = &text[start + 3..];
        let rest = rest.strip_prefix("json").unwrap_or(rest);
        if let Some(end) = rest.find("```") {
            if let Ok(value) = serde_json::from_str(rest[..end].trim()) {
                return Some(value);
            }
        }
    }

    let re = regex::Regex::new(r"(?s)\{.*\}").ok()?;
    let captured = re.find(text)?;
    serde_json::from_str(captured.as_str()).ok()
}

fn build_reranked_results(
    judge: JudgeResponse,
    original_results: &[SearchResult],
    top_n: usize,
) -> Vec<SearchResult> {
    let mut reranked: Vec<SearchResult> = judge
        .results
        .into_iter()
        .take(top_n)
        .filter_map(|item| {
            let original = original_results.get(item.index)?;
            let score = item.score.clamp(0.0, 1.0);
            let mut result = original.clone();
            let original_score = result.score;
            result.score = score;
            result.metadata.insert("rerank_method".to_string(), "llm-judge".to_string());
            result.metadata.insert("original_score".to_string(), original_score.to_string());
            Some(result)
        })
        .collect();

    if reranked.is_empty() {
        return fallback_sort(original_results.to_vec(), Some(top_n));
    }

    reranked.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    reranked
}

/// LLM-as-judge reranker (spec §4.4): one prompt listing candidates, the
/// model returns `{"results": [{"index", "score"}, ...]}`.
pub struct LlmJudgeReranker<B: LlmBackend> {
    backend: Arc<B>,
    max_documents: usize,
    doc_preview_chars: usize,
    stats: Mutex<RerankerStats>,
}

impl<B: LlmBackend> LlmJudgeReranker<B> {
    pub fn new(backend: Arc<B>, max_documents: usize, doc_preview_chars: usize) -> Self {
        Self { backend, max_documents, doc_preview_chars, stats: Mutex::new(RerankerStats::default()) }
    }
}

#[async_trait]
impl<B: LlmBackend> Reranker for LlmJudgeReranker<B> {
    async fn rerank(&self, query: &str, results: Vec<SearchResult>, top_n: Option<usize>) -> Result<Vec<SearchResult>> {
        if results.is_empty() {
            return Ok(Vec::new());
        }
        let top_n = top_n.unwrap_or(15);
        let start = Instant::now();

        let prompt = build_judge_prompt(query, &results, self.max_documents, self.doc_preview_chars, top_n);
        let outcome = self.backend.generate(&[Message::user(prompt)]).await;

        let degraded = fallback_sort(results.clone(), Some(top_n));
        let reranked = match outcome {
            Ok(generation) => match parse_json_with_fallback(&generation.text) {
                Some(value) => match serde_json::from_value::<JudgeResponse>(value) {
                    Ok(judge) => {
                        record(&self.stats, true, start.elapsed());
                        build_reranked_results(judge, &results, top_n)
                    }
                    Err(_) => {
                        record(&self.stats, false, start.elapsed());
                        degraded
                    }
                },
                None => {
                    record(&self.stats, false, start.elapsed());
                    degraded
                }
            },
            Err(e) => {
                tracing::warn!(error = %e, "llm judge reranker failed, degrading to score order");
                record(&self.stats, false, start.elapsed());
                degraded
            }
        };

        Ok(reranked)
    }

    fn supports_caching(&self) -> bool {
        // LLM-as-judge is not deterministic across calls.
        false
    }

    fn stats(&self) -> RerankerStats {
        self.stats.lock().clone()
    }

    fn name(&self) -> &str {
        "llm-judge"
    }
}

#[derive(Debug, Deserialize)]
struct ApiRerankResult {
    index: usize,
    relevance_score: f32,
}

#[derive(Debug, Deserialize)]
struct ApiRerankResponse {
    results: Vec<ApiRerankResult>,
}

/// API-based cross-encoder / late-interaction reranker: POST `(query,
/// documents)`, receive relevance scores, reorder. Deterministic, so
/// [`Reranker::supports_caching`] returns true.
pub struct ApiReranker {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    model: String,
    timeout: Duration,
    name: String,
    stats: Mutex<RerankerStats>,
}

impl ApiReranker {
    pub fn new(endpoint: impl Into<String>, api_key: Option<String>, model: impl Into<String>, timeout: Duration, name: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
            api_key,
            model: model.into(),
            timeout,
            name: name.into(),
            stats: Mutex::new(RerankerStats::default()),
        }
    }
}

#[async_trait]
impl Reranker for ApiReranker {
    async fn rerank(&self, query: &str, results: Vec<SearchResult>, top_n: Option<usize>) -> Result<Vec<SearchResult>> {
        if results.is_empty() {
            return Ok(Vec::new());
        }
        let top_n = top_n.unwrap_or(15);
        let start = Instant::now();

        let documents: Vec<&str> = results.iter().map(|r| r.content.as_str()).collect();
        let mut request = self
            .client
            .post(&self.endpoint)
            .timeout(self.timeout)
            .json(&serde_json::json!({ "model": self.model, "query": query, "documents": documents, "top_n": top_n }));
        if let Some(api_key) = &self.api_key {
            request = request.bearer_auth(api_key);
        }

        let outcome = request.send().await.and_then(|r| r.error_for_status());
        let degraded = fallback_sort(results.clone(), Some(top_n));

        let reranked = match outcome {
            Ok(response) => match response.json::<ApiRerankResponse>().await {
                Ok(parsed) => {
                    record(&self.stats, true, start.elapsed());
                    let mut reranked: Vec<SearchResult> = parsed
                        .results
                        .into_iter()
                        .take(top_n)
                        .filter_map(|item| {
                            let original = results.get(item.index)?;
                            let mut result = original.clone();
                            let original_score = result.score;
                            result.score = item.relevance_score.clamp(0.0, 1.0);
                            result.metadata.insert("rerank_method".to_string(), self.name.clone());
                            result.metadata.insert("original_score".to_string(), original_score.to_string());
                            Some(result)
                        })
                        .collect();
                    reranked.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
                    if reranked.is_empty() { degraded } else { reranked }
                }
                Err(_) => {
                    record(&self.stats, false, start.elapsed());
                    degraded
                }
            },
            Err(e) => {
                tracing::warn!(error = %e, reranker = %self.name, "api reranker request failed, degrading to score order");
                record(&self.stats, false, start.elapsed());
                degraded
            }
        };

        Ok(reranked)
    }

    fn supports_caching(&self) -> bool {
        true
    }

    fn stats(&self) -> RerankerStats {
        self.stats.lock().clone()
    }

    fn name(&self) -> &str {
        &self.name
    }
}

struct ChainStage {
    reranker: Arc<dyn Reranker>,
    enabled: bool,
}

/// Ordered reranker chain: stage *i*'s output feeds stage *i+1*. A disabled
/// or failing stage is skipped and the previous output passes through.
pub struct RerankerChain {
    stages: Vec<ChainStage>,
}

impl RerankerChain {
    pub fn new() -> Self {
        Self { stages: Vec::new() }
    }

    pub fn with_stage(mut self, reranker: Arc<dyn Reranker>, enabled: bool) -> Self {
        self.stages.push(ChainStage { reranker, enabled });
        self
    }
}

impl Default for RerankerChain {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Reranker for RerankerChain {
    async fn rerank(&self, query: &str, results: Vec<SearchResult>, top_n: Option<usize>) -> Result<Vec<SearchResult>> {
        let mut current = results;
        for stage in &self.stages {
            if !stage.enabled {
                continue;
            }
            match stage.reranker.rerank(query, current.clone(), top_n).await {
                Ok(next) => current = next,
                Err(e) => {
                    tracing::warn!(error = %e, stage = stage.reranker.name(), "chain stage failed, passing previous output through");
                }
            }
        }
        Ok(current)
    }

    fn supports_caching(&self) -> bool {
        self.stages.iter().all(|s| !s.enabled || s.reranker.supports_caching())
    }

    fn stats(&self) -> RerankerStats {
        self.stages.iter().fold(RerankerStats::default(), |mut acc, stage| {
            let s = stage.reranker.stats();
            acc.total_requests += s.total_requests;
            acc.successful_requests += s.successful_requests;
            acc.failed_requests += s.failed_requests;
            acc.total_processing_time_ms += s.total_processing_time_ms;
            acc
        })
    }

    fn name(&self) -> &str {
        "chain"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rag_llm::{FinishReason, GenerationResult};

    struct StaticBackend(String);

    #[async_trait]
    impl LlmBackend for StaticBackend {
        async fn generate(&self, _messages: &[Message]) -> std::result::Result<GenerationResult, rag_llm::LlmError> {
            Ok(GenerationResult { text: self.0.clone(), tokens: 0, total_time_ms: 0, finish_reason: FinishReason::Stop })
        }

        async fn is_available(&self) -> bool {
            true
        }

        fn model_name(&self) -> &str {
            "static"
        }
    }

    fn docs() -> Vec<SearchResult> {
        vec![
            SearchResult::new("a", "first document about loans", 0.4),
            SearchResult::new("b", "second document about savings", 0.6),
        ]
    }

    #[tokio::test]
    async fn llm_judge_reranks_by_model_scores() {
        let backend = Arc::new(StaticBackend(r#"{"results": [{"index": 0, "score": 0.9}, {"index": 1, "score": 0.2}]}"#.to_string()));
        let reranker = LlmJudgeReranker::new(backend, 20, 250);
        let reranked = reranker.rerank("loans", docs(), Some(2)).await.unwrap();
        assert_eq!(reranked[0].id, "a");
        assert_eq!(reranked[0].metadata.get("rerank_method").unwrap(), "llm-judge");
    }

    #[tokio::test]
    async fn llm_judge_degrades_on_malformed_json() {
        let backend = Arc::new(StaticBackend("not json at all".to_string()));
        let reranker = LlmJudgeReranker::new(backend, 20, 250);
        let reranked = reranker.rerank("loans", docs(), Some(2)).await.unwrap();
        assert_eq!(reranked[0].id, "b");
        assert_eq!(reranked[0].score, 0.6);
    }

    #[tokio::test]
    async fn json_fallback_extracts_fenced_block() {
        let text = "Here you go:\n```json\n{\"results\": [{\"index\": 0, \"score\": 0.5}]}\n```";
        let value = parse_json_with_fallback(text).unwrap();
        assert!(value.get("results").is_some());
    }

    #[tokio::test]
    async fn chain_skips_disabled_stage() {
        let backend = Arc::new(StaticBackend(r#"{"results": [{"index": 1, "score": 0.9}]}"#.to_string()));
        let judge = Arc::new(LlmJudgeReranker::new(backend, 20, 250));
        let chain = RerankerChain::new().with_stage(judge, false);
        let reranked = chain.rerank("loans", docs(), Some(2)).await.unwrap();
        assert_eq!(reranked.len(), 2);
        assert_eq!(reranked[0].id, "a");
    }
}
