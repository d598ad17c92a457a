//! Internal LLM-as-judge evaluator (spec §4.9).

use std::sync::Arc;

use async_trait::async_trait;
use rag_core::{EvaluationResult, Evaluator, SearchResult};
use rag_llm::{LlmBackend, Message};
use rag_retrieval::reranker::parse_json_with_fallback;
use serde::Deserialize;

fn build_judge_prompt(query: &str, answer: &str, context: &[SearchResult]) -> String {
    let mut context_block = String::new();
    for (i, doc) in context.iter().enumerate() {
        let preview: String = doc.content.chars().take(500).collect();
        context_block.push_str(&format!("[{}] {}\n", i + 1, preview.replace('\n', " ")));
    }

    format!(
        "You are judging whether an answer is faithful to its retrieved context \
         and relevant to the user's query.\n\n\
         Query: {query}\n\n\
         Context:\n{context_block}\n\
         Answer: {answer}\n\n\
         Rate faithfulness (is the answer supported by the context, not \
         fabricated?) and relevance (does the answer address the query?), \
         each in [0, 1], with one sentence of reasoning.\n\n\
         Respond with JSON only, no commentary:\n\
         {{\"faithfulness\": 0.0-1.0, \"relevance\": 0.0-1.0, \"reasoning\": \"...\"}}",
    )
}

#[derive(Debug, Deserialize)]
struct JudgeResponse {
    faithfulness: f32,
    relevance: f32,
    #[serde(default)]
    reasoning: String,
}

/// LLM-as-judge implementation of [`Evaluator`]. Degrades to
/// [`EvaluationResult::neutral`] on any generation or parse failure.
pub struct InternalEvaluator<B: LlmBackend> {
    backend: Arc<B>,
}

impl<B: LlmBackend> InternalEvaluator<B> {
    pub fn new(backend: Arc<B>) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl<B: LlmBackend> Evaluator for InternalEvaluator<B> {
    async fn evaluate(
        &self,
        query: &str,
        answer: &str,
        context: &[SearchResult],
    ) -> rag_core::Result<EvaluationResult> {
        if !self.backend.is_available().await {
            return Ok(EvaluationResult::neutral("evaluator backend unavailable"));
        }

        let prompt = build_judge_prompt(query, answer, context);
        let outcome = self.backend.generate(&[Message::user(prompt)]).await;

        let text = match outcome {
            Ok(result) => result.text,
            Err(e) => {
                tracing::warn!(error = %e, query, "evaluator generation failed, returning neutral result");
                return Ok(EvaluationResult::neutral(format!("generation failed: {e}")));
            }
        };

        let Some(value) = parse_json_with_fallback(&text) else {
            tracing::warn!(query, "evaluator response had no parseable JSON, returning neutral result");
            return Ok(EvaluationResult::neutral("unparseable judge response"));
        };

        match serde_json::from_value::<JudgeResponse>(value) {
            Ok(judged) => Ok(EvaluationResult::from_faithfulness_relevance(
                judged.faithfulness,
                judged.relevance,
                judged.reasoning,
            )),
            Err(e) => {
                tracing::warn!(error = %e, query, "evaluator response malformed, returning neutral result");
                Ok(EvaluationResult::neutral(format!("malformed judge response: {e}")))
            }
        }
    }

    fn name(&self) -> &str {
        "internal-llm-judge"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use rag_llm::{FinishReason, GenerationResult, LlmError};

    struct StaticBackend {
        text: String,
        available: bool,
    }

    #[async_trait]
    impl LlmBackend for StaticBackend {
        async fn generate(&self, _messages: &[Message]) -> std::result::Result<GenerationResult, LlmError> {
            Ok(GenerationResult {
                text: self.text.clone(),
                tokens: 0,
                total_time_ms: 0,
                finish_reason: FinishReason::Stop,
            })
        }

        async fn is_available(&self) -> bool {
            self.available
        }

        fn model_name(&self) -> &str {
            "static"
        }
    }

    #[tokio::test]
    async fn scores_from_judge_response() {
        let backend = Arc::new(StaticBackend {
            text: r#"{"faithfulness": 0.9, "relevance": 0.8, "reasoning": "well supported"}"#.to_string(),
            available: true,
        });
        let evaluator = InternalEvaluator::new(backend);

        let result = evaluator.evaluate("q", "a", &[]).await.unwrap();

        assert_eq!(result.faithfulness, 0.9);
        assert_eq!(result.relevance, 0.8);
        assert!((result.overall - 0.85).abs() < 1e-6);
    }

    #[tokio::test]
    async fn neutral_when_backend_unavailable() {
        let backend = Arc::new(StaticBackend { text: String::new(), available: false });
        let evaluator = InternalEvaluator::new(backend);

        let result = evaluator.evaluate("q", "a", &[]).await.unwrap();

        assert_eq!(result.overall, 0.5);
    }

    #[tokio::test]
    async fn neutral_on_malformed_response() {
        let backend = Arc::new(StaticBackend { text: "garbage".to_string(), available: true });
        let evaluator = InternalEvaluator::new(backend);

        let result = evaluator.evaluate("q", "a", &[]).await.unwrap();

        assert_eq!(result.overall, 0.5);
    }

    #[tokio::test]
    async fn is_acceptable_honors_threshold() {
        let result = EvaluationResult::from_faithfulness_relevance(0.9, 0.9, "x");
        assert!(result.is_acceptable(0.7));
        assert!(!result.is_acceptable(0.95));
    }
}
