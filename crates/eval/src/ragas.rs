//! Library-based batch evaluator (spec §4.9).
//!
//! No Ragas-equivalent batch-evaluation crate exists in the Rust ecosystem
//! (noted in DESIGN.md), so this implementation is permanently
//! `is_available() == false` and every call returns the neutral result, per
//! the spec's own fallback contract for an absent library.

use async_trait::async_trait;
use rag_config::RagasEvaluatorConfig;
use rag_core::{EvaluationResult, Evaluator, SearchResult};

pub struct RagasEvaluator {
    config: RagasEvaluatorConfig,
}

impl RagasEvaluator {
    pub fn new(config: RagasEvaluatorConfig) -> Self {
        Self { config }
    }

    pub fn is_available(&self) -> bool {
        false
    }

    pub async fn batch_evaluate(&self, samples: &[(String, String, Vec<SearchResult>)]) -> Vec<EvaluationResult> {
        samples
            .iter()
            .map(|_| EvaluationResult::neutral("ragas batch evaluator unavailable in this build"))
            .collect()
    }
}

#[async_trait]
impl Evaluator for RagasEvaluator {
    async fn evaluate(
        &self,
        _query: &str,
        _answer: &str,
        _context: &[SearchResult],
    ) -> rag_core::Result<EvaluationResult> {
        tracing::warn!(
            metrics = ?self.config.metrics,
            "ragas evaluator unavailable, returning neutral result"
        );
        Ok(EvaluationResult::neutral("ragas batch evaluator unavailable in this build"))
    }

    fn name(&self) -> &str {
        "ragas"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn always_unavailable_and_neutral() {
        let evaluator = RagasEvaluator::new(RagasEvaluatorConfig::default());
        assert!(!evaluator.is_available());

        let result = evaluator.evaluate("q", "a", &[]).await.unwrap();
        assert_eq!(result.overall, 0.5);
    }

    #[tokio::test]
    async fn batch_evaluate_returns_neutral_per_sample() {
        let evaluator = RagasEvaluator::new(RagasEvaluatorConfig::default());
        let samples = vec![
            ("q1".to_string(), "a1".to_string(), vec![]),
            ("q2".to_string(), "a2".to_string(), vec![]),
        ];

        let results = evaluator.batch_evaluate(&samples).await;

        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.overall == 0.5));
    }
}
