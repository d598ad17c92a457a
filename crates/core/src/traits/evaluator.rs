//! Response evaluator interface (spec §4.9, C9).
//!
//! The internal LLM-as-judge evaluator and the library-based batch evaluator
//! (Ragas-style, used offline by the `eval` crate) both implement this.

use async_trait::async_trait;

use crate::model::{EvaluationResult, SearchResult};
use crate::Result;

#[async_trait]
pub trait Evaluator: Send + Sync {
    /// Score a single (query, answer, context) triple. Must never raise —
    /// on internal failure return `Ok(EvaluationResult::neutral(reason))`.
    async fn evaluate(
        &self,
        query: &str,
        answer: &str,
        context: &[SearchResult],
    ) -> Result<EvaluationResult>;

    fn name(&self) -> &str;
}
