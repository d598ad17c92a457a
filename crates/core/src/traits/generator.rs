//! Answer generator interface (spec §6 external interfaces).
//!
//! Implemented per backend (Claude, OpenAI, Ollama, ...) in the `llm` crate.

use async_trait::async_trait;

use crate::model::SearchResult;
use crate::Result;

#[async_trait]
pub trait Generator: Send + Sync {
    /// Generate an answer to `query` grounded in `context`. `history` is
    /// prior turns of the same session, oldest first.
    async fn generate(
        &self,
        query: &str,
        context: &[SearchResult],
        history: &[(String, String)],
    ) -> Result<String>;

    fn name(&self) -> &str;
}
