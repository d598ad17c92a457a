//! Query expansion engine interface (spec §4.6, C7).

use async_trait::async_trait;

use crate::model::ExpandedQuery;
use crate::Result;

#[async_trait]
pub trait QueryExpansionEngine: Send + Sync {
    /// Expand `query` into alternates. `context` is free-form conversation
    /// context the engine may use to disambiguate.
    ///
    /// Must never raise — implementations that hit an internal error should
    /// return `Ok(ExpandedQuery::unexpanded(query))` themselves; this
    /// signature still returns `Result` so the orchestrator's call site
    /// reads the same as every other stage, with the fallback applied at
    /// the orchestrator boundary as a second line of defense.
    async fn expand(&self, query: &str, context: Option<&str>) -> Result<ExpandedQuery>;
}
