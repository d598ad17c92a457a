//! Optional query routing (spec §4.10 step 2: "optionally classify/route
//! the query; may be disabled"). No router implementation ships in this
//! workspace — the trait exists so a classifier can be plugged in later
//! without touching [`crate::pipeline::RagPipeline`]. When no router is
//! configured every query routes straight into RAG.

use async_trait::async_trait;

#[derive(Debug, Clone, PartialEq)]
pub struct RouteDecision {
    /// Whether the query should go through retrieval at all, or be
    /// answered directly (e.g. chit-chat that needs no grounding).
    pub use_rag: bool,
    pub category: String,
}

impl RouteDecision {
    pub fn rag(category: impl Into<String>) -> Self {
        Self { use_rag: true, category: category.into() }
    }
}

#[async_trait]
pub trait QueryRouter: Send + Sync {
    async fn route(&self, query: &str) -> rag_core::Result<RouteDecision>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rag_decision_defaults_to_use_rag() {
        let decision = RouteDecision::rag("general");
        assert!(decision.use_rag);
        assert_eq!(decision.category, "general");
    }
}
