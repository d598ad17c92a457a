//! LLM-backed query expansion engine (spec §4.6, C7).

use async_trait::async_trait;
use rag_core::{ExpandedQuery, QueryComplexity, WeightedQuery};
use rag_llm::{LlmBackend, Message};
use serde::Deserialize;

use crate::reranker::parse_json_with_fallback;

const MAX_QUERIES: usize = 5;

fn build_expansion_prompt(query: &str, context: Option<&str>) -> String {
    let context_line = context
        .map(|c| format!("Conversation context: {}\n", c))
        .unwrap_or_default();

    format!(
        "You expand search queries for a retrieval system.\n\
         {context_line}Query: {query}\n\n\
         Produce up to {max} alternate phrasings that would help retrieve the \
         same information (synonyms, rephrasings, implied sub-questions). \
         Also classify the query's complexity and its intent in a few words.\n\n\
         Respond with JSON only, no commentary:\n\
         {{\"alternates\": [{{\"text\": \"...\", \"weight\": 0.0-1.0}}], \
         \"complexity\": \"simple\"|\"moderate\"|\"complex\", \"intent\": \"...\"}}\n\
         Weights must be non-increasing and below 1.0 (the original query is weight 1.0).",
        context_line = context_line,
        query = query,
        max = MAX_QUERIES - 1,
    )
}

#[derive(Debug, Deserialize)]
struct AlternateQuery {
    text: String,
    weight: f32,
}

#[derive(Debug, Deserialize)]
struct ExpansionResponse {
    #[serde(default)]
    alternates: Vec<AlternateQuery>,
    #[serde(default)]
    complexity: String,
    #[serde(default)]
    intent: String,
}

fn parse_complexity(s: &str) -> QueryComplexity {
    match s.to_lowercase().as_str() {
        "moderate" => QueryComplexity::Moderate,
        "complex" => QueryComplexity::Complex,
        _ => QueryComplexity::Simple,
    }
}

fn build_expanded_query(original: &str, response: ExpansionResponse) -> ExpandedQuery {
    let mut queries = vec![WeightedQuery { text: original.to_string(), weight: 1.0 }];

    let mut prev_weight = 1.0_f32;
    for alt in response.alternates.into_iter().take(MAX_QUERIES - 1) {
        if alt.text.trim().is_empty() {
            continue;
        }
        let weight = alt.weight.clamp(0.0, 1.0).min(prev_weight);
        prev_weight = weight;
        queries.push(WeightedQuery { text: alt.text, weight });
    }

    let intent = if response.intent.trim().is_empty() {
        "unknown".to_string()
    } else {
        response.intent
    };

    ExpandedQuery {
        original: original.to_string(),
        queries,
        complexity: parse_complexity(&response.complexity),
        intent,
    }
}

/// LLM-backed implementation of [`rag_core::QueryExpansionEngine`].
pub struct LlmQueryExpander<B: LlmBackend> {
    backend: std::sync::Arc<B>,
}

impl<B: LlmBackend> LlmQueryExpander<B> {
    pub fn new(backend: std::sync::Arc<B>) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl<B: LlmBackend> rag_core::QueryExpansionEngine for LlmQueryExpander<B> {
    async fn expand(&self, query: &str, context: Option<&str>) -> rag_core::Result<ExpandedQuery> {
        let prompt = build_expansion_prompt(query, context);

        let outcome = self.backend.generate(&[Message::user(prompt)]).await;
        let text = match outcome {
            Ok(result) => result.text,
            Err(e) => {
                tracing::warn!(error = %e, query, "query expansion generation failed, using unexpanded query");
                return Ok(ExpandedQuery::unexpanded(query));
            }
        };

        let Some(value) = parse_json_with_fallback(&text) else {
            tracing::warn!(query, "query expansion response had no parseable JSON, using unexpanded query");
            return Ok(ExpandedQuery::unexpanded(query));
        };

        match serde_json::from_value::<ExpansionResponse>(value) {
            Ok(response) => Ok(build_expanded_query(query, response)),
            Err(e) => {
                tracing::warn!(error = %e, query, "query expansion response malformed, using unexpanded query");
                Ok(ExpandedQuery::unexpanded(query))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use rag_core::QueryExpansionEngine;
    use rag_llm::{FinishReason, GenerationResult, LlmError};

    struct StaticBackend(String);

    #[async_trait]
    impl LlmBackend for StaticBackend {
        async fn generate(&self, _messages: &[Message]) -> std::result::Result<GenerationResult, LlmError> {
            Ok(GenerationResult {
                text: self.0.clone(),
                tokens: 0,
                total_time_ms: 0,
                finish_reason: FinishReason::Stop,
            })
        }

        async fn is_available(&self) -> bool {
            true
        }

        fn model_name(&self) -> &str {
            "static"
        }
    }

    #[tokio::test]
    async fn expands_with_original_first_at_weight_one() {
        let backend = std::sync::Arc::new(StaticBackend(
            r#"{"alternates": [{"text": "alt one", "weight": 0.8}], "complexity": "moderate", "intent": "lookup"}"#
                .to_string(),
        ));
        let expander = LlmQueryExpander::new(backend);

        let result = expander.expand("original query", None).await.unwrap();

        assert_eq!(result.queries[0].text, "original query");
        assert_eq!(result.queries[0].weight, 1.0);
        assert_eq!(result.queries[1].text, "alt one");
        assert_eq!(result.complexity, QueryComplexity::Moderate);
        assert_eq!(result.intent, "lookup");
    }

    #[tokio::test]
    async fn degrades_to_unexpanded_on_malformed_json() {
        let backend = std::sync::Arc::new(StaticBackend("not json at all".to_string()));
        let expander = LlmQueryExpander::new(backend);

        let result = expander.expand("q", None).await.unwrap();

        assert_eq!(result, ExpandedQuery::unexpanded("q"));
    }

    #[tokio::test]
    async fn clamps_non_increasing_weights() {
        let backend = std::sync::Arc::new(StaticBackend(
            r#"{"alternates": [{"text": "a", "weight": 0.9}, {"text": "b", "weight": 0.95}], "complexity": "simple", "intent": "x"}"#
                .to_string(),
        ));
        let expander = LlmQueryExpander::new(backend);

        let result = expander.expand("q", None).await.unwrap();

        assert!(result.queries[1].weight >= result.queries[2].weight);
    }
}
