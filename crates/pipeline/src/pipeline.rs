//! Self-RAG quality-loop pipeline (spec §4.10, C10).
//!
//! Ties together query expansion (C7), the retrieval orchestrator (C8),
//! generation, and the evaluator (C9) into the end-to-end request flow:
//! resolve session context, optionally route, optionally expand, retrieve,
//! generate, and — if Self-RAG is enabled — evaluate and possibly
//! regenerate once before accepting or refusing.

use std::sync::Arc;
use std::time::Instant;

use rag_config::{RagConfig, SelfRagConfig};
use rag_core::{DebugDocument, DebugTrace, Evaluator, Filters, Generator, SearchResult, SelfRagTrace};
use rag_retrieval::RetrievalOrchestrator;

use crate::circuit_breaker::{CircuitBreaker, CircuitBreakerConfig};
use crate::router::QueryRouter;
use crate::stage::{SelfRagDecision, Stage};

const REFUSAL_MESSAGE: &str =
    "I wasn't able to put together a reliable answer to that from the available context. Could you rephrase or narrow the question?";

#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub rerank: bool,
    pub query_expansion: bool,
    pub use_graph: Option<bool>,
    pub top_k: Option<usize>,
    pub enable_debug_trace: bool,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self { rerank: true, query_expansion: false, use_graph: None, top_k: None, enable_debug_trace: false }
    }
}

#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    pub answer: String,
    pub sources: Vec<SearchResult>,
    /// Approximate token count — the `Generator` trait returns plain text,
    /// not a provider token count, so this is a whitespace-split estimate.
    pub tokens_used: usize,
    pub model_info: String,
    pub quality_score: Option<f32>,
    pub refusal_reason: Option<String>,
    pub debug_trace: Option<DebugTrace>,
}

pub struct PipelineConfig {
    pub orchestrator: Arc<RetrievalOrchestrator>,
    pub generator: Arc<dyn Generator>,
    pub evaluator: Option<Arc<dyn Evaluator>>,
    pub router: Option<Arc<dyn QueryRouter>>,
    pub rag_config: RagConfig,
    pub self_rag: SelfRagConfig,
}

pub struct RagPipeline {
    orchestrator: Arc<RetrievalOrchestrator>,
    generator: Arc<dyn Generator>,
    evaluator: Option<Arc<dyn Evaluator>>,
    router: Option<Arc<dyn QueryRouter>>,
    rag_config: RagConfig,
    self_rag: SelfRagConfig,
    generation_breaker: CircuitBreaker,
    evaluation_breaker: CircuitBreaker,
}

impl RagPipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            orchestrator: config.orchestrator,
            generator: config.generator,
            evaluator: config.evaluator,
            router: config.router,
            rag_config: config.rag_config,
            self_rag: config.self_rag,
            generation_breaker: CircuitBreaker::new("generator", CircuitBreakerConfig::default()),
            evaluation_breaker: CircuitBreaker::new("evaluator", CircuitBreakerConfig::default()),
        }
    }

    /// Run the full pipeline for one chat turn. `session_context` is the
    /// resolved session-context string (spec §4.10 step 1); resolving it
    /// from a session id is the server's job, not the pipeline's.
    /// `_session_context` is the resolved session-context string (spec
    /// §4.10 step 1, resolution is the server's job); reserved for a future
    /// router/generation hook, not yet consumed by either.
    pub async fn run(
        &self,
        query: &str,
        _session_context: Option<&str>,
        history: &[(String, String)],
        options: &PipelineOptions,
    ) -> PipelineOutcome {
        let mut stage = Stage::Idle;
        let expanded_queries: Vec<String> = Vec::new();
        let mut debug_docs = Vec::new();
        let set_stage = |stage: &mut Stage, next: Stage| {
            tracing::debug!(from = stage.as_str(), to = next.as_str(), "pipeline transition");
            *stage = next;
        };

        set_stage(&mut stage, Stage::Routing);
        let use_rag = match &self.router {
            Some(router) => match router.route(query).await {
                Ok(decision) => decision.use_rag,
                Err(e) => {
                    tracing::warn!(error = %e, "query router failed, defaulting to RAG");
                    true
                }
            },
            None => true,
        };

        // Expansion (C7) is performed inside the orchestrator itself, which
        // owns the configured `QueryExpansionEngine` and folds multi-query
        // RRF fusion into retrieval (spec §4.6, §4.7 step 3). The pipeline's
        // job here is just to decide whether it's switched on for this
        // request; the expanded query texts aren't surfaced back across
        // that boundary, so `debug_trace.expanded_queries` stays empty.
        set_stage(&mut stage, Stage::Expanding);
        let query_expansion_enabled = use_rag && options.query_expansion;
        let final_query = query.to_string();

        set_stage(&mut stage, Stage::Retrieving);
        let context = if use_rag {
            let top_k = options.top_k.unwrap_or(self.rag_config.top_k);
            let filters: Option<&Filters> = None;
            self.orchestrator.search_and_rerank(&final_query, top_k, filters, options.rerank, query_expansion_enabled, options.use_graph).await
        } else {
            Vec::new()
        };

        if options.enable_debug_trace {
            debug_docs = context
                .iter()
                .map(|r| DebugDocument { id: r.id.clone(), stage_scores: [("final".to_string(), r.score)].into_iter().collect() })
                .collect();
        }

        set_stage(&mut stage, Stage::Generating);
        let answer = self.generate(&final_query, &context, history).await;

        let mut quality_score = None;
        let mut refusal_reason = None;

        if self.self_rag.enabled {
            if let Some(evaluator) = &self.evaluator {
                set_stage(&mut stage, Stage::Evaluating);
                let first_eval = self.evaluate(evaluator.as_ref(), &final_query, &answer, &context).await;

                let (final_answer, final_score, trace) = match self.decide(first_eval.overall) {
                    SelfRagDecision::Accept => (answer, first_eval.overall, SelfRagTrace { initial_quality: first_eval.overall, regenerated: false, final_quality: first_eval.overall }),
                    SelfRagDecision::Refuse => {
                        refusal_reason = Some(format!("low confidence answer (quality {:.2})", first_eval.overall));
                        (REFUSAL_MESSAGE.to_string(), first_eval.overall, SelfRagTrace { initial_quality: first_eval.overall, regenerated: false, final_quality: first_eval.overall })
                    }
                    SelfRagDecision::Regenerate => {
                        set_stage(&mut stage, Stage::Regenerating);
                        let augmented_query = format!(
                            "{final_query}\n\n(Your previous answer scored low on quality — faithfulness {:.2}, relevance {:.2}. Answer again, staying strictly grounded in the provided context.)",
                            first_eval.faithfulness, first_eval.relevance
                        );
                        let regenerated = self.generate(&augmented_query, &context, history).await;

                        set_stage(&mut stage, Stage::Evaluating);
                        let second_eval = self.evaluate(evaluator.as_ref(), &final_query, &regenerated, &context).await;

                        let trace = SelfRagTrace { initial_quality: first_eval.overall, regenerated: true, final_quality: second_eval.overall };
                        if second_eval.overall >= first_eval.overall {
                            (regenerated, second_eval.overall, trace)
                        } else {
                            (answer, first_eval.overall, trace)
                        }
                    }
                };

                quality_score = Some(final_score);

                let debug_trace = options.enable_debug_trace.then(|| DebugTrace {
                    original_query: query.to_string(),
                    expanded_queries,
                    final_query: final_query.clone(),
                    retrieved: debug_docs,
                    self_rag: Some(trace),
                    generation_prompt: None,
                });

                return PipelineOutcome {
                    tokens_used: estimate_tokens(&final_answer),
                    model_info: self.generator.name().to_string(),
                    answer: final_answer,
                    sources: context,
                    quality_score,
                    refusal_reason,
                    debug_trace,
                };
            }
        }

        set_stage(&mut stage, Stage::Done);
        let debug_trace = options.enable_debug_trace.then(|| DebugTrace {
            original_query: query.to_string(),
            expanded_queries,
            final_query,
            retrieved: debug_docs,
            self_rag: None,
            generation_prompt: None,
        });

        PipelineOutcome {
            tokens_used: estimate_tokens(&answer),
            model_info: self.generator.name().to_string(),
            answer,
            sources: context,
            quality_score,
            refusal_reason,
            debug_trace,
        }
    }

    async fn generate(&self, query: &str, context: &[SearchResult], history: &[(String, String)]) -> String {
        let started = Instant::now();
        let result = self
            .generation_breaker
            .call(|| self.generator.generate(query, context, history))
            .await;
        tracing::debug!(elapsed_ms = started.elapsed().as_millis() as u64, "generation call completed");

        match result {
            Some(Ok(answer)) => answer,
            Some(Err(e)) => {
                tracing::error!(error = %e, "generation failed");
                REFUSAL_MESSAGE.to_string()
            }
            None => REFUSAL_MESSAGE.to_string(),
        }
    }

    async fn evaluate(&self, evaluator: &dyn Evaluator, query: &str, answer: &str, context: &[SearchResult]) -> rag_core::EvaluationResult {
        let result = self.evaluation_breaker.call(|| evaluator.evaluate(query, answer, context)).await;
        match result {
            Some(Ok(evaluation)) => evaluation,
            Some(Err(e)) => {
                tracing::warn!(error = %e, "evaluation failed, treating as neutral");
                rag_core::EvaluationResult::neutral(format!("evaluation failed: {e}"))
            }
            None => rag_core::EvaluationResult::neutral("evaluator circuit open"),
        }
    }

    fn decide(&self, overall: f32) -> SelfRagDecision {
        if overall >= self.self_rag.accept_threshold {
            SelfRagDecision::Accept
        } else if overall >= self.self_rag.regenerate_threshold {
            SelfRagDecision::Regenerate
        } else {
            SelfRagDecision::Refuse
        }
    }
}

fn estimate_tokens(text: &str) -> usize {
    text.split_whitespace().count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use rag_config::{GraphRagConfig, ScoringConfig};
    use rag_core::Retriever;
    use rag_retrieval::OrchestratorConfig;
    use rag_retrieval::ScoringService;

    struct StubRetriever(Vec<SearchResult>);

    #[async_trait]
    impl Retriever for StubRetriever {
        async fn search(&self, _query: &str, _top_k: usize, _filters: Option<&Filters>) -> rag_core::Result<Vec<SearchResult>> {
            Ok(self.0.clone())
        }
        async fn add_documents(&self, _documents: Vec<SearchResult>) -> rag_core::Result<usize> {
            Ok(0)
        }
    }

    struct StubGenerator(String);

    #[async_trait]
    impl Generator for StubGenerator {
        async fn generate(&self, _query: &str, _context: &[SearchResult], _history: &[(String, String)]) -> rag_core::Result<String> {
            Ok(self.0.clone())
        }
        fn name(&self) -> &str {
            "stub-generator"
        }
    }

    struct StubEvaluator(f32);

    #[async_trait]
    impl Evaluator for StubEvaluator {
        async fn evaluate(&self, _query: &str, _answer: &str, _context: &[SearchResult]) -> rag_core::Result<rag_core::EvaluationResult> {
            Ok(rag_core::EvaluationResult::from_faithfulness_relevance(self.0, self.0, "stub"))
        }
        fn name(&self) -> &str {
            "stub-evaluator"
        }
    }

    fn orchestrator(docs: Vec<SearchResult>) -> Arc<RetrievalOrchestrator> {
        Arc::new(RetrievalOrchestrator::new(OrchestratorConfig {
            retriever: Arc::new(StubRetriever(docs)),
            reranker: None,
            cache: None,
            query_expander: None,
            graph_store: None,
            hybrid: None,
            rag_config: RagConfig::default(),
            graph_rag_config: GraphRagConfig::default(),
            scoring: ScoringService::new(ScoringConfig::default()),
        }))
    }

    fn pipeline(docs: Vec<SearchResult>, answer: &str, evaluator: Option<Arc<dyn Evaluator>>, self_rag: SelfRagConfig) -> RagPipeline {
        RagPipeline::new(PipelineConfig {
            orchestrator: orchestrator(docs),
            generator: Arc::new(StubGenerator(answer.to_string())),
            evaluator,
            router: None,
            rag_config: RagConfig::default(),
            self_rag,
        })
    }

    #[tokio::test]
    async fn plain_pipeline_without_self_rag_returns_generated_answer() {
        let docs = vec![SearchResult::new("1", "doc one", 0.9)];
        let p = pipeline(docs, "the answer", None, SelfRagConfig::default());

        let outcome = p.run("what is it?", None, &[], &PipelineOptions::default()).await;

        assert_eq!(outcome.answer, "the answer");
        assert!(outcome.quality_score.is_none());
        assert!(outcome.refusal_reason.is_none());
        assert_eq!(outcome.sources.len(), 1);
    }

    #[tokio::test]
    async fn high_quality_answer_is_accepted() {
        let docs = vec![SearchResult::new("1", "doc one", 0.9)];
        let self_rag = SelfRagConfig { enabled: true, accept_threshold: 0.7, regenerate_threshold: 0.4 };
        let p = pipeline(docs, "great answer", Some(Arc::new(StubEvaluator(0.9))), self_rag);

        let outcome = p.run("what is it?", None, &[], &PipelineOptions::default()).await;

        assert_eq!(outcome.answer, "great answer");
        assert_eq!(outcome.quality_score, Some(0.9));
        assert!(outcome.refusal_reason.is_none());
    }

    #[tokio::test]
    async fn low_quality_answer_is_refused() {
        let docs = vec![SearchResult::new("1", "doc one", 0.9)];
        let self_rag = SelfRagConfig { enabled: true, accept_threshold: 0.7, regenerate_threshold: 0.4 };
        let p = pipeline(docs, "bad answer", Some(Arc::new(StubEvaluator(0.1))), self_rag);

        let outcome = p.run("what is it?", None, &[], &PipelineOptions::default()).await;

        assert_eq!(outcome.answer, REFUSAL_MESSAGE);
        assert!(outcome.refusal_reason.is_some());
    }

    #[tokio::test]
    async fn mid_quality_answer_triggers_regeneration() {
        let docs = vec![SearchResult::new("1", "doc one", 0.9)];
        let self_rag = SelfRagConfig { enabled: true, accept_threshold: 0.95, regenerate_threshold: 0.4 };
        let p = pipeline(docs, "ok answer", Some(Arc::new(StubEvaluator(0.5))), self_rag);

        let outcome = p.run("what is it?", None, &[], &PipelineOptions::default()).await;

        // StubEvaluator always scores 0.5 regardless of answer, so after
        // regeneration the score ties and the first answer is kept.
        assert_eq!(outcome.answer, "ok answer");
        assert_eq!(outcome.quality_score, Some(0.5));
    }

    #[tokio::test]
    async fn debug_trace_collected_only_when_requested() {
        let docs = vec![SearchResult::new("1", "doc one", 0.9)];
        let p = pipeline(docs, "answer", None, SelfRagConfig::default());

        let without = p.run("q", None, &[], &PipelineOptions::default()).await;
        assert!(without.debug_trace.is_none());

        let opts = PipelineOptions { enable_debug_trace: true, ..PipelineOptions::default() };
        let with = p.run("q", None, &[], &opts).await;
        assert!(with.debug_trace.is_some());
        assert_eq!(with.debug_trace.unwrap().retrieved.len(), 1);
    }
}
