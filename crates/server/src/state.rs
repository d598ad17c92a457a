//! Shared application state (spec §6 external interfaces).
//!
//! Much flatter than a voice-agent's `AppState` — no domain config, tool
//! registry, or transport-specific services, just the RAG stack and the two
//! persistence stores a chat turn touches.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use parking_lot::RwLock;
use rag_config::Settings;
use rag_core::{DebugTrace, Evaluator, FeedbackStore, SessionStore};
use rag_pipeline::{PipelineConfig, RagPipeline};
use rag_persistence::{InMemoryFeedbackStore, InMemorySessionStore};
use rag_retrieval::{OrchestratorConfig, RetrievalOrchestrator};

use crate::wiring;
use crate::ServerError;

pub struct AppState {
    pub settings: Settings,
    pub pipeline: Arc<RagPipeline>,
    pub orchestrator: Arc<RetrievalOrchestrator>,
    pub session_store: Arc<dyn SessionStore>,
    pub feedback_store: Arc<dyn FeedbackStore>,
    pub internal_evaluator: Arc<dyn Evaluator>,
    pub ragas_evaluator: Arc<dyn Evaluator>,
    /// Keyed by `"{session_id}:{message_id}"` — populated only when a chat
    /// turn runs with `enable_debug_trace` (spec §6 `GET
    /// /admin/debug/session/{sid}/messages/{mid}`).
    pub debug_traces: RwLock<HashMap<String, DebugTrace>>,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(settings: Settings) -> Result<Self, ServerError> {
        let retriever = wiring::build_retriever()?;
        let cache = wiring::build_cache(&settings.cache);
        let reranker = Some(wiring::build_reranker(&settings.reranking)?);
        let query_expander = wiring::build_query_expander(settings.query_expansion.enabled)?;
        let graph_store = wiring::build_graph_store(&settings.graph_rag);
        let hybrid = wiring::build_hybrid(Arc::clone(&retriever), graph_store.clone(), &settings.graph_rag);
        let scoring = wiring::build_scoring(settings.scoring.clone());

        let orchestrator = Arc::new(RetrievalOrchestrator::new(OrchestratorConfig {
            retriever,
            reranker,
            cache,
            query_expander,
            graph_store,
            hybrid,
            rag_config: settings.rag.clone(),
            graph_rag_config: settings.graph_rag.clone(),
            scoring,
        }));

        let generator = wiring::build_generator()?;
        let (internal_evaluator, ragas_evaluator) = wiring::build_evaluators(&settings)?;
        let pipeline_evaluator = if settings.evaluation.enabled {
            match settings.evaluation.provider {
                rag_config::EvaluatorProvider::Internal => Some(Arc::clone(&internal_evaluator)),
                rag_config::EvaluatorProvider::Ragas => Some(Arc::clone(&ragas_evaluator)),
            }
        } else {
            None
        };

        let pipeline = Arc::new(RagPipeline::new(PipelineConfig {
            orchestrator: Arc::clone(&orchestrator),
            generator,
            evaluator: pipeline_evaluator,
            router: None,
            rag_config: settings.rag.clone(),
            self_rag: settings.self_rag.clone(),
        }));

        Ok(Self {
            settings,
            pipeline,
            orchestrator,
            session_store: Arc::new(InMemorySessionStore::new()),
            feedback_store: Arc::new(InMemoryFeedbackStore::new()),
            internal_evaluator,
            ragas_evaluator,
            debug_traces: RwLock::new(HashMap::new()),
            started_at: Instant::now(),
        })
    }

    pub fn record_debug_trace(&self, session_id: &str, message_id: &str, trace: DebugTrace) {
        self.debug_traces.write().insert(format!("{session_id}:{message_id}"), trace);
    }

    pub fn debug_trace(&self, session_id: &str, message_id: &str) -> Option<DebugTrace> {
        self.debug_traces.read().get(&format!("{session_id}:{message_id}")).cloned()
    }
}
