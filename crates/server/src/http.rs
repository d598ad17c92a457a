//! HTTP endpoints (spec §6 external interfaces).
//!
//! Chat, session history, feedback, and admin evaluation, behind a single
//! axum router. Error translation into status codes follows spec §7:
//! 503 for configuration/service failures, 404 for missing sessions or
//! traces, 400 for validation, 500 only for truly unexpected errors.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use chrono::Utc;
use rag_core::{ChatTurn, Evaluator, FeedbackData, Rating, SearchResult};
use rag_pipeline::PipelineOptions;
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::state::AppState;
use crate::ServerError;

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/chat", post(chat))
        .route("/chat/session", post(create_chat_session))
        .route("/chat/history/:session_id", get(chat_history))
        .route("/chat/session/:session_id", delete(delete_chat_session))
        .route("/chat/session/:session_id/info", get(chat_session_info))
        .route("/chat/feedback", post(submit_feedback))
        .route("/admin/evaluate", post(admin_evaluate))
        .route("/admin/evaluate/providers", get(admin_evaluate_providers))
        .route("/admin/debug/session/:session_id/messages/:message_id", get(admin_debug_trace))
        .route("/health", get(health))
        .route("/stats", get(stats))
        .route("/ping", get(ping))
        .route("/cache-stats", get(cache_stats))
        .layer(TraceLayer::new_for_http())
        .layer(build_cors_layer())
        .with_state(state)
}

fn build_cors_layer() -> CorsLayer {
    // No CORS origin allowlist exists in this deployment's config schema
    // (spec §6) — permissive, same posture the upstream router falls back
    // to when no origins are configured.
    CorsLayer::permissive()
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let message = self.to_string();
        let status: StatusCode = self.into();
        let body = Json(serde_json::json!({ "error": status.canonical_reason().unwrap_or("error"), "message": message }));
        (status, body).into_response()
    }
}

#[derive(Debug, Deserialize, Default)]
struct ChatOptions {
    #[serde(default)]
    rerank: Option<bool>,
    #[serde(default)]
    query_expansion: Option<bool>,
    #[serde(default)]
    use_graph: Option<bool>,
    #[serde(default)]
    top_k: Option<usize>,
    #[serde(default)]
    enable_debug_trace: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct ChatRequest {
    message: String,
    #[serde(default)]
    session_id: Option<String>,
    #[serde(default)]
    options: Option<ChatOptions>,
    #[serde(default)]
    #[allow(dead_code)]
    use_agent: Option<bool>,
}

#[derive(Debug, Serialize)]
struct QualityInfo {
    score: f32,
    confidence: &'static str,
    self_rag_applied: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    refusal_reason: Option<String>,
}

#[derive(Debug, Serialize)]
struct ChatMetadata {
    total_time: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    quality: Option<QualityInfo>,
}

#[derive(Debug, Serialize)]
struct ChatResponse {
    answer: String,
    sources: Vec<SearchResult>,
    session_id: String,
    message_id: String,
    processing_time: f64,
    tokens_used: usize,
    timestamp: chrono::DateTime<Utc>,
    model_info: String,
    can_evaluate: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    self_rag_metadata: Option<QualityInfo>,
    metadata: ChatMetadata,
}

fn confidence_band(score: f32) -> &'static str {
    if score >= 0.8 {
        "high"
    } else if score >= 0.6 {
        "medium"
    } else {
        "low"
    }
}

async fn chat(State(state): State<Arc<AppState>>, Json(req): Json<ChatRequest>) -> Result<Json<ChatResponse>, ServerError> {
    if req.message.trim().is_empty() {
        return Err(ServerError::InvalidRequest("message must not be empty".to_string()));
    }

    let session_id = match req.session_id {
        Some(id) if state.session_store.exists(&id).await? => id,
        Some(id) => {
            return Err(ServerError::NotFound(format!("session {id}")));
        }
        None => state.session_store.create_session().await?,
    };

    let history_turns = state.session_store.history(&session_id).await.unwrap_or_default();
    let history: Vec<(String, String)> = history_turns
        .iter()
        .rev()
        .take(10)
        .rev()
        .map(|t| (t.query.clone(), t.response.clone()))
        .collect();

    let opts = req.options.unwrap_or_default();
    let pipeline_options = PipelineOptions {
        rerank: opts.rerank.unwrap_or(true),
        query_expansion: opts.query_expansion.unwrap_or(false),
        use_graph: opts.use_graph,
        top_k: opts.top_k,
        enable_debug_trace: opts.enable_debug_trace.unwrap_or(false),
    };

    let started = std::time::Instant::now();
    let outcome = state.pipeline.run(&req.message, None, &history, &pipeline_options).await;
    let processing_time = started.elapsed().as_secs_f64();

    let message_id = Uuid::new_v4().to_string();
    let timestamp = Utc::now();

    state
        .session_store
        .append_turn(
            &session_id,
            ChatTurn { message_id: message_id.clone(), query: req.message.clone(), response: outcome.answer.clone(), timestamp },
        )
        .await?;

    if let Some(trace) = outcome.debug_trace.clone() {
        state.record_debug_trace(&session_id, &message_id, trace);
    }

    let quality = outcome.quality_score.map(|score| QualityInfo {
        score,
        confidence: confidence_band(score),
        self_rag_applied: state.settings.self_rag.enabled,
        refusal_reason: outcome.refusal_reason.clone(),
    });

    Ok(Json(ChatResponse {
        can_evaluate: !outcome.sources.is_empty(),
        self_rag_metadata: quality.as_ref().map(|q| QualityInfo {
            score: q.score,
            confidence: q.confidence,
            self_rag_applied: q.self_rag_applied,
            refusal_reason: q.refusal_reason.clone(),
        }),
        answer: outcome.answer,
        sources: outcome.sources,
        session_id,
        message_id,
        processing_time,
        tokens_used: outcome.tokens_used,
        timestamp,
        model_info: outcome.model_info,
        metadata: ChatMetadata { total_time: processing_time, quality },
    }))
}

#[derive(Debug, Serialize)]
struct CreateSessionResponse {
    session_id: String,
    message: String,
    timestamp: chrono::DateTime<Utc>,
}

async fn create_chat_session(State(state): State<Arc<AppState>>) -> Result<Json<CreateSessionResponse>, ServerError> {
    let session_id = state.session_store.create_session().await?;
    Ok(Json(CreateSessionResponse { session_id, message: "session created".to_string(), timestamp: Utc::now() }))
}

#[derive(Debug, Deserialize)]
struct HistoryQuery {
    limit: Option<usize>,
    offset: Option<usize>,
}

#[derive(Debug, Serialize)]
struct HistoryResponse {
    session_id: String,
    messages: Vec<ChatTurn>,
    total_messages: usize,
    limit: usize,
    offset: usize,
    has_more: bool,
}

async fn chat_history(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<HistoryResponse>, ServerError> {
    let all = state.session_store.history(&session_id).await?;
    let total_messages = all.len();
    let limit = query.limit.unwrap_or(50);
    let offset = query.offset.unwrap_or(0);
    let messages: Vec<ChatTurn> = all.into_iter().skip(offset).take(limit).collect();
    let has_more = offset + messages.len() < total_messages;

    Ok(Json(HistoryResponse { session_id, messages, total_messages, limit, offset, has_more }))
}

async fn delete_chat_session(State(state): State<Arc<AppState>>, Path(session_id): Path<String>) -> Result<Json<serde_json::Value>, ServerError> {
    state.session_store.delete_session(&session_id).await?;
    Ok(Json(serde_json::json!({ "session_id": session_id, "deleted": true })))
}

#[derive(Debug, Serialize)]
struct SessionInfoResponse {
    session_id: String,
    exists: bool,
    turn_count: usize,
}

async fn chat_session_info(State(state): State<Arc<AppState>>, Path(session_id): Path<String>) -> Result<Json<SessionInfoResponse>, ServerError> {
    if !state.session_store.exists(&session_id).await? {
        return Err(ServerError::NotFound(format!("session {session_id}")));
    }
    let turn_count = state.session_store.history(&session_id).await?.len();
    Ok(Json(SessionInfoResponse { session_id, exists: true, turn_count }))
}

#[derive(Debug, Deserialize)]
struct FeedbackRequest {
    session_id: String,
    message_id: String,
    rating: i8,
    #[serde(default)]
    comment: Option<String>,
    #[serde(default)]
    query: Option<String>,
    #[serde(default)]
    response: Option<String>,
}

#[derive(Debug, Serialize)]
struct FeedbackResponse {
    success: bool,
    golden_candidate: bool,
}

async fn submit_feedback(State(state): State<Arc<AppState>>, Json(req): Json<FeedbackRequest>) -> Result<Json<FeedbackResponse>, ServerError> {
    let rating = Rating::from_i8(req.rating).map_err(ServerError::from)?;
    let feedback = FeedbackData {
        session_id: req.session_id,
        message_id: req.message_id,
        rating,
        comment: req.comment,
        query: req.query,
        response: req.response,
        timestamp: Utc::now(),
    };
    let golden_candidate = feedback.is_golden_candidate();
    state.feedback_store.record(feedback).await?;
    Ok(Json(FeedbackResponse { success: true, golden_candidate }))
}

#[derive(Debug, Deserialize)]
struct EvaluationSample {
    query: String,
    answer: String,
    #[serde(default)]
    context: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct EvaluateRequest {
    samples: Vec<EvaluationSample>,
    #[serde(default = "default_eval_provider")]
    provider: String,
}

fn default_eval_provider() -> String {
    "internal".to_string()
}

#[derive(Debug, Serialize)]
struct EvaluateSummary {
    avg_faithfulness: f32,
    avg_relevance: f32,
    avg_overall: f32,
    min_overall: f32,
    max_overall: f32,
}

#[derive(Debug, Serialize)]
struct EvaluateResponse {
    success: bool,
    results: Vec<rag_core::EvaluationResult>,
    summary: EvaluateSummary,
    provider: String,
    sample_count: usize,
    message: String,
}

async fn admin_evaluate(State(state): State<Arc<AppState>>, Json(req): Json<EvaluateRequest>) -> Result<Json<EvaluateResponse>, ServerError> {
    if req.samples.is_empty() || req.samples.len() > 100 {
        return Err(ServerError::InvalidRequest("samples must contain between 1 and 100 entries".to_string()));
    }

    let evaluator: &Arc<dyn Evaluator> = match req.provider.as_str() {
        "internal" => &state.internal_evaluator,
        "ragas" => &state.ragas_evaluator,
        other => return Err(ServerError::InvalidRequest(format!("unknown evaluation provider: {other}"))),
    };

    let mut results = Vec::with_capacity(req.samples.len());
    for sample in &req.samples {
        let context: Vec<SearchResult> =
            sample.context.iter().enumerate().map(|(i, c)| SearchResult::new(i.to_string(), c.clone(), 1.0)).collect();
        let result = evaluator.evaluate(&sample.query, &sample.answer, &context).await?;
        results.push(result);
    }

    let n = results.len() as f32;
    let avg_faithfulness = results.iter().map(|r| r.faithfulness).sum::<f32>() / n;
    let avg_relevance = results.iter().map(|r| r.relevance).sum::<f32>() / n;
    let avg_overall = results.iter().map(|r| r.overall).sum::<f32>() / n;
    let min_overall = results.iter().map(|r| r.overall).fold(f32::INFINITY, f32::min);
    let max_overall = results.iter().map(|r| r.overall).fold(f32::NEG_INFINITY, f32::max);

    Ok(Json(EvaluateResponse {
        success: true,
        sample_count: results.len(),
        results,
        summary: EvaluateSummary { avg_faithfulness, avg_relevance, avg_overall, min_overall, max_overall },
        provider: req.provider,
        message: "evaluation complete".to_string(),
    }))
}

async fn admin_evaluate_providers() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "providers": ["internal", "ragas"],
        "default": "internal",
        "description": {
            "internal": "LLM-as-judge scoring faithfulness and relevance against retrieved context",
            "ragas": "library-based batch evaluator (unavailable in this build, always returns a neutral score)",
        }
    }))
}

async fn admin_debug_trace(
    State(state): State<Arc<AppState>>,
    Path((session_id, message_id)): Path<(String, String)>,
) -> Result<Json<rag_core::DebugTrace>, ServerError> {
    state
        .debug_trace(&session_id, &message_id)
        .map(Json)
        .ok_or_else(|| ServerError::NotFound(format!("debug trace for session {session_id} message {message_id}")))
}

async fn health(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let retriever_healthy = state.orchestrator.health_check().await;
    Json(serde_json::json!({
        "status": if retriever_healthy { "ok" } else { "degraded" },
        "retriever_healthy": retriever_healthy,
        "uptime_seconds": state.started_at.elapsed().as_secs(),
    }))
}

async fn stats(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let stats = state.orchestrator.stats();
    Json(serde_json::json!({
        "total_requests": stats.total_requests,
        "cache_hits": stats.cache_hits,
        "cache_misses": stats.cache_misses,
        "query_expansion_count": stats.query_expansion_count,
        "hybrid_search_count": stats.hybrid_search_count,
        "retrieval_count": stats.retrieval_count,
        "rerank_count": stats.rerank_count,
        "uptime_seconds": state.started_at.elapsed().as_secs(),
    }))
}

async fn ping() -> &'static str {
    "pong"
}

async fn cache_stats(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    match state.orchestrator.cache_stats() {
        Some(stats) => Json(serde_json::json!({
            "enabled": true,
            "hits": stats.hits,
            "misses": stats.misses,
            "sets": stats.sets,
            "invalidations": stats.invalidations,
            "current_size": stats.current_size,
            "max_size": stats.max_size,
            "saved_time_ms": stats.saved_time_ms,
        })),
        None => Json(serde_json::json!({ "enabled": false })),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_settings() -> rag_config::Settings {
        rag_config::Settings::default()
    }

    #[test]
    fn router_builds_with_default_settings() {
        let state = Arc::new(crate::state::AppState::new(test_settings()).expect("app state builds"));
        let _router = create_router(state);
    }

    #[test]
    fn confidence_bands_match_spec_thresholds() {
        assert_eq!(confidence_band(0.9), "high");
        assert_eq!(confidence_band(0.8), "high");
        assert_eq!(confidence_band(0.7), "medium");
        assert_eq!(confidence_band(0.6), "medium");
        assert_eq!(confidence_band(0.59), "low");
    }
}
