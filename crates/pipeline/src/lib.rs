//! Self-RAG quality-loop state machine (spec §4.10, C10).
//!
//! Wires query expansion, the retrieval orchestrator, generation, and
//! evaluation into one end-to-end request flow with an accept/regenerate/
//! refuse quality gate and a circuit breaker around every external call.

pub mod circuit_breaker;
pub mod pipeline;
pub mod router;
pub mod stage;

pub use circuit_breaker::{CircuitBreaker, CircuitBreakerConfig};
pub use pipeline::{PipelineConfig, PipelineOptions, PipelineOutcome, RagPipeline};
pub use router::{QueryRouter, RouteDecision};
pub use stage::{SelfRagDecision, Stage};
