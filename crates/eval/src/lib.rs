//! Evaluator implementations (spec §4.9, C9): internal LLM-as-judge and a
//! library-based batch evaluator.

pub mod internal;
pub mod ragas;

pub use internal::InternalEvaluator;
pub use ragas::RagasEvaluator;
