//! Pipeline state machine stages (spec §4.10).
//!
//! `Idle -> Routing -> Expanding -> Retrieving -> Generating ->
//! {Evaluating -> {Accept | Regenerate -> Evaluating -> Accept | Refuse}}
//! -> Done`. Any stage can fall through to `Done` carrying whatever partial
//! result exists, so this is tracked for observability rather than to gate
//! transitions the way a strict FSM would.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Idle,
    Routing,
    Expanding,
    Retrieving,
    Generating,
    Evaluating,
    Regenerating,
    Done,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Routing => "routing",
            Self::Expanding => "expanding",
            Self::Retrieving => "retrieving",
            Self::Generating => "generating",
            Self::Evaluating => "evaluating",
            Self::Regenerating => "regenerating",
            Self::Done => "done",
        }
    }
}

/// Outcome of the Self-RAG quality gate (spec §4.10 step 6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelfRagDecision {
    Accept,
    Regenerate,
    Refuse,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_as_str_matches_snake_case_serde() {
        for stage in [Stage::Idle, Stage::Routing, Stage::Expanding, Stage::Retrieving, Stage::Generating, Stage::Evaluating, Stage::Regenerating, Stage::Done] {
            let json = serde_json::to_string(&stage).unwrap();
            assert_eq!(json, format!("\"{}\"", stage.as_str()));
        }
    }
}
