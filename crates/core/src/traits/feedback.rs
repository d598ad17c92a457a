//! Feedback store interface (spec §6 external interfaces).

use async_trait::async_trait;

use crate::model::FeedbackData;
use crate::Result;

#[async_trait]
pub trait FeedbackStore: Send + Sync {
    async fn record(&self, feedback: FeedbackData) -> Result<()>;

    /// Feedback eligible to seed a golden evaluation set
    /// (`FeedbackData::is_golden_candidate`).
    async fn golden_candidates(&self, limit: usize) -> Result<Vec<FeedbackData>>;
}
