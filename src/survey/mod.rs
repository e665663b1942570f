pub mod controller;
pub mod gating;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::ProfileId;

pub use controller::SurveyGatingController;

/// Per-profile survey bookkeeping owned by the profile layer.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn survey_last_shown_timestamp(&self, profile_id: &ProfileId) -> Result<Option<i64>>;

    async fn set_survey_last_shown_timestamp(
        &self,
        profile_id: &ProfileId,
        shown_at_ms: i64,
    ) -> Result<()>;
}
