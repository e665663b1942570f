use std::sync::Arc;

use anyhow::{Context, Result};
use log::{debug, info, warn};

use crate::{
    clock::SharedClock, learning_time::TopicLearningTimeController, models::ProfileId,
    settings::GatingSettings,
};

use super::{
    gating::{is_cooldown_elapsed, is_threshold_met, is_within_time_window},
    ProfileStore,
};

/// Decides whether a profile should be prompted with a survey for a topic.
#[derive(Clone)]
pub struct SurveyGatingController {
    clock: SharedClock,
    learning_time: TopicLearningTimeController,
    profiles: Arc<dyn ProfileStore>,
    settings: GatingSettings,
}

impl SurveyGatingController {
    pub fn new(
        clock: SharedClock,
        learning_time: TopicLearningTimeController,
        profiles: Arc<dyn ProfileStore>,
        settings: GatingSettings,
    ) -> Self {
        Self {
            clock,
            learning_time,
            profiles,
            settings,
        }
    }

    /// All gating conditions hold: inside the time-of-day window, cooldown
    /// since the last survey elapsed, and enough time spent in the topic.
    /// Read failures are logged and count as not eligible.
    pub async fn should_show_survey(&self, profile_id: &ProfileId, topic_id: &str) -> bool {
        if !self.is_time_of_day_window_open() {
            debug!("Survey gated for profile {profile_id}: outside time-of-day window");
            return false;
        }

        if !self.is_last_shown_cooldown_elapsed(profile_id).await {
            debug!("Survey gated for profile {profile_id}: cooldown not elapsed");
            return false;
        }

        if !self
            .is_aggregate_learning_time_threshold_met(profile_id, topic_id)
            .await
        {
            debug!("Survey gated for profile {profile_id}: not enough time in topic {topic_id}");
            return false;
        }

        true
    }

    /// Stamps the current time as the profile's last survey. Last write wins.
    pub async fn mark_survey_shown(&self, profile_id: &ProfileId) -> Result<()> {
        let now_ms = self.clock.now_ms();
        self.profiles
            .set_survey_last_shown_timestamp(profile_id, now_ms)
            .await
            .with_context(|| format!("failed to mark survey shown for profile {profile_id}"))?;
        info!("Survey shown to profile {profile_id} at {now_ms}");
        Ok(())
    }

    fn is_time_of_day_window_open(&self) -> bool {
        is_within_time_window(
            self.clock.now_local().time(),
            self.settings.window_start,
            self.settings.window_end,
        )
    }

    async fn is_last_shown_cooldown_elapsed(&self, profile_id: &ProfileId) -> bool {
        match self.profiles.survey_last_shown_timestamp(profile_id).await {
            Ok(last_shown_ms) => is_cooldown_elapsed(
                self.clock.now_ms(),
                last_shown_ms,
                self.settings.cooldown_ms,
            ),
            Err(err) => {
                warn!("Failed to read last survey timestamp for profile {profile_id}: {err:#}");
                false
            }
        }
    }

    async fn is_aggregate_learning_time_threshold_met(
        &self,
        profile_id: &ProfileId,
        topic_id: &str,
    ) -> bool {
        match self
            .learning_time
            .get_accumulated_time(profile_id, topic_id)
            .await
        {
            Ok(record) => {
                is_threshold_met(record.topic_learning_time_ms, self.settings.threshold_ms)
            }
            Err(err) => {
                warn!("Failed to read learning time for topic {topic_id} (profile {profile_id}): {err}");
                false
            }
        }
    }
}
