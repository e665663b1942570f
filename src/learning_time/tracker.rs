use std::sync::{Mutex, MutexGuard};

use anyhow::{anyhow, Result};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{LearningSession, ProfileId};

use super::TopicLearningTimeController;

/// Hooks fired when the host application moves between foreground and background.
pub trait ActiveTimeListener: Send + Sync {
    fn on_app_in_foreground(&self);

    /// Returns the active time accumulated so far in the current session.
    fn on_app_in_background(&self) -> u64;
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum TrackerStatus {
    #[default]
    Idle,
    Running,
    Paused,
}

#[derive(Debug, Clone, Default)]
struct TrackerState {
    status: TrackerStatus,
    session_id: Option<Uuid>,
    profile_id: Option<ProfileId>,
    topic_id: Option<String>,
    started_at_ms: i64,
    /// Foreground time from earlier running windows; combines with
    /// `running_anchor_ms` to give the true active duration.
    active_ms_baseline: u64,
    running_anchor_ms: Option<i64>,
}

impl TrackerState {
    fn current_active_ms(&self, now_ms: i64) -> u64 {
        match (self.status, self.running_anchor_ms) {
            (TrackerStatus::Running, Some(anchor)) => self
                .active_ms_baseline
                .saturating_add(now_ms.saturating_sub(anchor).max(0) as u64),
            _ => self.active_ms_baseline,
        }
    }

    fn pause(&mut self, now_ms: i64) {
        self.active_ms_baseline = self.current_active_ms(now_ms);
        self.running_anchor_ms = None;
        self.status = TrackerStatus::Paused;
    }

    fn resume(&mut self, now_ms: i64) {
        self.running_anchor_ms = Some(now_ms);
        self.status = TrackerStatus::Running;
    }
}

/// Follows one learning session at a time, counting only time the app spent
/// in the foreground, and records it against the topic when the session ends.
pub struct LearningSessionTracker {
    controller: TopicLearningTimeController,
    state: Mutex<TrackerState>,
}

impl LearningSessionTracker {
    pub fn new(controller: TopicLearningTimeController) -> Self {
        Self {
            controller,
            state: Mutex::new(TrackerState::default()),
        }
    }

    pub fn status(&self) -> TrackerStatus {
        self.lock_state().status
    }

    pub fn active_ms(&self) -> u64 {
        let now_ms = self.controller.stop_session();
        self.lock_state().current_active_ms(now_ms)
    }

    pub fn begin(&self, profile_id: ProfileId, topic_id: impl Into<String>) -> Result<Uuid> {
        let mut state = self.lock_state();
        if state.status != TrackerStatus::Idle {
            return Err(anyhow!("learning session already active"));
        }

        let session_id = Uuid::new_v4();
        let started_at_ms = self.controller.start_session();
        *state = TrackerState {
            status: TrackerStatus::Running,
            session_id: Some(session_id),
            profile_id: Some(profile_id),
            topic_id: Some(topic_id.into()),
            started_at_ms,
            active_ms_baseline: 0,
            running_anchor_ms: Some(started_at_ms),
        };
        Ok(session_id)
    }

    /// Ends the session and folds its foreground time into the topic aggregate.
    pub async fn finish(&self) -> Result<LearningSession> {
        let session = {
            let mut state = self.lock_state();
            if state.status == TrackerStatus::Idle {
                return Err(anyhow!("no active learning session to finish"));
            }

            let stopped_at_ms = self.controller.stop_session();
            let active_ms = state.current_active_ms(stopped_at_ms);
            let finished = std::mem::take(&mut *state);

            LearningSession {
                id: finished
                    .session_id
                    .ok_or_else(|| anyhow!("missing session id"))?,
                profile_id: finished
                    .profile_id
                    .ok_or_else(|| anyhow!("missing profile id"))?,
                topic_id: finished
                    .topic_id
                    .ok_or_else(|| anyhow!("missing topic id"))?,
                started_at_ms: finished.started_at_ms,
                stopped_at_ms,
                active_ms,
            }
        };

        self.controller
            .record_session(&session.profile_id, &session.topic_id, session.active_ms)
            .await?;

        info!(
            "Finished learning session {} for topic {}: {}ms active of {}ms",
            session.id,
            session.topic_id,
            session.active_ms,
            session.duration_ms()
        );
        Ok(session)
    }

    /// Drops the current session without recording anything.
    pub fn cancel(&self) {
        let mut state = self.lock_state();
        if let Some(session_id) = state.session_id {
            warn!("Cancelled learning session {session_id}");
        }
        *state = TrackerState::default();
    }

    fn lock_state(&self) -> MutexGuard<'_, TrackerState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl ActiveTimeListener for LearningSessionTracker {
    fn on_app_in_foreground(&self) {
        let now_ms = self.controller.start_session();
        let mut state = self.lock_state();
        if state.status == TrackerStatus::Paused {
            state.resume(now_ms);
        }
    }

    fn on_app_in_background(&self) -> u64 {
        let now_ms = self.controller.stop_session();
        let mut state = self.lock_state();
        if state.status == TrackerStatus::Running {
            state.pause(now_ms);
        }
        state.active_ms_baseline
    }
}
