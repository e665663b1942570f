use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Aggregate active learning time for one topic within one profile.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicLearningTime {
    pub topic_id: String,
    pub topic_learning_time_ms: u64,
    pub last_updated_time_ms: i64,
}

impl TopicLearningTime {
    pub fn new(topic_id: impl Into<String>, topic_learning_time_ms: u64, now_ms: i64) -> Self {
        Self {
            topic_id: topic_id.into(),
            topic_learning_time_ms,
            last_updated_time_ms: now_ms,
        }
    }

    /// Folds a new session into the aggregate. A record not touched for longer
    /// than `staleness_ms` restarts from the session's duration.
    pub fn merge_session(&mut self, duration_ms: u64, now_ms: i64, staleness_ms: u64) {
        if self.is_stale(now_ms, staleness_ms) {
            self.topic_learning_time_ms = duration_ms;
        } else {
            self.topic_learning_time_ms = self.topic_learning_time_ms.saturating_add(duration_ms);
        }
        self.last_updated_time_ms = now_ms;
    }

    pub fn is_stale(&self, now_ms: i64, staleness_ms: u64) -> bool {
        let age_ms = now_ms.saturating_sub(self.last_updated_time_ms);
        age_ms > 0 && (age_ms as u64) > staleness_ms
    }
}

/// Everything persisted for one profile, keyed by topic id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicLearningTimeDatabase {
    #[serde(default)]
    pub aggregate_topic_learning_time: BTreeMap<String, TopicLearningTime>,
}

impl TopicLearningTimeDatabase {
    pub fn get(&self, topic_id: &str) -> Option<&TopicLearningTime> {
        self.aggregate_topic_learning_time.get(topic_id)
    }

    pub fn record_session(
        &mut self,
        topic_id: &str,
        duration_ms: u64,
        now_ms: i64,
        staleness_ms: u64,
    ) -> TopicLearningTime {
        let record = self
            .aggregate_topic_learning_time
            .entry(topic_id.to_string())
            .and_modify(|existing| existing.merge_session(duration_ms, now_ms, staleness_ms))
            .or_insert_with(|| TopicLearningTime::new(topic_id, duration_ms, now_ms));
        record.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DAY_MS: i64 = 24 * 60 * 60 * 1000;
    const STALENESS_MS: u64 = 10 * DAY_MS as u64;

    #[test]
    fn first_session_creates_record() {
        let mut db = TopicLearningTimeDatabase::default();
        let record = db.record_session("fractions", 1_000, 5, STALENESS_MS);
        assert_eq!(record, TopicLearningTime::new("fractions", 1_000, 5));
    }

    #[test]
    fn sessions_within_window_accumulate() {
        let mut db = TopicLearningTimeDatabase::default();
        db.record_session("fractions", 1_000, 0, STALENESS_MS);
        let record = db.record_session("fractions", 2_500, 10 * DAY_MS, STALENESS_MS);
        assert_eq!(record.topic_learning_time_ms, 3_500);
        assert_eq!(record.last_updated_time_ms, 10 * DAY_MS);
    }

    #[test]
    fn stale_record_restarts_from_latest_session() {
        let mut db = TopicLearningTimeDatabase::default();
        db.record_session("fractions", 1_000, 0, STALENESS_MS);
        let record = db.record_session("fractions", 2_500, 10 * DAY_MS + 1, STALENESS_MS);
        assert_eq!(record.topic_learning_time_ms, 2_500);
    }

    #[test]
    fn future_update_timestamp_is_not_stale() {
        let record = TopicLearningTime::new("ratios", 10, 20 * DAY_MS);
        assert!(!record.is_stale(0, STALENESS_MS));
    }

    #[test]
    fn topics_are_tracked_independently() {
        let mut db = TopicLearningTimeDatabase::default();
        db.record_session("fractions", 1_000, 0, STALENESS_MS);
        db.record_session("ratios", 400, 0, STALENESS_MS);
        assert_eq!(db.get("fractions").map(|r| r.topic_learning_time_ms), Some(1_000));
        assert_eq!(db.get("ratios").map(|r| r.topic_learning_time_ms), Some(400));
    }
}
