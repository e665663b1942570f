use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::ProfileId;

/// A finished span of active engagement with one topic. Not persisted; its
/// duration is folded into the topic aggregate and the session is dropped.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LearningSession {
    pub id: Uuid,
    pub profile_id: ProfileId,
    pub topic_id: String,
    pub started_at_ms: i64,
    pub stopped_at_ms: i64,
    pub active_ms: u64,
}

impl LearningSession {
    /// Wall-clock span between start and stop, including background time.
    pub fn duration_ms(&self) -> u64 {
        self.stopped_at_ms.saturating_sub(self.started_at_ms).max(0) as u64
    }
}
