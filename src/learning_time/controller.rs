use std::{
    collections::HashMap,
    future::Future,
    sync::{Arc, Mutex, MutexGuard},
};

use log::{error, info};

use crate::{
    cache::{CacheBackend, PersistentCacheStore},
    clock::SharedClock,
    error::LearningTimeResult,
    models::{ProfileId, TopicLearningTime, TopicLearningTimeDatabase},
    settings::LearningTimeSettings,
};

const CACHE_NAME: &str = "topic_learning_time_database";

type LearningTimeStore = PersistentCacheStore<TopicLearningTimeDatabase>;

/// Tracks how much active time each profile has spent in each topic.
#[derive(Clone)]
pub struct TopicLearningTimeController {
    clock: SharedClock,
    backend: Arc<dyn CacheBackend>,
    settings: LearningTimeSettings,
    stores: Arc<Mutex<HashMap<ProfileId, Arc<LearningTimeStore>>>>,
}

impl TopicLearningTimeController {
    pub fn new(
        clock: SharedClock,
        backend: Arc<dyn CacheBackend>,
        settings: LearningTimeSettings,
    ) -> Self {
        Self {
            clock,
            backend,
            settings,
            stores: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn settings(&self) -> LearningTimeSettings {
        self.settings
    }

    /// Timestamp at which a learning session began.
    pub fn start_session(&self) -> i64 {
        self.clock.now_ms()
    }

    /// Timestamp at which a learning session was paused or exited.
    pub fn stop_session(&self) -> i64 {
        self.clock.now_ms()
    }

    /// `stop - start`. Ordering is the caller's responsibility.
    pub fn session_duration(&self, start_ms: i64, stop_ms: i64) -> i64 {
        stop_ms - start_ms
    }

    /// Folds `duration_ms` into the aggregate for (`profile_id`, `topic_id`).
    ///
    /// The update is queued before this returns: recordings for the same
    /// profile commit in call order even when the returned futures are polled
    /// out of order, and a dropped future still commits.
    pub fn record_session(
        &self,
        profile_id: &ProfileId,
        topic_id: &str,
        duration_ms: u64,
    ) -> impl Future<Output = LearningTimeResult<()>> + Send + 'static {
        let store = self.retrieve_cache_store(profile_id);
        let clock = self.clock.clone();
        let staleness_ms = self.settings.staleness_ms;
        let topic = topic_id.to_string();

        let pending = store.store_data_async(move |mut database: TopicLearningTimeDatabase| {
            database.record_session(&topic, duration_ms, clock.now_ms(), staleness_ms);
            database
        });

        let profile_id = profile_id.clone();
        let topic_id = topic_id.to_string();
        async move {
            match pending.await {
                Ok(database) => {
                    if let Some(record) = database.get(&topic_id) {
                        info!(
                            "Recorded {duration_ms}ms for topic {topic_id} (profile {profile_id}); aggregate {}ms",
                            record.topic_learning_time_ms
                        );
                    }
                    Ok(())
                }
                Err(err) => {
                    error!(
                        "Failed to record {duration_ms}ms of learning time for topic {topic_id} (profile {profile_id}): {err}"
                    );
                    Err(err)
                }
            }
        }
    }

    /// The topic's aggregate, or the zero record if nothing was recorded yet.
    pub async fn get_accumulated_time(
        &self,
        profile_id: &ProfileId,
        topic_id: &str,
    ) -> LearningTimeResult<TopicLearningTime> {
        let database = self.retrieve_cache_store(profile_id).read().await?;
        Ok(database.get(topic_id).cloned().unwrap_or_default())
    }

    /// Every topic aggregate stored for the profile.
    pub async fn get_all_accumulated_times(
        &self,
        profile_id: &ProfileId,
    ) -> LearningTimeResult<TopicLearningTimeDatabase> {
        self.retrieve_cache_store(profile_id).read().await
    }

    /// Wipes the profile's learning time and forgets its store.
    pub async fn remove_profile(&self, profile_id: &ProfileId) -> LearningTimeResult<()> {
        let store = self.retrieve_cache_store(profile_id);
        store.clear().await?;
        self.lock_stores().remove(profile_id);
        info!("Removed learning time for profile {profile_id}");
        Ok(())
    }

    fn retrieve_cache_store(&self, profile_id: &ProfileId) -> Arc<LearningTimeStore> {
        self.lock_stores()
            .entry(profile_id.clone())
            .or_insert_with(|| {
                Arc::new(PersistentCacheStore::new(
                    CACHE_NAME,
                    profile_id.clone(),
                    self.backend.clone(),
                ))
            })
            .clone()
    }

    fn lock_stores(&self) -> MutexGuard<'_, HashMap<ProfileId, Arc<LearningTimeStore>>> {
        self.stores
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
