pub mod cache;
pub mod clock;
pub mod db;
pub mod error;
pub mod learning_time;
pub mod models;
pub mod settings;
pub mod survey;

use std::{path::Path, sync::Arc};

use anyhow::{Context, Result};

pub use clock::{Clock, FakeClock, SharedClock, SystemClock};
pub use db::Database;
pub use error::{LearningTimeError, LearningTimeResult};
pub use learning_time::{
    ActiveTimeListener, LearningSessionTracker, TopicLearningTimeController, TrackerStatus,
};
pub use models::{LearningSession, ProfileId, TopicLearningTime, TopicLearningTimeDatabase};
pub use settings::{GatingSettings, LearningTimeSettings, Settings, SettingsStore};
pub use survey::{ProfileStore, SurveyGatingController};

/// Everything a host application needs, sharing one database.
#[derive(Clone)]
pub struct LearningServices {
    pub db: Database,
    pub learning_time: TopicLearningTimeController,
    pub survey: SurveyGatingController,
}

impl LearningServices {
    /// Opens (or creates) `topictime.sqlite3` under `data_dir`. Must be called
    /// inside a Tokio runtime.
    pub fn open(data_dir: &Path, settings: Settings, clock: SharedClock) -> Result<Self> {
        settings.validate()?;
        std::fs::create_dir_all(data_dir)
            .with_context(|| format!("failed to create data dir {}", data_dir.display()))?;

        let db = Database::new(data_dir.join("topictime.sqlite3"))?;
        Ok(Self::with_database(db, settings, clock))
    }

    pub fn with_database(db: Database, settings: Settings, clock: SharedClock) -> Self {
        let backend = Arc::new(db.clone());
        let learning_time =
            TopicLearningTimeController::new(clock.clone(), backend.clone(), settings.learning_time);
        let survey = SurveyGatingController::new(
            clock,
            learning_time.clone(),
            backend,
            settings.gating,
        );

        Self {
            db,
            learning_time,
            survey,
        }
    }

    pub fn session_tracker(&self) -> LearningSessionTracker {
        LearningSessionTracker::new(self.learning_time.clone())
    }

    /// Wipes every record kept for the profile.
    pub async fn delete_profile(&self, profile_id: &ProfileId) -> Result<()> {
        self.learning_time.remove_profile(profile_id).await?;
        self.db.delete_profile_data(profile_id).await?;
        log::info!("Deleted all data for profile {profile_id}");
        Ok(())
    }
}

/// Installs the `env_logger` backend; `RUST_LOG` overrides the `Info` default.
pub fn init_logging() {
    let _ = env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .try_init();
}
