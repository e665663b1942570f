use crate::models::ProfileId;

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Failures surfaced by the learning-time store and its persistent cache.
#[derive(Debug, thiserror::Error)]
pub enum LearningTimeError {
    #[error("failed to load {cache} for profile {profile_id}: {source}")]
    Load {
        cache: &'static str,
        profile_id: ProfileId,
        #[source]
        source: BoxError,
    },

    #[error("failed to persist {cache} for profile {profile_id}: {source}")]
    Persist {
        cache: &'static str,
        profile_id: ProfileId,
        #[source]
        source: BoxError,
    },

    #[error("cache store {cache} for profile {profile_id} is closed")]
    Closed {
        cache: &'static str,
        profile_id: ProfileId,
    },
}

impl LearningTimeError {
    pub(crate) fn load(cache: &'static str, profile_id: &ProfileId, err: anyhow::Error) -> Self {
        Self::Load {
            cache,
            profile_id: profile_id.clone(),
            source: err.into(),
        }
    }

    pub(crate) fn persist(cache: &'static str, profile_id: &ProfileId, err: anyhow::Error) -> Self {
        Self::Persist {
            cache,
            profile_id: profile_id.clone(),
            source: err.into(),
        }
    }

    pub fn profile_id(&self) -> &ProfileId {
        match self {
            Self::Load { profile_id, .. }
            | Self::Persist { profile_id, .. }
            | Self::Closed { profile_id, .. } => profile_id,
        }
    }
}

pub type LearningTimeResult<T> = Result<T, LearningTimeError>;
