use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, OptionalExtension};

use crate::{db::Database, models::ProfileId, survey::ProfileStore};

impl Database {
    pub async fn get_survey_last_shown(&self, profile_id: &ProfileId) -> Result<Option<i64>> {
        let profile_id = profile_id.to_string();
        self.execute(move |conn| {
            let shown = conn
                .query_row(
                    "SELECT survey_last_shown_ms FROM profiles WHERE profile_id = ?1",
                    params![profile_id],
                    |row| row.get::<_, Option<i64>>(0),
                )
                .optional()
                .with_context(|| format!("failed to read profile {profile_id}"))?;
            Ok(shown.flatten())
        })
        .await
    }

    pub async fn set_survey_last_shown(&self, profile_id: &ProfileId, shown_at_ms: i64) -> Result<()> {
        let profile_id = profile_id.to_string();
        let updated_at = Utc::now().to_rfc3339();
        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO profiles (profile_id, survey_last_shown_ms, updated_at)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT(profile_id) DO UPDATE SET
                     survey_last_shown_ms = excluded.survey_last_shown_ms,
                     updated_at = excluded.updated_at",
                params![profile_id, shown_at_ms, updated_at],
            )
            .with_context(|| format!("failed to update profile {profile_id}"))?;
            Ok(())
        })
        .await
    }
}

#[async_trait]
impl ProfileStore for Database {
    async fn survey_last_shown_timestamp(&self, profile_id: &ProfileId) -> Result<Option<i64>> {
        self.get_survey_last_shown(profile_id).await
    }

    async fn set_survey_last_shown_timestamp(
        &self,
        profile_id: &ProfileId,
        shown_at_ms: i64,
    ) -> Result<()> {
        self.set_survey_last_shown(profile_id, shown_at_ms).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unknown_profile_has_no_timestamp() {
        let db = Database::open_in_memory().unwrap();
        assert_eq!(
            db.get_survey_last_shown(&ProfileId::new("nobody")).await.unwrap(),
            None
        );
    }

    #[tokio::test]
    async fn last_write_wins() {
        let db = Database::open_in_memory().unwrap();
        let profile = ProfileId::new("p1");

        db.set_survey_last_shown(&profile, 100).await.unwrap();
        db.set_survey_last_shown(&profile, 250).await.unwrap();

        assert_eq!(db.get_survey_last_shown(&profile).await.unwrap(), Some(250));
    }
}
