use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, OptionalExtension};

use crate::{cache::CacheBackend, db::Database, models::ProfileId};

impl Database {
    /// Serialized payload stored under (`cache_name`, `profile_id`), if any.
    pub async fn get_cache_entry(
        &self,
        cache_name: &str,
        profile_id: &ProfileId,
    ) -> Result<Option<String>> {
        let cache_name = cache_name.to_string();
        let profile_id = profile_id.to_string();
        self.execute(move |conn| {
            let payload = conn
                .query_row(
                    "SELECT payload FROM cache_entries
                     WHERE cache_name = ?1 AND profile_id = ?2",
                    params![cache_name, profile_id],
                    |row| row.get::<_, String>(0),
                )
                .optional()
                .with_context(|| format!("failed to read cache entry {cache_name}"))?;
            Ok(payload)
        })
        .await
    }

    pub async fn upsert_cache_entry(
        &self,
        cache_name: &str,
        profile_id: &ProfileId,
        payload: String,
    ) -> Result<()> {
        let cache_name = cache_name.to_string();
        let profile_id = profile_id.to_string();
        let updated_at = Utc::now().to_rfc3339();
        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO cache_entries (cache_name, profile_id, payload, updated_at)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(cache_name, profile_id) DO UPDATE SET
                     payload = excluded.payload,
                     updated_at = excluded.updated_at",
                params![cache_name, profile_id, payload, updated_at],
            )
            .with_context(|| format!("failed to write cache entry {cache_name}"))?;
            Ok(())
        })
        .await
    }

    pub async fn delete_cache_entry(&self, cache_name: &str, profile_id: &ProfileId) -> Result<()> {
        let cache_name = cache_name.to_string();
        let profile_id = profile_id.to_string();
        self.execute(move |conn| {
            conn.execute(
                "DELETE FROM cache_entries WHERE cache_name = ?1 AND profile_id = ?2",
                params![cache_name, profile_id],
            )?;
            Ok(())
        })
        .await
    }

    /// Removes every row owned by the profile across all tables.
    pub async fn delete_profile_data(&self, profile_id: &ProfileId) -> Result<()> {
        let profile_id = profile_id.to_string();
        self.execute(move |conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "DELETE FROM cache_entries WHERE profile_id = ?1",
                params![profile_id],
            )?;
            tx.execute(
                "DELETE FROM profiles WHERE profile_id = ?1",
                params![profile_id],
            )?;
            tx.commit()
                .with_context(|| format!("failed to delete data for profile {profile_id}"))?;
            Ok(())
        })
        .await
    }
}

#[async_trait]
impl CacheBackend for Database {
    async fn load(&self, cache_name: &str, profile_id: &ProfileId) -> Result<Option<String>> {
        self.get_cache_entry(cache_name, profile_id).await
    }

    async fn store(&self, cache_name: &str, profile_id: &ProfileId, payload: String) -> Result<()> {
        self.upsert_cache_entry(cache_name, profile_id, payload).await
    }

    async fn delete(&self, cache_name: &str, profile_id: &ProfileId) -> Result<()> {
        self.delete_cache_entry(cache_name, profile_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn upsert_replaces_existing_payload() {
        let db = Database::open_in_memory().unwrap();
        let profile = ProfileId::new("p1");

        assert_eq!(db.get_cache_entry("topics", &profile).await.unwrap(), None);

        db.upsert_cache_entry("topics", &profile, "{\"a\":1}".into())
            .await
            .unwrap();
        db.upsert_cache_entry("topics", &profile, "{\"a\":2}".into())
            .await
            .unwrap();

        assert_eq!(
            db.get_cache_entry("topics", &profile).await.unwrap().as_deref(),
            Some("{\"a\":2}")
        );
    }

    #[tokio::test]
    async fn entries_are_scoped_by_cache_and_profile() {
        let db = Database::open_in_memory().unwrap();
        let p1 = ProfileId::new("p1");
        let p2 = ProfileId::new("p2");

        db.upsert_cache_entry("topics", &p1, "one".into()).await.unwrap();
        db.upsert_cache_entry("other", &p1, "two".into()).await.unwrap();

        assert_eq!(db.get_cache_entry("topics", &p2).await.unwrap(), None);
        assert_eq!(
            db.get_cache_entry("other", &p1).await.unwrap().as_deref(),
            Some("two")
        );

        db.delete_cache_entry("topics", &p1).await.unwrap();
        assert_eq!(db.get_cache_entry("topics", &p1).await.unwrap(), None);
        assert!(db.get_cache_entry("other", &p1).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn delete_profile_data_only_touches_that_profile() {
        let db = Database::open_in_memory().unwrap();
        let p1 = ProfileId::new("p1");
        let p2 = ProfileId::new("p2");

        db.upsert_cache_entry("topics", &p1, "one".into()).await.unwrap();
        db.upsert_cache_entry("topics", &p2, "two".into()).await.unwrap();

        db.delete_profile_data(&p1).await.unwrap();

        assert_eq!(db.get_cache_entry("topics", &p1).await.unwrap(), None);
        assert!(db.get_cache_entry("topics", &p2).await.unwrap().is_some());
    }
}
