//! Durable cache tier for resolved avatar images.
//!
//! One row per avatar id. The image URL and the blur hash are written at
//! different times: the resolver upserts the URL synchronously, the hash
//! arrives later from a detached task. The upsert therefore never touches a
//! stored blur hash.

use sqlx::Row;

use super::Database;
use crate::errors::AppError;
use crate::models::AvatarImageRecord;
use crate::utils;
use chrono::Utc;

impl Database {
    /// Point lookup by avatar id
    pub async fn get_avatar_image(
        &self,
        avatar_id: &str,
    ) -> Result<Option<AvatarImageRecord>, AppError> {
        let row = sqlx::query(
            "SELECT avatar_id, image_url, blur_hash, updated_at
             FROM avatar_images WHERE avatar_id = ?",
        )
        .bind(avatar_id)
        .fetch_optional(&self.pool())
        .await?;

        match row {
            Some(row) => Ok(Some(AvatarImageRecord {
                avatar_id: row.get("avatar_id"),
                image_url: row.get("image_url"),
                blur_hash: row.get("blur_hash"),
                updated_at: utils::parse_datetime(&row.get::<String, _>("updated_at"))?,
            })),
            None => Ok(None),
        }
    }

    /// Insert a freshly resolved image URL, or update the URL of an existing
    /// record. The stored blur hash is deliberately left untouched; it is
    /// owned by the detached hash task.
    pub async fn upsert_avatar_image_url(
        &self,
        avatar_id: &str,
        image_url: &str,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO avatar_images (avatar_id, image_url, blur_hash, updated_at)
            VALUES (?, ?, '', ?)
            ON CONFLICT(avatar_id) DO UPDATE SET
                image_url = excluded.image_url,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(avatar_id)
        .bind(image_url)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool())
        .await?;

        Ok(())
    }

    /// Store a computed blur hash. The record's freshness timestamp belongs
    /// to the URL resolution and is not refreshed here.
    pub async fn set_avatar_blur_hash(
        &self,
        avatar_id: &str,
        blur_hash: &str,
    ) -> Result<(), AppError> {
        sqlx::query("UPDATE avatar_images SET blur_hash = ? WHERE avatar_id = ?")
            .bind(blur_hash)
            .bind(avatar_id)
            .execute(&self.pool())
            .await?;

        Ok(())
    }

    /// Clear a cached image URL that turned out to be unusable, so the next
    /// resolution after expiry does not return it again.
    pub async fn clear_avatar_image_url(&self, avatar_id: &str) -> Result<(), AppError> {
        sqlx::query("UPDATE avatar_images SET image_url = '' WHERE avatar_id = ?")
            .bind(avatar_id)
            .execute(&self.pool())
            .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::config::DatabaseConfig;
    use crate::database::Database;

    async fn test_database() -> Database {
        let config = DatabaseConfig {
            url: "sqlite::memory:".to_string(),
            max_connections: Some(1),
        };
        let database = Database::new(&config).await.unwrap();
        database.migrate().await.unwrap();
        database
    }

    #[tokio::test]
    async fn test_upsert_inserts_then_updates_url_only() {
        let database = test_database().await;

        database
            .upsert_avatar_image_url("avatar-1", "https://example.com/a.jpg")
            .await
            .unwrap();

        let record = database.get_avatar_image("avatar-1").await.unwrap().unwrap();
        assert_eq!(record.image_url, "https://example.com/a.jpg");
        assert_eq!(record.blur_hash, "");

        // A blur hash written later must survive a URL re-resolution
        database
            .set_avatar_blur_hash("avatar-1", "LEHV6nWB2yk8pyo0adR*.7kCMdnj")
            .await
            .unwrap();
        database
            .upsert_avatar_image_url("avatar-1", "https://example.com/b.jpg")
            .await
            .unwrap();

        let record = database.get_avatar_image("avatar-1").await.unwrap().unwrap();
        assert_eq!(record.image_url, "https://example.com/b.jpg");
        assert_eq!(record.blur_hash, "LEHV6nWB2yk8pyo0adR*.7kCMdnj");
    }

    #[tokio::test]
    async fn test_clear_image_url_keeps_record() {
        let database = test_database().await;

        database
            .upsert_avatar_image_url("avatar-2", "https://example.com/broken.jpg")
            .await
            .unwrap();
        database.clear_avatar_image_url("avatar-2").await.unwrap();

        let record = database.get_avatar_image("avatar-2").await.unwrap().unwrap();
        assert_eq!(record.image_url, "");
    }

    #[tokio::test]
    async fn test_missing_avatar_is_none() {
        let database = test_database().await;
        assert!(database.get_avatar_image("nobody").await.unwrap().is_none());
    }
}
