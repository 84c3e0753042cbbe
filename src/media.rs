//! Uploaded media file records

use crate::error::Result;
use crate::types::MediaFile;

use sqlx::{Row, SqlitePool};

/// Store for uploaded media file metadata
#[derive(Clone)]
pub struct MediaStore {
    pool: SqlitePool,
}

impl MediaStore {
    /// Create a new media store with the given SQLite pool
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Save a new media file record
    pub async fn save(&self, file: &MediaFile) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO media_files (id, user_id, file_name, content_type, byte_len, stored_path, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&file.id)
        .bind(&file.user_id)
        .bind(&file.file_name)
        .bind(&file.content_type)
        .bind(file.byte_len)
        .bind(&file.stored_path)
        .bind(file.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Load a media file record by ID
    pub async fn load(&self, id: &str) -> Result<Option<MediaFile>> {
        let row = sqlx::query(
            r#"
            SELECT id, user_id, file_name, content_type, byte_len, stored_path, created_at
            FROM media_files
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| row_to_media_file(&row)))
    }

    /// List a user's uploads, newest first
    pub async fn list_by_user(&self, user_id: &str, limit: i64) -> Result<Vec<MediaFile>> {
        let rows = sqlx::query(
            r#"
            SELECT id, user_id, file_name, content_type, byte_len, stored_path, created_at
            FROM media_files
            WHERE user_id = ?
            ORDER BY created_at DESC
            LIMIT ?
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(row_to_media_file).collect())
    }

    /// Delete a media file record
    pub async fn delete(&self, id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM media_files WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

/// Helper: Convert database row to MediaFile
fn row_to_media_file(row: &sqlx::sqlite::SqliteRow) -> MediaFile {
    MediaFile {
        id: row.try_get("id").unwrap_or_default(),
        user_id: row.try_get("user_id").unwrap_or_default(),
        file_name: row.try_get("file_name").unwrap_or_default(),
        content_type: row.try_get("content_type").unwrap_or_default(),
        byte_len: row.try_get("byte_len").unwrap_or(0),
        stored_path: row.try_get("stored_path").unwrap_or_default(),
        created_at: row.try_get("created_at").unwrap_or_else(|_| chrono::Utc::now()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::User;
    use crate::users::UserStore;

    #[tokio::test]
    async fn list_by_user_only_shows_own_files() {
        let pool = crate::memory_pool().await;
        let users = UserStore::new(pool.clone());
        let store = MediaStore::new(pool.clone());

        let alice = User::new(1, "alice");
        let bob = User::new(2, "bob");
        users.save(&alice).await.unwrap();
        users.save(&bob).await.unwrap();

        let photo = MediaFile::new(&alice.id, "wedding.jpg", "image/jpeg", 1024, "media/abc-wedding.jpg");
        store.save(&photo).await.unwrap();

        assert_eq!(store.list_by_user(&alice.id, 10).await.unwrap().len(), 1);
        assert!(store.list_by_user(&bob.id, 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn delete_round_trip() {
        let pool = crate::memory_pool().await;
        let users = UserStore::new(pool.clone());
        let store = MediaStore::new(pool.clone());

        let user = User::new(3, "carol");
        users.save(&user).await.unwrap();

        let file = MediaFile::new(&user.id, "song.mp3", "audio/mpeg", 2048, "media/xyz-song.mp3");
        store.save(&file).await.unwrap();

        let loaded = store.load(&file.id).await.unwrap().unwrap();
        assert_eq!(loaded.content_type, "audio/mpeg");
        assert_eq!(loaded.byte_len, 2048);

        assert!(store.delete(&file.id).await.unwrap());
        assert!(store.load(&file.id).await.unwrap().is_none());
    }
}
