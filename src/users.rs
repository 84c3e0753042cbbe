//! User storage backing Kakao social login

use crate::error::Result;
use crate::kakao::KakaoProfile;
use crate::types::User;

use sqlx::{Row, SqlitePool};

/// Store for member accounts
#[derive(Clone)]
pub struct UserStore {
    pool: SqlitePool,
}

impl UserStore {
    /// Create a new user store with the given SQLite pool
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Save a new user
    pub async fn save(&self, user: &User) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO users (id, kakao_id, nickname, profile_image_url, email, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&user.id)
        .bind(user.kakao_id)
        .bind(&user.nickname)
        .bind(user.profile_image_url.as_ref())
        .bind(user.email.as_ref())
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Load a user by ID
    pub async fn load(&self, id: &str) -> Result<Option<User>> {
        let row = sqlx::query(
            r#"
            SELECT id, kakao_id, nickname, profile_image_url, email, created_at, updated_at
            FROM users
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| row_to_user(&row)))
    }

    /// Find a user by Kakao account id
    pub async fn find_by_kakao_id(&self, kakao_id: i64) -> Result<Option<User>> {
        let row = sqlx::query(
            r#"
            SELECT id, kakao_id, nickname, profile_image_url, email, created_at, updated_at
            FROM users
            WHERE kakao_id = ?
            "#,
        )
        .bind(kakao_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| row_to_user(&row)))
    }

    /// Insert or refresh a user from a Kakao profile, keyed by kakao_id.
    /// Returns the stored row, with the original id on repeat logins.
    pub async fn upsert_from_profile(&self, profile: &KakaoProfile) -> Result<User> {
        let candidate = User::new(profile.kakao_id, profile.nickname.clone());

        sqlx::query(
            r#"
            INSERT INTO users (id, kakao_id, nickname, profile_image_url, email, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(kakao_id) DO UPDATE SET
                nickname = excluded.nickname,
                profile_image_url = excluded.profile_image_url,
                email = COALESCE(excluded.email, users.email),
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&candidate.id)
        .bind(candidate.kakao_id)
        .bind(&candidate.nickname)
        .bind(profile.profile_image_url.as_ref())
        .bind(profile.email.as_ref())
        .bind(candidate.created_at)
        .bind(candidate.updated_at)
        .execute(&self.pool)
        .await?;

        self.find_by_kakao_id(profile.kakao_id).await?.ok_or_else(|| {
            crate::error::ReverieError::NotFound(format!("user kakao_id={}", profile.kakao_id))
        })
    }

    /// Update editable profile fields; unset fields keep their stored value
    pub async fn update_profile(
        &self,
        id: &str,
        nickname: Option<&str>,
        profile_image_url: Option<&str>,
        email: Option<&str>,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET nickname = COALESCE(?, nickname),
                profile_image_url = COALESCE(?, profile_image_url),
                email = COALESCE(?, email),
                updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(nickname)
        .bind(profile_image_url)
        .bind(email)
        .bind(chrono::Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Delete a user; dependent rows cascade in the schema
    pub async fn delete(&self, id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Count registered users
    pub async fn count(&self) -> Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM users")
            .fetch_one(&self.pool)
            .await?;

        Ok(row.try_get("n").unwrap_or(0))
    }
}

/// Helper: Convert database row to User
fn row_to_user(row: &sqlx::sqlite::SqliteRow) -> User {
    User {
        id: row.try_get("id").unwrap_or_default(),
        kakao_id: row.try_get("kakao_id").unwrap_or_default(),
        nickname: row.try_get("nickname").unwrap_or_default(),
        profile_image_url: row.try_get("profile_image_url").ok(),
        email: row.try_get("email").ok(),
        created_at: row.try_get("created_at").unwrap_or_else(|_| chrono::Utc::now()),
        updated_at: row.try_get("updated_at").unwrap_or_else(|_| chrono::Utc::now()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn save_and_load_round_trips() {
        let pool = crate::memory_pool().await;
        let store = UserStore::new(pool);

        let user = User::new(12345, "sunja")
            .with_profile_image("https://img.example/sunja.png")
            .with_email("sunja@example.com");
        store.save(&user).await.unwrap();

        let loaded = store.load(&user.id).await.unwrap().unwrap();
        assert_eq!(loaded.kakao_id, 12345);
        assert_eq!(loaded.nickname, "sunja");
        assert_eq!(loaded.email.as_deref(), Some("sunja@example.com"));
    }

    #[tokio::test]
    async fn upsert_keeps_id_and_refreshes_profile() {
        let pool = crate::memory_pool().await;
        let store = UserStore::new(pool);

        let profile = KakaoProfile {
            kakao_id: 777,
            nickname: "before".to_string(),
            profile_image_url: None,
            email: Some("keep@example.com".to_string()),
        };
        let first = store.upsert_from_profile(&profile).await.unwrap();

        let refreshed = KakaoProfile {
            kakao_id: 777,
            nickname: "after".to_string(),
            profile_image_url: Some("https://img.example/new.png".to_string()),
            email: None,
        };
        let second = store.upsert_from_profile(&refreshed).await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.nickname, "after");
        // email survives a login that does not share one
        assert_eq!(second.email.as_deref(), Some("keep@example.com"));
    }

    #[tokio::test]
    async fn update_profile_leaves_unset_fields() {
        let pool = crate::memory_pool().await;
        let store = UserStore::new(pool);

        let user = User::new(1, "old").with_email("old@example.com");
        store.save(&user).await.unwrap();

        let changed = store
            .update_profile(&user.id, Some("new"), None, None)
            .await
            .unwrap();
        assert!(changed);

        let loaded = store.load(&user.id).await.unwrap().unwrap();
        assert_eq!(loaded.nickname, "new");
        assert_eq!(loaded.email.as_deref(), Some("old@example.com"));
    }

    #[tokio::test]
    async fn delete_missing_user_returns_false() {
        let pool = crate::memory_pool().await;
        let store = UserStore::new(pool);

        assert!(!store.delete("no-such-id").await.unwrap());
    }
}
