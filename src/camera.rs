//! Camera session storage and status transitions

use crate::error::Result;
use crate::types::{CameraSession, CameraStatus};

use sqlx::{Row, SqlitePool};

/// Store for camera recording sessions
#[derive(Clone)]
pub struct CameraStore {
    pool: SqlitePool,
}

impl CameraStore {
    /// Create a new camera store with the given SQLite pool
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Save a new camera session
    pub async fn save(&self, session: &CameraSession) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO camera_sessions (id, user_id, status, started_at, updated_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&session.id)
        .bind(&session.user_id)
        .bind(session.status.to_string())
        .bind(session.started_at)
        .bind(session.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Load a camera session by ID
    pub async fn load(&self, id: &str) -> Result<Option<CameraSession>> {
        let row = sqlx::query(
            r#"
            SELECT id, user_id, status, started_at, updated_at
            FROM camera_sessions
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| row_to_camera_session(&row)))
    }

    /// Find a user's live (non-INACTIVE) camera session, if any
    pub async fn find_live_by_user(&self, user_id: &str) -> Result<Option<CameraSession>> {
        let row = sqlx::query(
            r#"
            SELECT id, user_id, status, started_at, updated_at
            FROM camera_sessions
            WHERE user_id = ? AND status != 'INACTIVE'
            ORDER BY started_at DESC
            LIMIT 1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| row_to_camera_session(&row)))
    }

    /// Flip ACTIVE -> RECORDING. Returns false when the session is not ACTIVE.
    pub async fn start_recording(&self, id: &str) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE camera_sessions SET status = 'RECORDING', updated_at = ? WHERE id = ? AND status = 'ACTIVE'",
        )
        .bind(chrono::Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Flip RECORDING -> ACTIVE. Returns false when the session is not RECORDING.
    pub async fn pause_recording(&self, id: &str) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE camera_sessions SET status = 'ACTIVE', updated_at = ? WHERE id = ? AND status = 'RECORDING'",
        )
        .bind(chrono::Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// End the session (any live status -> INACTIVE). Returns false when
    /// already INACTIVE or missing.
    pub async fn deactivate(&self, id: &str) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE camera_sessions SET status = 'INACTIVE', updated_at = ? WHERE id = ? AND status != 'INACTIVE'",
        )
        .bind(chrono::Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}

/// Helper: Convert database row to CameraSession
fn row_to_camera_session(row: &sqlx::sqlite::SqliteRow) -> CameraSession {
    let status_str: String = row.try_get("status").unwrap_or_default();

    CameraSession {
        id: row.try_get("id").unwrap_or_default(),
        user_id: row.try_get("user_id").unwrap_or_default(),
        status: parse_camera_status(&status_str),
        started_at: row.try_get("started_at").unwrap_or_else(|_| chrono::Utc::now()),
        updated_at: row.try_get("updated_at").unwrap_or_else(|_| chrono::Utc::now()),
    }
}

/// Helper: Parse camera status from string
fn parse_camera_status(s: &str) -> CameraStatus {
    match s {
        "ACTIVE" => CameraStatus::Active,
        "RECORDING" => CameraStatus::Recording,
        _ => CameraStatus::Inactive,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::User;
    use crate::users::UserStore;

    async fn seeded_user(pool: &SqlitePool) -> User {
        let user = User::new(200, "grandpa");
        UserStore::new(pool.clone()).save(&user).await.unwrap();
        user
    }

    #[tokio::test]
    async fn recording_transitions_follow_status_guards() {
        let pool = crate::memory_pool().await;
        let store = CameraStore::new(pool.clone());
        let user = seeded_user(&pool).await;

        let session = CameraSession::new(&user.id);
        store.save(&session).await.unwrap();

        // pause before recording does nothing
        assert!(!store.pause_recording(&session.id).await.unwrap());

        assert!(store.start_recording(&session.id).await.unwrap());
        let loaded = store.load(&session.id).await.unwrap().unwrap();
        assert_eq!(loaded.status, CameraStatus::Recording);

        // starting again while RECORDING does nothing
        assert!(!store.start_recording(&session.id).await.unwrap());

        assert!(store.pause_recording(&session.id).await.unwrap());
        assert!(store.deactivate(&session.id).await.unwrap());
        assert!(!store.deactivate(&session.id).await.unwrap());
    }

    #[tokio::test]
    async fn find_live_ignores_inactive_sessions() {
        let pool = crate::memory_pool().await;
        let store = CameraStore::new(pool.clone());
        let user = seeded_user(&pool).await;

        let session = CameraSession::new(&user.id);
        store.save(&session).await.unwrap();
        assert!(store.find_live_by_user(&user.id).await.unwrap().is_some());

        store.deactivate(&session.id).await.unwrap();
        assert!(store.find_live_by_user(&user.id).await.unwrap().is_none());
    }
}
