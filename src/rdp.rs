//! Reminiscence Data Point storage

use crate::error::Result;
use crate::types::{Rdp, RdpUpdate};

use sqlx::{Row, SqlitePool};

/// Store for per-session reminiscence data points
#[derive(Clone)]
pub struct RdpStore {
    pool: SqlitePool,
}

impl RdpStore {
    /// Create a new RDP store with the given SQLite pool
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Merge fields into the session's data point, creating the row on first
    /// write. Fields absent from the update keep their stored value.
    pub async fn upsert(&self, session_id: &str, update: &RdpUpdate) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO rdps (
                session_id, anchor_era, anchor_place, scene_setting, scene_people,
                highlight_moment, highlight_quote, meaning_theme, meaning_reflection,
                finalized, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, 0, ?)
            ON CONFLICT(session_id) DO UPDATE SET
                anchor_era = COALESCE(excluded.anchor_era, rdps.anchor_era),
                anchor_place = COALESCE(excluded.anchor_place, rdps.anchor_place),
                scene_setting = COALESCE(excluded.scene_setting, rdps.scene_setting),
                scene_people = COALESCE(excluded.scene_people, rdps.scene_people),
                highlight_moment = COALESCE(excluded.highlight_moment, rdps.highlight_moment),
                highlight_quote = COALESCE(excluded.highlight_quote, rdps.highlight_quote),
                meaning_theme = COALESCE(excluded.meaning_theme, rdps.meaning_theme),
                meaning_reflection = COALESCE(excluded.meaning_reflection, rdps.meaning_reflection),
                updated_at = excluded.updated_at
            "#,
        )
        .bind(session_id)
        .bind(update.anchor_era.as_ref())
        .bind(update.anchor_place.as_ref())
        .bind(update.scene_setting.as_ref())
        .bind(update.scene_people.as_ref())
        .bind(update.highlight_moment.as_ref())
        .bind(update.highlight_quote.as_ref())
        .bind(update.meaning_theme.as_ref())
        .bind(update.meaning_reflection.as_ref())
        .bind(chrono::Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Load the data point for a session
    pub async fn load(&self, session_id: &str) -> Result<Option<Rdp>> {
        let row = sqlx::query(
            r#"
            SELECT session_id, anchor_era, anchor_place, scene_setting, scene_people,
                   highlight_moment, highlight_quote, meaning_theme, meaning_reflection,
                   finalized, updated_at
            FROM rdps
            WHERE session_id = ?
            "#,
        )
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| row_to_rdp(&row)))
    }

    /// Mark the data point finalized. Returns false when already finalized
    /// or missing.
    pub async fn mark_finalized(&self, session_id: &str) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE rdps SET finalized = 1, updated_at = ? WHERE session_id = ? AND finalized = 0",
        )
        .bind(chrono::Utc::now())
        .bind(session_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}

/// Helper: Convert database row to Rdp
fn row_to_rdp(row: &sqlx::sqlite::SqliteRow) -> Rdp {
    Rdp {
        session_id: row.try_get("session_id").unwrap_or_default(),
        anchor_era: row.try_get("anchor_era").ok().flatten(),
        anchor_place: row.try_get("anchor_place").ok().flatten(),
        scene_setting: row.try_get("scene_setting").ok().flatten(),
        scene_people: row.try_get("scene_people").ok().flatten(),
        highlight_moment: row.try_get("highlight_moment").ok().flatten(),
        highlight_quote: row.try_get("highlight_quote").ok().flatten(),
        meaning_theme: row.try_get("meaning_theme").ok().flatten(),
        meaning_reflection: row.try_get("meaning_reflection").ok().flatten(),
        finalized: row.try_get::<bool, _>("finalized").unwrap_or(false),
        updated_at: row.try_get("updated_at").unwrap_or_else(|_| chrono::Utc::now()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sessions::SessionStore;
    use crate::types::{ConversationSession, User};
    use crate::users::UserStore;

    async fn seeded_session(pool: &SqlitePool) -> ConversationSession {
        let user = User::new(70, "byul");
        UserStore::new(pool.clone()).save(&user).await.unwrap();
        let session = ConversationSession::new(&user.id);
        SessionStore::new(pool.clone()).save(&session).await.unwrap();
        session
    }

    #[tokio::test]
    async fn partial_updates_merge() {
        let pool = crate::memory_pool().await;
        let store = RdpStore::new(pool.clone());
        let session = seeded_session(&pool).await;

        store
            .upsert(
                &session.id,
                &RdpUpdate {
                    anchor_era: Some("1960s".to_string()),
                    anchor_place: Some("Busan".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        store
            .upsert(
                &session.id,
                &RdpUpdate {
                    highlight_moment: Some("first day at the market".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let rdp = store.load(&session.id).await.unwrap().unwrap();
        assert_eq!(rdp.anchor_era.as_deref(), Some("1960s"));
        assert_eq!(rdp.anchor_place.as_deref(), Some("Busan"));
        assert_eq!(rdp.highlight_moment.as_deref(), Some("first day at the market"));
        assert!(!rdp.finalized);
    }

    #[tokio::test]
    async fn finalize_flips_once() {
        let pool = crate::memory_pool().await;
        let store = RdpStore::new(pool.clone());
        let session = seeded_session(&pool).await;

        store
            .upsert(
                &session.id,
                &RdpUpdate {
                    meaning_theme: Some("resilience".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert!(store.mark_finalized(&session.id).await.unwrap());
        assert!(!store.mark_finalized(&session.id).await.unwrap());
        assert!(store.load(&session.id).await.unwrap().unwrap().finalized);
    }

    #[tokio::test]
    async fn data_point_shape_is_fixed() {
        let pool = crate::memory_pool().await;
        let store = RdpStore::new(pool.clone());
        let session = seeded_session(&pool).await;

        store
            .upsert(
                &session.id,
                &RdpUpdate {
                    anchor_era: Some("1972".to_string()),
                    scene_people: Some("my mother and sisters".to_string()),
                    highlight_quote: Some("we sang all the way home".to_string()),
                    meaning_reflection: Some("hard times made us close".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let rdp = store.load(&session.id).await.unwrap().unwrap();
        let point = rdp.as_data_point();
        assert_eq!(point["anchor"]["era"], "1972");
        assert_eq!(point["scene"]["people"], "my mother and sisters");
        assert_eq!(point["highlight"]["quote"], "we sang all the way home");
        assert_eq!(point["meaning"]["reflection"], "hard times made us close");
        assert!(point["anchor"]["place"].is_null());
    }
}
