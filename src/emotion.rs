//! Per-message emotion analysis storage

use crate::error::Result;
use crate::types::{EmotionAnalysis, EmotionLabel};

use sqlx::{Row, SqlitePool};

/// Store for emotion analysis results
#[derive(Clone)]
pub struct EmotionStore {
    pool: SqlitePool,
}

impl EmotionStore {
    /// Create a new emotion store with the given SQLite pool
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert or replace the analysis for a message. A message carries at
    /// most one analysis; re-running the pipeline overwrites it.
    pub async fn upsert(&self, analysis: &EmotionAnalysis) -> Result<()> {
        let scores_json = analysis
            .scores
            .as_ref()
            .and_then(|s| serde_json::to_string(s).ok());

        sqlx::query(
            r#"
            INSERT INTO emotion_analyses (id, message_id, session_id, label, confidence, scores, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(message_id) DO UPDATE SET
                label = excluded.label,
                confidence = excluded.confidence,
                scores = excluded.scores,
                created_at = excluded.created_at
            "#,
        )
        .bind(&analysis.id)
        .bind(&analysis.message_id)
        .bind(&analysis.session_id)
        .bind(analysis.label.to_string())
        .bind(analysis.confidence)
        .bind(scores_json)
        .bind(analysis.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Load the analysis for a message
    pub async fn load_by_message(&self, message_id: &str) -> Result<Option<EmotionAnalysis>> {
        let row = sqlx::query(
            r#"
            SELECT id, message_id, session_id, label, confidence, scores, created_at
            FROM emotion_analyses
            WHERE message_id = ?
            "#,
        )
        .bind(message_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| row_to_analysis(&row)))
    }

    /// List all analyses for a session, oldest first
    pub async fn list_by_session(&self, session_id: &str) -> Result<Vec<EmotionAnalysis>> {
        let rows = sqlx::query(
            r#"
            SELECT id, message_id, session_id, label, confidence, scores, created_at
            FROM emotion_analyses
            WHERE session_id = ?
            ORDER BY created_at
            "#,
        )
        .bind(session_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(row_to_analysis).collect())
    }

    /// Count analyses per label within a session, most frequent first
    pub async fn label_counts(&self, session_id: &str) -> Result<Vec<(EmotionLabel, i64)>> {
        let rows = sqlx::query(
            r#"
            SELECT label, COUNT(*) AS n
            FROM emotion_analyses
            WHERE session_id = ?
            GROUP BY label
            ORDER BY n DESC
            "#,
        )
        .bind(session_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| {
                let label_str: String = row.try_get("label").unwrap_or_default();
                (parse_label(&label_str), row.try_get("n").unwrap_or(0))
            })
            .collect())
    }
}

/// Helper: Convert database row to EmotionAnalysis
fn row_to_analysis(row: &sqlx::sqlite::SqliteRow) -> EmotionAnalysis {
    let label_str: String = row.try_get("label").unwrap_or_default();
    let scores_json: Option<String> = row.try_get("scores").ok();
    let scores = scores_json.and_then(|s| serde_json::from_str(&s).ok());

    EmotionAnalysis {
        id: row.try_get("id").unwrap_or_default(),
        message_id: row.try_get("message_id").unwrap_or_default(),
        session_id: row.try_get("session_id").unwrap_or_default(),
        label: parse_label(&label_str),
        confidence: row.try_get("confidence").unwrap_or(0.0),
        scores,
        created_at: row.try_get("created_at").unwrap_or_else(|_| chrono::Utc::now()),
    }
}

/// Helper: Parse label from string, lenient on the read path
fn parse_label(s: &str) -> EmotionLabel {
    EmotionLabel::parse(s).unwrap_or(EmotionLabel::Neutral)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sessions::SessionStore;
    use crate::types::{ConversationSession, Message, Speaker, User};
    use crate::users::UserStore;

    async fn seeded_message(pool: &SqlitePool) -> Message {
        let user = User::new(50, "dal");
        UserStore::new(pool.clone()).save(&user).await.unwrap();
        let sessions = SessionStore::new(pool.clone());
        let session = ConversationSession::new(&user.id);
        sessions.save(&session).await.unwrap();
        let message = Message::new(&session.id, Speaker::User, "I remember the sea.");
        sessions.save_message(&message).await.unwrap();
        message
    }

    #[tokio::test]
    async fn upsert_replaces_earlier_analysis() {
        let pool = crate::memory_pool().await;
        let store = EmotionStore::new(pool.clone());
        let message = seeded_message(&pool).await;

        let first = EmotionAnalysis::new(&message.id, &message.session_id, EmotionLabel::Neutral, 0.4);
        store.upsert(&first).await.unwrap();

        let second = EmotionAnalysis::new(&message.id, &message.session_id, EmotionLabel::Joy, 0.9)
            .with_scores(serde_json::json!({"joy": 0.9, "neutral": 0.1}));
        store.upsert(&second).await.unwrap();

        let loaded = store.load_by_message(&message.id).await.unwrap().unwrap();
        assert_eq!(loaded.label, EmotionLabel::Joy);
        assert!(loaded.scores.is_some());
        assert_eq!(store.list_by_session(&message.session_id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn label_counts_orders_by_frequency() {
        let pool = crate::memory_pool().await;
        let store = EmotionStore::new(pool.clone());
        let sessions = SessionStore::new(pool.clone());

        let user = User::new(51, "moon");
        UserStore::new(pool.clone()).save(&user).await.unwrap();
        let session = ConversationSession::new(&user.id);
        sessions.save(&session).await.unwrap();

        for (content, label) in [
            ("the garden", EmotionLabel::Joy),
            ("my brother", EmotionLabel::Joy),
            ("the war years", EmotionLabel::Sadness),
        ] {
            let message = Message::new(&session.id, Speaker::User, content);
            sessions.save_message(&message).await.unwrap();
            store
                .upsert(&EmotionAnalysis::new(&message.id, &session.id, label, 0.8))
                .await
                .unwrap();
        }

        let counts = store.label_counts(&session.id).await.unwrap();
        assert_eq!(counts[0], (EmotionLabel::Joy, 2));
        assert_eq!(counts[1], (EmotionLabel::Sadness, 1));
    }
}
