//! Conversation session and message storage

use crate::error::Result;
use crate::types::{ConversationSession, Message, SessionStatus, Speaker};

use sqlx::{Row, SqlitePool};

/// Store for conversation sessions and their messages
#[derive(Clone)]
pub struct SessionStore {
    pool: SqlitePool,
}

impl SessionStore {
    /// Create a new session store with the given SQLite pool
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Save a new conversation session
    pub async fn save(&self, session: &ConversationSession) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO conversation_sessions (id, user_id, title, status, started_at, ended_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&session.id)
        .bind(&session.user_id)
        .bind(session.title.as_ref())
        .bind(session.status.to_string())
        .bind(session.started_at)
        .bind(session.ended_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Load a session by ID
    pub async fn load(&self, id: &str) -> Result<Option<ConversationSession>> {
        let row = sqlx::query(
            r#"
            SELECT id, user_id, title, status, started_at, ended_at
            FROM conversation_sessions
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| row_to_session(&row)))
    }

    /// List a user's sessions, newest first
    pub async fn list_by_user(&self, user_id: &str, limit: i64) -> Result<Vec<ConversationSession>> {
        let rows = sqlx::query(
            r#"
            SELECT id, user_id, title, status, started_at, ended_at
            FROM conversation_sessions
            WHERE user_id = ?
            ORDER BY started_at DESC
            LIMIT ?
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(row_to_session).collect())
    }

    /// Close an open session. Returns false if it was already closed or missing.
    pub async fn close(&self, id: &str) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE conversation_sessions SET status = 'closed', ended_at = ? WHERE id = ? AND status = 'open'",
        )
        .bind(chrono::Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Append a message to a session
    pub async fn save_message(&self, message: &Message) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO messages (id, session_id, speaker, content, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&message.id)
        .bind(&message.session_id)
        .bind(message.speaker.to_string())
        .bind(&message.content)
        .bind(message.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Load a message by ID
    pub async fn load_message(&self, id: &str) -> Result<Option<Message>> {
        let row = sqlx::query(
            "SELECT id, session_id, speaker, content, created_at FROM messages WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| row_to_message(&row)))
    }

    /// List a session's messages in conversation order
    pub async fn messages(&self, session_id: &str) -> Result<Vec<Message>> {
        let rows = sqlx::query(
            r#"
            SELECT id, session_id, speaker, content, created_at
            FROM messages
            WHERE session_id = ?
            ORDER BY created_at
            "#,
        )
        .bind(session_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(row_to_message).collect())
    }

    /// Count messages in a session
    pub async fn message_count(&self, session_id: &str) -> Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM messages WHERE session_id = ?")
            .bind(session_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(row.try_get("n").unwrap_or(0))
    }
}

/// Helper: Convert database row to ConversationSession
fn row_to_session(row: &sqlx::sqlite::SqliteRow) -> ConversationSession {
    let status_str: String = row.try_get("status").unwrap_or_default();

    ConversationSession {
        id: row.try_get("id").unwrap_or_default(),
        user_id: row.try_get("user_id").unwrap_or_default(),
        title: row.try_get("title").ok(),
        status: parse_session_status(&status_str),
        started_at: row.try_get("started_at").unwrap_or_else(|_| chrono::Utc::now()),
        ended_at: row.try_get("ended_at").ok(),
    }
}

/// Helper: Parse session status from string
fn parse_session_status(s: &str) -> SessionStatus {
    match s {
        "closed" => SessionStatus::Closed,
        _ => SessionStatus::Open,
    }
}

/// Helper: Convert database row to Message
fn row_to_message(row: &sqlx::sqlite::SqliteRow) -> Message {
    let speaker_str: String = row.try_get("speaker").unwrap_or_default();

    Message {
        id: row.try_get("id").unwrap_or_default(),
        session_id: row.try_get("session_id").unwrap_or_default(),
        speaker: parse_speaker(&speaker_str),
        content: row.try_get("content").unwrap_or_default(),
        created_at: row.try_get("created_at").unwrap_or_else(|_| chrono::Utc::now()),
    }
}

/// Helper: Parse speaker from string
fn parse_speaker(s: &str) -> Speaker {
    match s {
        "companion" => Speaker::Companion,
        _ => Speaker::User,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::User;
    use crate::users::UserStore;

    async fn seeded_user(pool: &SqlitePool) -> User {
        let user = User::new(100, "halmoni");
        UserStore::new(pool.clone()).save(&user).await.unwrap();
        user
    }

    #[tokio::test]
    async fn close_is_idempotent() {
        let pool = crate::memory_pool().await;
        let store = SessionStore::new(pool.clone());
        let user = seeded_user(&pool).await;

        let session = ConversationSession::new(&user.id).with_title("first talk");
        store.save(&session).await.unwrap();

        assert!(store.close(&session.id).await.unwrap());
        assert!(!store.close(&session.id).await.unwrap());

        let loaded = store.load(&session.id).await.unwrap().unwrap();
        assert_eq!(loaded.status, SessionStatus::Closed);
        assert!(loaded.ended_at.is_some());
    }

    #[tokio::test]
    async fn messages_come_back_in_order() {
        let pool = crate::memory_pool().await;
        let store = SessionStore::new(pool.clone());
        let user = seeded_user(&pool).await;

        let session = ConversationSession::new(&user.id);
        store.save(&session).await.unwrap();

        let mut first = Message::new(&session.id, Speaker::Companion, "What was your hometown like?");
        let mut second = Message::new(&session.id, Speaker::User, "A small fishing village.");
        // force distinct timestamps
        first.created_at = chrono::Utc::now() - chrono::Duration::seconds(2);
        second.created_at = chrono::Utc::now();
        store.save_message(&first).await.unwrap();
        store.save_message(&second).await.unwrap();

        let messages = store.messages(&session.id).await.unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].speaker, Speaker::Companion);
        assert_eq!(messages[1].content, "A small fishing village.");
        assert_eq!(store.message_count(&session.id).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn list_by_user_is_newest_first() {
        let pool = crate::memory_pool().await;
        let store = SessionStore::new(pool.clone());
        let user = seeded_user(&pool).await;

        let mut older = ConversationSession::new(&user.id);
        older.started_at = chrono::Utc::now() - chrono::Duration::hours(1);
        let newer = ConversationSession::new(&user.id);
        store.save(&older).await.unwrap();
        store.save(&newer).await.unwrap();

        let sessions = store.list_by_user(&user.id, 10).await.unwrap();
        assert_eq!(sessions.len(), 2);
        assert_eq!(sessions[0].id, newer.id);
    }
}
