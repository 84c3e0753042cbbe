//! Canned reminiscence question storage

use crate::error::Result;
use crate::types::Question;

use sqlx::{Row, SqlitePool};

/// Store for canned reminiscence prompts
#[derive(Clone)]
pub struct QuestionStore {
    pool: SqlitePool,
}

impl QuestionStore {
    /// Create a new question store with the given SQLite pool
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Save a new question
    pub async fn save(&self, question: &Question) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO questions (id, category, text, created_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(&question.id)
        .bind(&question.category)
        .bind(&question.text)
        .bind(question.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Load a question by ID
    pub async fn load(&self, id: &str) -> Result<Option<Question>> {
        let row = sqlx::query(
            "SELECT id, category, text, created_at FROM questions WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| row_to_question(&row)))
    }

    /// List questions, optionally filtered by category
    pub async fn list(&self, category: Option<&str>, limit: i64) -> Result<Vec<Question>> {
        let rows = if let Some(category) = category {
            sqlx::query(
                r#"
                SELECT id, category, text, created_at
                FROM questions
                WHERE category = ?
                ORDER BY created_at
                LIMIT ?
                "#,
            )
            .bind(category)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?
        } else {
            sqlx::query(
                r#"
                SELECT id, category, text, created_at
                FROM questions
                ORDER BY created_at
                LIMIT ?
                "#,
            )
            .bind(limit)
            .fetch_all(&self.pool)
            .await?
        };

        Ok(rows.iter().map(row_to_question).collect())
    }

    /// Pick one question at random, optionally within a category
    pub async fn random(&self, category: Option<&str>) -> Result<Option<Question>> {
        let row = if let Some(category) = category {
            sqlx::query(
                r#"
                SELECT id, category, text, created_at
                FROM questions
                WHERE category = ?
                ORDER BY RANDOM()
                LIMIT 1
                "#,
            )
            .bind(category)
            .fetch_optional(&self.pool)
            .await?
        } else {
            sqlx::query(
                "SELECT id, category, text, created_at FROM questions ORDER BY RANDOM() LIMIT 1",
            )
            .fetch_optional(&self.pool)
            .await?
        };

        Ok(row.map(|row| row_to_question(&row)))
    }

    /// Delete a question
    pub async fn delete(&self, id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM questions WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Count stored questions
    pub async fn count(&self) -> Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM questions")
            .fetch_one(&self.pool)
            .await?;

        Ok(row.try_get("n").unwrap_or(0))
    }
}

/// Helper: Convert database row to Question
fn row_to_question(row: &sqlx::sqlite::SqliteRow) -> Question {
    Question {
        id: row.try_get("id").unwrap_or_default(),
        category: row.try_get("category").unwrap_or_default(),
        text: row.try_get("text").unwrap_or_default(),
        created_at: row.try_get("created_at").unwrap_or_else(|_| chrono::Utc::now()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn list_filters_by_category() {
        let pool = crate::memory_pool().await;
        let store = QuestionStore::new(pool);

        store
            .save(&Question::new("childhood", "What games did you play as a child?"))
            .await
            .unwrap();
        store
            .save(&Question::new("family", "Tell me about your siblings."))
            .await
            .unwrap();

        let childhood = store.list(Some("childhood"), 10).await.unwrap();
        assert_eq!(childhood.len(), 1);
        assert_eq!(childhood[0].category, "childhood");

        let all = store.list(None, 10).await.unwrap();
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn random_returns_none_on_empty_category() {
        let pool = crate::memory_pool().await;
        let store = QuestionStore::new(pool);

        store
            .save(&Question::new("work", "What was your first job?"))
            .await
            .unwrap();

        assert!(store.random(Some("travel")).await.unwrap().is_none());
        let picked = store.random(None).await.unwrap().unwrap();
        assert_eq!(picked.category, "work");
    }

    #[tokio::test]
    async fn delete_removes_question() {
        let pool = crate::memory_pool().await;
        let store = QuestionStore::new(pool);

        let question = Question::new("food", "What dish reminds you of home?");
        store.save(&question).await.unwrap();
        assert_eq!(store.count().await.unwrap(), 1);

        assert!(store.delete(&question.id).await.unwrap());
        assert_eq!(store.count().await.unwrap(), 0);
    }
}
