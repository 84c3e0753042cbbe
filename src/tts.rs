//! Voice synthesis provider and request log

use crate::config::ClovaSettings;
use crate::error::{ReverieError, Result};
use crate::types::TtsRecord;

use async_trait::async_trait;
use sqlx::{Row, SqlitePool};
use std::time::Duration;

/// One synthesis request
#[derive(Debug, Clone)]
pub struct SynthesisRequest {
    pub text: String,
    pub speaker: String,
    pub speed: i32,
}

impl SynthesisRequest {
    /// Create a request with the default voice at normal speed
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            speaker: "nara".to_string(),
            speed: 0,
        }
    }

    /// Set the provider voice name
    pub fn with_speaker(mut self, speaker: impl Into<String>) -> Self {
        self.speaker = speaker.into();
        self
    }

    /// Set the playback speed (-5 slowest .. 5 fastest)
    pub fn with_speed(mut self, speed: i32) -> Self {
        self.speed = speed.clamp(-5, 5);
        self
    }
}

/// Provider seam for voice synthesis
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    fn name(&self) -> &'static str;

    /// Synthesize the request into audio bytes. One call, no retry.
    async fn synthesize(&self, request: &SynthesisRequest) -> Result<Vec<u8>>;
}

/// Clova-style voice synthesis client.
///
/// Authenticates with client id/secret headers and posts the text as a form
/// body; the response body is the encoded audio.
pub struct ClovaVoiceClient {
    endpoint: String,
    client_id: String,
    client_secret: String,
    http: reqwest::Client,
}

impl ClovaVoiceClient {
    /// Create a client from settings
    pub fn new(settings: &ClovaSettings) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            endpoint: settings.endpoint.trim_end_matches('/').to_string(),
            client_id: settings.client_id.clone(),
            client_secret: settings.client_secret.clone(),
            http,
        }
    }
}

#[async_trait]
impl SpeechSynthesizer for ClovaVoiceClient {
    fn name(&self) -> &'static str {
        "clova"
    }

    async fn synthesize(&self, request: &SynthesisRequest) -> Result<Vec<u8>> {
        let speed = request.speed.to_string();
        let params = [
            ("speaker", request.speaker.as_str()),
            ("speed", speed.as_str()),
            ("text", request.text.as_str()),
        ];

        let response = self
            .http
            .post(&self.endpoint)
            .header("X-NCP-APIGW-API-KEY-ID", &self.client_id)
            .header("X-NCP-APIGW-API-KEY", &self.client_secret)
            .form(&params)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ReverieError::Provider {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response.bytes().await?.to_vec())
    }
}

/// Store for completed synthesis requests
#[derive(Clone)]
pub struct TtsStore {
    pool: SqlitePool,
}

impl TtsStore {
    /// Create a new TTS store with the given SQLite pool
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Save a synthesis record
    pub async fn save(&self, record: &TtsRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO tts_records (id, user_id, text, speaker, speed, audio_path, byte_len, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&record.id)
        .bind(record.user_id.as_ref())
        .bind(&record.text)
        .bind(&record.speaker)
        .bind(record.speed)
        .bind(&record.audio_path)
        .bind(record.byte_len)
        .bind(record.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Load a synthesis record by ID
    pub async fn load(&self, id: &str) -> Result<Option<TtsRecord>> {
        let row = sqlx::query(
            r#"
            SELECT id, user_id, text, speaker, speed, audio_path, byte_len, created_at
            FROM tts_records
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| row_to_record(&row)))
    }

    /// List a user's synthesis records, newest first
    pub async fn list_by_user(&self, user_id: &str, limit: i64) -> Result<Vec<TtsRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT id, user_id, text, speaker, speed, audio_path, byte_len, created_at
            FROM tts_records
            WHERE user_id = ?
            ORDER BY created_at DESC
            LIMIT ?
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(row_to_record).collect())
    }

    /// Count synthesis records
    pub async fn count(&self) -> Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM tts_records")
            .fetch_one(&self.pool)
            .await?;

        Ok(row.try_get("n").unwrap_or(0))
    }
}

/// Helper: Convert database row to TtsRecord
fn row_to_record(row: &sqlx::sqlite::SqliteRow) -> TtsRecord {
    TtsRecord {
        id: row.try_get("id").unwrap_or_default(),
        user_id: row.try_get("user_id").ok(),
        text: row.try_get("text").unwrap_or_default(),
        speaker: row.try_get("speaker").unwrap_or_default(),
        speed: row.try_get("speed").unwrap_or(0),
        audio_path: row.try_get("audio_path").unwrap_or_default(),
        byte_len: row.try_get("byte_len").unwrap_or(0),
        created_at: row.try_get("created_at").unwrap_or_else(|_| chrono::Utc::now()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn speed_is_clamped_to_provider_range() {
        let request = SynthesisRequest::new("hello").with_speed(12);
        assert_eq!(request.speed, 5);
        let request = SynthesisRequest::new("hello").with_speed(-9);
        assert_eq!(request.speed, -5);
    }

    #[tokio::test]
    async fn store_round_trips_records() {
        let pool = crate::memory_pool().await;
        let store = TtsStore::new(pool);

        let record = TtsRecord {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: None,
            text: "Good morning".to_string(),
            speaker: "nara".to_string(),
            speed: 0,
            audio_path: "tts/abc.mp3".to_string(),
            byte_len: 512,
            created_at: chrono::Utc::now(),
        };
        store.save(&record).await.unwrap();

        let loaded = store.load(&record.id).await.unwrap().unwrap();
        assert_eq!(loaded.text, "Good morning");
        assert_eq!(loaded.byte_len, 512);
        assert_eq!(store.count().await.unwrap(), 1);
    }
}
