//! # Reverie - Reminiscence-Therapy Companion Backend

pub mod camera;
pub mod config;
pub mod emotion;
pub mod error;
pub mod kakao;
pub mod media;
pub mod questions;
pub mod rdp;
pub mod sessions;
pub mod tts;
pub mod types;
pub mod users;

pub use camera::CameraStore;
pub use self::config::{ClovaSettings, KakaoSettings, ServerSettings, Settings, StorageSettings};
pub use emotion::EmotionStore;
pub use error::{ReverieError, Result};
pub use kakao::{IdentityProvider, KakaoClient, KakaoProfile};
pub use media::MediaStore;
pub use questions::QuestionStore;
pub use rdp::RdpStore;
pub use sessions::SessionStore;
pub use tts::{ClovaVoiceClient, SpeechSynthesizer, SynthesisRequest, TtsStore};
pub use users::UserStore;
pub use types::{
    CameraSession, CameraStatus, ConversationSession, EmotionAnalysis, EmotionLabel, MediaFile,
    Message, Question, Rdp, RdpUpdate, SessionId, SessionStatus, Speaker, TtsRecord, User, UserId,
};

use sqlx::sqlite::SqliteConnectOptions;
use sqlx::SqlitePool;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use uuid::Uuid;

/// Create an in-memory database pool for testing
pub async fn memory_pool() -> SqlitePool {
    let options = SqliteConnectOptions::new()
        .in_memory(true)
        .create_if_missing(true)
        .foreign_keys(true);

    let pool = sqlx::pool::PoolOptions::<sqlx::Sqlite>::new()
        .max_connections(1)
        .connect_with(options)
        .await
        .expect("in-memory SQLite");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("migrations");

    pool
}

/// Main backend system - SQLite plus on-disk media/audio storage
#[derive(Clone)]
pub struct ReverieSystem {
    pool: SqlitePool,
    data_dir: PathBuf,
    users: UserStore,
    questions: QuestionStore,
    sessions: SessionStore,
    camera: CameraStore,
    media: MediaStore,
    emotion: EmotionStore,
    rdp: RdpStore,
    tts_records: TtsStore,
    synthesizer: Option<Arc<dyn SpeechSynthesizer>>,
    identity: Option<Arc<dyn IdentityProvider>>,
}

impl std::fmt::Debug for ReverieSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReverieSystem")
            .field("data_dir", &self.data_dir)
            .finish()
    }
}

impl ReverieSystem {
    /// Create a new backend system rooted at the given data directory
    pub async fn new(data_dir: impl AsRef<Path>) -> Result<Self> {
        let data_dir = data_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(data_dir.join("media"))?;
        std::fs::create_dir_all(data_dir.join("tts"))?;

        let sqlite_path = data_dir.join("reverie.db");
        let options = SqliteConnectOptions::new()
            .filename(&sqlite_path)
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePool::connect_with(options).await?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| ReverieError::Database(e.into()))?;

        Ok(Self::from_pool(pool, data_dir))
    }

    /// Create a system over an in-memory database for testing
    pub async fn connect_in_memory(data_dir: impl AsRef<Path>) -> Self {
        let data_dir = data_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(data_dir.join("media")).expect("media dir");
        std::fs::create_dir_all(data_dir.join("tts")).expect("tts dir");

        Self::from_pool(memory_pool().await, data_dir)
    }

    fn from_pool(pool: SqlitePool, data_dir: PathBuf) -> Self {
        Self {
            users: UserStore::new(pool.clone()),
            questions: QuestionStore::new(pool.clone()),
            sessions: SessionStore::new(pool.clone()),
            camera: CameraStore::new(pool.clone()),
            media: MediaStore::new(pool.clone()),
            emotion: EmotionStore::new(pool.clone()),
            rdp: RdpStore::new(pool.clone()),
            tts_records: TtsStore::new(pool.clone()),
            pool,
            data_dir,
            synthesizer: None,
            identity: None,
        }
    }

    /// Attach a voice synthesis provider
    pub fn with_synthesizer(mut self, synthesizer: Arc<dyn SpeechSynthesizer>) -> Self {
        self.synthesizer = Some(synthesizer);
        self
    }

    /// Attach a social-login identity provider
    pub fn with_identity_provider(mut self, identity: Arc<dyn IdentityProvider>) -> Self {
        self.identity = Some(identity);
        self
    }

    /// Get the underlying pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Get the data directory root
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Get the user store
    pub fn users(&self) -> &UserStore {
        &self.users
    }

    /// Get the question store
    pub fn questions(&self) -> &QuestionStore {
        &self.questions
    }

    /// Get the conversation session store
    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// Get the camera session store
    pub fn camera(&self) -> &CameraStore {
        &self.camera
    }

    /// Get the media store
    pub fn media(&self) -> &MediaStore {
        &self.media
    }

    /// Get the emotion analysis store
    pub fn emotion(&self) -> &EmotionStore {
        &self.emotion
    }

    /// Get the RDP store
    pub fn rdp(&self) -> &RdpStore {
        &self.rdp
    }

    /// Get the synthesis record store
    pub fn tts_records(&self) -> &TtsStore {
        &self.tts_records
    }

    // ─── Social login ─────────────────────────────────────────────────────

    /// Exchange an authorization code, fetch the profile, and upsert the user
    pub async fn login_with_code(&self, code: &str) -> Result<User> {
        let identity = self.identity()?;
        let access_token = identity.exchange_code(code).await?;
        let profile = identity.fetch_profile(&access_token).await?;
        tracing::info!(kakao_id = profile.kakao_id, "social login");
        self.users.upsert_from_profile(&profile).await
    }

    /// Fetch the profile behind an existing access token and upsert the user
    pub async fn login_with_access_token(&self, access_token: &str) -> Result<User> {
        let identity = self.identity()?;
        let profile = identity.fetch_profile(access_token).await?;
        tracing::info!(kakao_id = profile.kakao_id, "social login");
        self.users.upsert_from_profile(&profile).await
    }

    fn identity(&self) -> Result<&Arc<dyn IdentityProvider>> {
        self.identity
            .as_ref()
            .ok_or_else(|| ReverieError::Configuration("no identity provider attached".to_string()))
    }

    /// Delete a user and everything hanging off the account. Media bytes on
    /// disk go with the rows.
    pub async fn delete_user(&self, id: &str) -> Result<bool> {
        let files = self.media.list_by_user(id, i64::MAX).await?;
        let deleted = self.users.delete(id).await?;

        if deleted {
            for file in files {
                let path = self.data_dir.join(&file.stored_path);
                if let Err(e) = tokio::fs::remove_file(&path).await {
                    tracing::warn!("could not remove {}: {}", path.display(), e);
                }
            }
        }

        Ok(deleted)
    }

    // ─── Conversations ────────────────────────────────────────────────────

    /// Open a conversation session for an existing user
    pub async fn create_session(
        &self,
        user_id: &str,
        title: Option<String>,
    ) -> Result<ConversationSession> {
        self.require_user(user_id).await?;

        let mut session = ConversationSession::new(user_id);
        session.title = title;
        self.sessions.save(&session).await?;
        Ok(session)
    }

    /// Append a message to an open session
    pub async fn append_message(
        &self,
        session_id: &str,
        speaker: Speaker,
        content: impl Into<String>,
    ) -> Result<Message> {
        let session = self
            .sessions
            .load(session_id)
            .await?
            .ok_or_else(|| ReverieError::NotFound(format!("session {session_id}")))?;

        if session.status == SessionStatus::Closed {
            return Err(ReverieError::InvalidOperation(
                "session is closed".to_string(),
            ));
        }

        let message = Message::new(session_id, speaker, content);
        self.sessions.save_message(&message).await?;
        Ok(message)
    }

    // ─── Camera sessions ──────────────────────────────────────────────────

    /// Start a camera session. A user has at most one live session.
    pub async fn start_camera(&self, user_id: &str) -> Result<CameraSession> {
        self.require_user(user_id).await?;

        if let Some(live) = self.camera.find_live_by_user(user_id).await? {
            return Err(ReverieError::Conflict(format!(
                "camera session {} is already {}",
                live.id, live.status
            )));
        }

        let session = CameraSession::new(user_id);
        self.camera.save(&session).await?;
        tracing::debug!(camera_id = %session.id, "camera session started");
        Ok(session)
    }

    // ─── Voice synthesis ──────────────────────────────────────────────────

    /// Synthesize text through the attached provider, write the audio under
    /// the data directory, and persist the record.
    pub async fn synthesize(
        &self,
        user_id: Option<&str>,
        request: SynthesisRequest,
    ) -> Result<TtsRecord> {
        if request.text.trim().is_empty() {
            return Err(ReverieError::Validation("text must not be empty".to_string()));
        }

        let synthesizer = self.synthesizer.as_ref().ok_or_else(|| {
            ReverieError::Configuration("no speech synthesizer attached".to_string())
        })?;

        if let Some(user_id) = user_id {
            self.require_user(user_id).await?;
        }

        let audio = synthesizer.synthesize(&request).await?;
        let audio_path = format!("tts/{}.mp3", Uuid::new_v4());
        tokio::fs::write(self.data_dir.join(&audio_path), &audio).await?;

        let record = TtsRecord {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.map(str::to_string),
            text: request.text,
            speaker: request.speaker,
            speed: request.speed,
            audio_path,
            byte_len: audio.len() as i64,
            created_at: chrono::Utc::now(),
        };
        self.tts_records.save(&record).await?;
        tracing::debug!(tts_id = %record.id, bytes = record.byte_len, "synthesis stored");
        Ok(record)
    }

    // ─── Media files ──────────────────────────────────────────────────────

    /// Store uploaded bytes under the media directory and record them
    pub async fn store_media(
        &self,
        user_id: &str,
        file_name: &str,
        content_type: &str,
        bytes: &[u8],
    ) -> Result<MediaFile> {
        self.require_user(user_id).await?;

        if bytes.is_empty() {
            return Err(ReverieError::Validation("empty upload".to_string()));
        }

        let stored_path = format!("media/{}-{}", Uuid::new_v4(), sanitize_file_name(file_name));
        tokio::fs::write(self.data_dir.join(&stored_path), bytes).await?;

        let file = MediaFile::new(user_id, file_name, content_type, bytes.len() as i64, stored_path);
        self.media.save(&file).await?;
        Ok(file)
    }

    /// Load a media record together with its bytes
    pub async fn media_bytes(&self, id: &str) -> Result<(MediaFile, Vec<u8>)> {
        let file = self
            .media
            .load(id)
            .await?
            .ok_or_else(|| ReverieError::NotFound(format!("media {id}")))?;

        let bytes = tokio::fs::read(self.data_dir.join(&file.stored_path)).await?;
        Ok((file, bytes))
    }

    /// Delete a media record and its bytes
    pub async fn delete_media(&self, id: &str) -> Result<bool> {
        let file = match self.media.load(id).await? {
            Some(file) => file,
            None => return Ok(false),
        };

        self.media.delete(id).await?;
        let path = self.data_dir.join(&file.stored_path);
        if let Err(e) = tokio::fs::remove_file(&path).await {
            tracing::warn!("could not remove {}: {}", path.display(), e);
        }

        Ok(true)
    }

    // ─── Emotion analyses ─────────────────────────────────────────────────

    /// Store the emotion analysis for a message, resolving its session
    pub async fn record_emotion(
        &self,
        message_id: &str,
        label: &str,
        confidence: f32,
        scores: Option<serde_json::Value>,
    ) -> Result<EmotionAnalysis> {
        let message = self
            .sessions
            .load_message(message_id)
            .await?
            .ok_or_else(|| ReverieError::NotFound(format!("message {message_id}")))?;

        let label = EmotionLabel::parse(label)
            .ok_or_else(|| ReverieError::Validation(format!("unknown emotion label: {label}")))?;

        let mut analysis = EmotionAnalysis::new(message_id, &message.session_id, label, confidence);
        analysis.scores = scores;
        self.emotion.upsert(&analysis).await?;
        Ok(analysis)
    }

    // ─── Reminiscence Data Points ─────────────────────────────────────────

    /// Merge fields into a session's data point
    pub async fn update_rdp(&self, session_id: &str, update: &RdpUpdate) -> Result<Rdp> {
        let session = self
            .sessions
            .load(session_id)
            .await?
            .ok_or_else(|| ReverieError::NotFound(format!("session {session_id}")))?;

        self.rdp.upsert(&session.id, update).await?;
        self.rdp
            .load(&session.id)
            .await?
            .ok_or_else(|| ReverieError::NotFound(format!("rdp {session_id}")))
    }

    /// Finalize a session's data point and return the assembled
    /// anchor/scene/highlight/meaning map. Idempotent once finalized;
    /// an empty data point cannot be finalized.
    pub async fn finalize_rdp(&self, session_id: &str) -> Result<serde_json::Value> {
        let rdp = self
            .rdp
            .load(session_id)
            .await?
            .ok_or_else(|| ReverieError::NotFound(format!("rdp {session_id}")))?;

        if rdp.is_empty() {
            return Err(ReverieError::InvalidOperation(
                "cannot finalize an empty data point".to_string(),
            ));
        }

        self.rdp.mark_finalized(session_id).await?;
        tracing::info!(session_id, "data point finalized");
        Ok(rdp.as_data_point())
    }

    async fn require_user(&self, user_id: &str) -> Result<User> {
        self.users
            .load(user_id)
            .await?
            .ok_or_else(|| ReverieError::NotFound(format!("user {user_id}")))
    }
}

/// Helper: keep uploaded file names path-safe
fn sanitize_file_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '-'
            }
        })
        .collect();

    if cleaned.is_empty() {
        "upload".to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct FixedIdentity;

    #[async_trait]
    impl IdentityProvider for FixedIdentity {
        fn name(&self) -> &'static str {
            "fixed"
        }

        async fn exchange_code(&self, _code: &str) -> Result<String> {
            Ok("token-abc".to_string())
        }

        async fn fetch_profile(&self, _access_token: &str) -> Result<KakaoProfile> {
            Ok(KakaoProfile {
                kakao_id: 9001,
                nickname: "haru".to_string(),
                profile_image_url: None,
                email: Some("haru@example.com".to_string()),
            })
        }
    }

    struct SilentVoice;

    #[async_trait]
    impl SpeechSynthesizer for SilentVoice {
        fn name(&self) -> &'static str {
            "silent"
        }

        async fn synthesize(&self, request: &SynthesisRequest) -> Result<Vec<u8>> {
            Ok(request.text.as_bytes().to_vec())
        }
    }

    async fn system(dir: &tempfile::TempDir) -> ReverieSystem {
        ReverieSystem::connect_in_memory(dir.path())
            .await
            .with_identity_provider(Arc::new(FixedIdentity))
            .with_synthesizer(Arc::new(SilentVoice))
    }

    #[tokio::test]
    async fn login_twice_keeps_one_account() {
        let dir = tempfile::tempdir().unwrap();
        let system = system(&dir).await;

        let first = system.login_with_code("any-code").await.unwrap();
        let second = system.login_with_access_token("token-abc").await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(system.users().count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn synthesize_writes_audio_and_record() {
        let dir = tempfile::tempdir().unwrap();
        let system = system(&dir).await;

        let record = system
            .synthesize(None, SynthesisRequest::new("hello there").with_speed(2))
            .await
            .unwrap();

        assert_eq!(record.byte_len, "hello there".len() as i64);
        let on_disk = std::fs::read(dir.path().join(&record.audio_path)).unwrap();
        assert_eq!(on_disk, b"hello there");
        assert!(system.tts_records().load(&record.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn synthesize_rejects_blank_text() {
        let dir = tempfile::tempdir().unwrap();
        let system = system(&dir).await;

        let err = system
            .synthesize(None, SynthesisRequest::new("   "))
            .await
            .unwrap_err();
        assert!(matches!(err, ReverieError::Validation(_)));
    }

    #[tokio::test]
    async fn second_camera_session_conflicts() {
        let dir = tempfile::tempdir().unwrap();
        let system = system(&dir).await;
        let user = system.login_with_code("c").await.unwrap();

        system.start_camera(&user.id).await.unwrap();
        let err = system.start_camera(&user.id).await.unwrap_err();
        assert!(matches!(err, ReverieError::Conflict(_)));
    }

    #[tokio::test]
    async fn closed_session_rejects_messages() {
        let dir = tempfile::tempdir().unwrap();
        let system = system(&dir).await;
        let user = system.login_with_code("c").await.unwrap();

        let session = system.create_session(&user.id, None).await.unwrap();
        system
            .append_message(&session.id, Speaker::User, "hello")
            .await
            .unwrap();
        system.sessions().close(&session.id).await.unwrap();

        let err = system
            .append_message(&session.id, Speaker::User, "too late")
            .await
            .unwrap_err();
        assert!(matches!(err, ReverieError::InvalidOperation(_)));
    }

    #[tokio::test]
    async fn finalize_requires_some_fields() {
        let dir = tempfile::tempdir().unwrap();
        let system = system(&dir).await;
        let user = system.login_with_code("c").await.unwrap();
        let session = system.create_session(&user.id, None).await.unwrap();

        system
            .update_rdp(&session.id, &RdpUpdate::default())
            .await
            .unwrap();
        let err = system.finalize_rdp(&session.id).await.unwrap_err();
        assert!(matches!(err, ReverieError::InvalidOperation(_)));

        system
            .update_rdp(
                &session.id,
                &RdpUpdate {
                    anchor_era: Some("1958".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let point = system.finalize_rdp(&session.id).await.unwrap();
        assert_eq!(point["anchor"]["era"], "1958");

        // finalizing again returns the same shape
        let again = system.finalize_rdp(&session.id).await.unwrap();
        assert_eq!(point, again);
    }

    #[tokio::test]
    async fn delete_user_removes_media_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let system = system(&dir).await;
        let user = system.login_with_code("c").await.unwrap();

        let file = system
            .store_media(&user.id, "granny photo.png", "image/png", b"png-bytes")
            .await
            .unwrap();
        let path = dir.path().join(&file.stored_path);
        assert!(path.exists());

        assert!(system.delete_user(&user.id).await.unwrap());
        assert!(!path.exists());
        assert!(system.media().load(&file.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn record_emotion_resolves_session_and_validates_label() {
        let dir = tempfile::tempdir().unwrap();
        let system = system(&dir).await;
        let user = system.login_with_code("c").await.unwrap();
        let session = system.create_session(&user.id, None).await.unwrap();
        let message = system
            .append_message(&session.id, Speaker::User, "the old house")
            .await
            .unwrap();

        let err = system
            .record_emotion(&message.id, "melancholy", 0.5, None)
            .await
            .unwrap_err();
        assert!(matches!(err, ReverieError::Validation(_)));

        let analysis = system
            .record_emotion(&message.id, "sadness", 0.7, None)
            .await
            .unwrap();
        assert_eq!(analysis.session_id, session.id);
        assert_eq!(analysis.label, EmotionLabel::Sadness);
    }
}
