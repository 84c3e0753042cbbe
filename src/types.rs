//! Domain entities for the reminiscence companion

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for users
pub type UserId = String;

/// Unique identifier for conversation sessions
pub type SessionId = String;

/// A member signed in through Kakao social login
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    /// Unique identifier
    pub id: UserId,
    /// Kakao account id, unique per member
    pub kakao_id: i64,
    /// Display nickname from the Kakao profile
    pub nickname: String,
    /// Profile image URL, if the member shares one
    pub profile_image_url: Option<String>,
    /// Email, if the member shares one
    pub email: Option<String>,
    /// When the account was first seen
    pub created_at: DateTime<Utc>,
    /// When the profile was last refreshed
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Create a new user from a Kakao profile
    pub fn new(kakao_id: i64, nickname: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            kakao_id,
            nickname: nickname.into(),
            profile_image_url: None,
            email: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Set the profile image URL
    pub fn with_profile_image(mut self, url: impl Into<String>) -> Self {
        self.profile_image_url = Some(url.into());
        self
    }

    /// Set the email
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }
}

/// Lifecycle of a conversation session
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// Session is accepting messages
    Open,
    /// Session has been closed
    Closed,
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionStatus::Open => write!(f, "open"),
            SessionStatus::Closed => write!(f, "closed"),
        }
    }
}

/// One reminiscence conversation between a member and the companion
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConversationSession {
    /// Unique identifier
    pub id: SessionId,
    /// Owning user
    pub user_id: UserId,
    /// Optional display title
    pub title: Option<String>,
    /// Open or closed
    pub status: SessionStatus,
    /// When the conversation started
    pub started_at: DateTime<Utc>,
    /// When the conversation was closed
    pub ended_at: Option<DateTime<Utc>>,
}

impl ConversationSession {
    /// Start a new open session for a user
    pub fn new(user_id: impl Into<UserId>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.into(),
            title: None,
            status: SessionStatus::Open,
            started_at: Utc::now(),
            ended_at: None,
        }
    }

    /// Set the title
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }
}

/// Who produced a message
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Speaker {
    /// The member
    User,
    /// The companion
    Companion,
}

impl std::fmt::Display for Speaker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Speaker::User => write!(f, "user"),
            Speaker::Companion => write!(f, "companion"),
        }
    }
}

/// One utterance within a conversation session
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    /// Unique identifier
    pub id: String,
    /// Session this message belongs to
    pub session_id: SessionId,
    /// Who spoke
    pub speaker: Speaker,
    /// The utterance text
    pub content: String,
    /// When the message was recorded
    pub created_at: DateTime<Utc>,
}

impl Message {
    /// Create a new message in a session
    pub fn new(session_id: impl Into<SessionId>, speaker: Speaker, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            session_id: session_id.into(),
            speaker,
            content: content.into(),
            created_at: Utc::now(),
        }
    }
}

/// Status of a client-side recording session
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CameraStatus {
    /// Camera is on, not recording
    Active,
    /// Camera session has ended
    Inactive,
    /// Camera is recording
    Recording,
}

impl std::fmt::Display for CameraStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CameraStatus::Active => write!(f, "ACTIVE"),
            CameraStatus::Inactive => write!(f, "INACTIVE"),
            CameraStatus::Recording => write!(f, "RECORDING"),
        }
    }
}

/// Database-tracked record correlating a client recording session with a user
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CameraSession {
    /// Unique identifier
    pub id: String,
    /// Owning user
    pub user_id: UserId,
    /// Current status
    pub status: CameraStatus,
    /// When the camera session started
    pub started_at: DateTime<Utc>,
    /// When the status last changed
    pub updated_at: DateTime<Utc>,
}

impl CameraSession {
    /// Start a new active camera session for a user
    pub fn new(user_id: impl Into<UserId>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.into(),
            status: CameraStatus::Active,
            started_at: now,
            updated_at: now,
        }
    }
}

/// A canned reminiscence prompt shown to members
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Question {
    /// Unique identifier
    pub id: String,
    /// Topic grouping (childhood, family, work, ...)
    pub category: String,
    /// The prompt text
    pub text: String,
    /// When the question was added
    pub created_at: DateTime<Utc>,
}

impl Question {
    /// Create a new question
    pub fn new(category: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            category: category.into(),
            text: text.into(),
            created_at: Utc::now(),
        }
    }
}

/// An uploaded media file owned by a user
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MediaFile {
    /// Unique identifier
    pub id: String,
    /// Owning user
    pub user_id: UserId,
    /// Original file name as uploaded
    pub file_name: String,
    /// MIME type reported at upload
    pub content_type: String,
    /// Size in bytes
    pub byte_len: i64,
    /// Path relative to the media directory
    pub stored_path: String,
    /// When the file was uploaded
    pub created_at: DateTime<Utc>,
}

impl MediaFile {
    /// Create a new media file record
    pub fn new(
        user_id: impl Into<UserId>,
        file_name: impl Into<String>,
        content_type: impl Into<String>,
        byte_len: i64,
        stored_path: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.into(),
            file_name: file_name.into(),
            content_type: content_type.into(),
            byte_len,
            stored_path: stored_path.into(),
            created_at: Utc::now(),
        }
    }
}

/// One completed voice synthesis request
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TtsRecord {
    /// Unique identifier
    pub id: String,
    /// Requesting user, if known
    pub user_id: Option<UserId>,
    /// Synthesized text
    pub text: String,
    /// Provider voice name
    pub speaker: String,
    /// Playback speed (-5 slowest .. 5 fastest, 0 normal)
    pub speed: i32,
    /// Audio file path relative to the data directory
    pub audio_path: String,
    /// Audio size in bytes
    pub byte_len: i64,
    /// When synthesis completed
    pub created_at: DateTime<Utc>,
}

/// Emotion labels produced by the analysis pipeline
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum EmotionLabel {
    Joy,
    Sadness,
    Anger,
    Fear,
    Surprise,
    Neutral,
}

impl EmotionLabel {
    /// All labels
    pub const ALL: &[EmotionLabel] = &[
        EmotionLabel::Joy,
        EmotionLabel::Sadness,
        EmotionLabel::Anger,
        EmotionLabel::Fear,
        EmotionLabel::Surprise,
        EmotionLabel::Neutral,
    ];

    /// Strict parse used on the write path; unknown labels are rejected
    pub fn parse(s: &str) -> Option<EmotionLabel> {
        match s {
            "joy" => Some(EmotionLabel::Joy),
            "sadness" => Some(EmotionLabel::Sadness),
            "anger" => Some(EmotionLabel::Anger),
            "fear" => Some(EmotionLabel::Fear),
            "surprise" => Some(EmotionLabel::Surprise),
            "neutral" => Some(EmotionLabel::Neutral),
            _ => None,
        }
    }
}

impl std::fmt::Display for EmotionLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EmotionLabel::Joy => write!(f, "joy"),
            EmotionLabel::Sadness => write!(f, "sadness"),
            EmotionLabel::Anger => write!(f, "anger"),
            EmotionLabel::Fear => write!(f, "fear"),
            EmotionLabel::Surprise => write!(f, "surprise"),
            EmotionLabel::Neutral => write!(f, "neutral"),
        }
    }
}

/// Emotion analysis result for one message
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmotionAnalysis {
    /// Unique identifier
    pub id: String,
    /// Analyzed message; one analysis per message
    pub message_id: String,
    /// Session the message belongs to
    pub session_id: SessionId,
    /// Dominant emotion
    pub label: EmotionLabel,
    /// Confidence of the dominant emotion (0.0 - 1.0)
    pub confidence: f32,
    /// Full per-label score distribution
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scores: Option<serde_json::Value>,
    /// When the analysis was stored
    pub created_at: DateTime<Utc>,
}

impl EmotionAnalysis {
    /// Create a new analysis for a message
    pub fn new(
        message_id: impl Into<String>,
        session_id: impl Into<SessionId>,
        label: EmotionLabel,
        confidence: f32,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            message_id: message_id.into(),
            session_id: session_id.into(),
            label,
            confidence: confidence.clamp(0.0, 1.0),
            scores: None,
            created_at: Utc::now(),
        }
    }

    /// Attach the full score distribution
    pub fn with_scores(mut self, scores: serde_json::Value) -> Self {
        self.scores = Some(scores);
        self
    }
}

/// Reminiscence Data Point: fixed-shape summary of one conversation.
///
/// Four parts - anchor, scene, highlight, meaning - each holding two string
/// fields. Fields fill in gradually over the conversation; `finalize`
/// assembles the nested map once the session is done.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Rdp {
    /// Session this data point summarizes
    pub session_id: SessionId,
    pub anchor_era: Option<String>,
    pub anchor_place: Option<String>,
    pub scene_setting: Option<String>,
    pub scene_people: Option<String>,
    pub highlight_moment: Option<String>,
    pub highlight_quote: Option<String>,
    pub meaning_theme: Option<String>,
    pub meaning_reflection: Option<String>,
    /// Whether the data point has been finalized
    pub finalized: bool,
    /// When any field last changed
    pub updated_at: DateTime<Utc>,
}

impl Rdp {
    /// True when no field has been filled in yet
    pub fn is_empty(&self) -> bool {
        self.anchor_era.is_none()
            && self.anchor_place.is_none()
            && self.scene_setting.is_none()
            && self.scene_people.is_none()
            && self.highlight_moment.is_none()
            && self.highlight_quote.is_none()
            && self.meaning_theme.is_none()
            && self.meaning_reflection.is_none()
    }

    /// Assemble the nested anchor/scene/highlight/meaning map from the
    /// stored fields. Unset fields appear as nulls.
    pub fn as_data_point(&self) -> serde_json::Value {
        serde_json::json!({
            "anchor": {
                "era": self.anchor_era,
                "place": self.anchor_place,
            },
            "scene": {
                "setting": self.scene_setting,
                "people": self.scene_people,
            },
            "highlight": {
                "moment": self.highlight_moment,
                "quote": self.highlight_quote,
            },
            "meaning": {
                "theme": self.meaning_theme,
                "reflection": self.meaning_reflection,
            },
        })
    }
}

/// Partial update for an RDP; unset fields keep their stored value
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RdpUpdate {
    pub anchor_era: Option<String>,
    pub anchor_place: Option<String>,
    pub scene_setting: Option<String>,
    pub scene_people: Option<String>,
    pub highlight_moment: Option<String>,
    pub highlight_quote: Option<String>,
    pub meaning_theme: Option<String>,
    pub meaning_reflection: Option<String>,
}

impl RdpUpdate {
    /// True when the update carries no fields
    pub fn is_empty(&self) -> bool {
        self.anchor_era.is_none()
            && self.anchor_place.is_none()
            && self.scene_setting.is_none()
            && self.scene_people.is_none()
            && self.highlight_moment.is_none()
            && self.highlight_quote.is_none()
            && self.meaning_theme.is_none()
            && self.meaning_reflection.is_none()
    }
}
