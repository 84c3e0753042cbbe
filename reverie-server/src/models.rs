use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

/// Generic status/payload envelope every endpoint responds with
#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub status: u16,
    pub data: T,
}

/// Envelope for failed requests
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub status: u16,
    pub error: String,
}

/// Handler result: enveloped payload or enveloped error
pub type ApiResult<T> = Result<(StatusCode, Json<Envelope<T>>), (StatusCode, Json<ErrorBody>)>;

#[derive(Debug, Deserialize)]
pub struct KakaoLoginRequest {
    /// Authorization code from the client-side Kakao flow
    pub code: Option<String>,
    /// Or an access token the client already holds
    pub access_token: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateUserRequest {
    pub nickname: Option<String>,
    pub profile_image_url: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateSessionRequest {
    pub user_id: String,
    pub title: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateMessageRequest {
    pub speaker: reverie::Speaker,
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateCameraRequest {
    pub user_id: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateQuestionRequest {
    pub category: String,
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct QuestionQuery {
    pub category: Option<String>,
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct TtsRequest {
    pub text: String,
    pub speaker: Option<String>,
    pub speed: Option<i32>,
    pub user_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct EmotionRequest {
    pub label: String,
    pub confidence: f32,
    pub scores: Option<serde_json::Value>,
}

#[derive(Debug, Serialize)]
pub struct SessionEmotionsResponse {
    pub analyses: Vec<reverie::EmotionAnalysis>,
    pub label_counts: Vec<LabelCount>,
}

#[derive(Debug, Serialize)]
pub struct LabelCount {
    pub label: reverie::EmotionLabel,
    pub count: i64,
}

#[derive(Debug, Serialize)]
pub struct SessionDetailResponse {
    #[serde(flatten)]
    pub session: reverie::ConversationSession,
    pub message_count: i64,
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub users: i64,
    pub questions: i64,
    pub tts_records: i64,
}

#[derive(Debug, Serialize)]
pub struct DeletedResponse {
    pub deleted: bool,
}

#[derive(Debug, Serialize)]
pub struct FinalizedRdpResponse {
    pub session_id: String,
    pub data_point: serde_json::Value,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_serializes_status_and_data() {
        let body = serde_json::to_value(Envelope {
            status: 200,
            data: vec!["a", "b"],
        })
        .unwrap();
        assert_eq!(body["status"], 200);
        assert_eq!(body["data"][1], "b");
    }

    #[test]
    fn session_detail_flattens_session_fields() {
        let session = reverie::ConversationSession::new("user-1");
        let body = serde_json::to_value(SessionDetailResponse {
            session: session.clone(),
            message_count: 3,
        })
        .unwrap();
        assert_eq!(body["id"], session.id.as_str());
        assert_eq!(body["message_count"], 3);
    }
}
