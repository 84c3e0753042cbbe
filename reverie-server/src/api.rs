use axum::{
    extract::{Multipart, Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use std::sync::Arc;

use reverie::{
    CameraSession, ConversationSession, EmotionAnalysis, MediaFile, Message, Question, Rdp,
    RdpUpdate, ReverieError, SynthesisRequest, TtsRecord, User,
};

use crate::models::{
    ApiResult, CreateCameraRequest, CreateMessageRequest, CreateQuestionRequest,
    CreateSessionRequest, DeletedResponse, EmotionRequest, Envelope, ErrorBody,
    FinalizedRdpResponse, KakaoLoginRequest, LabelCount, QuestionQuery, SessionDetailResponse,
    SessionEmotionsResponse, StatsResponse, TtsRequest, UpdateUserRequest,
};
use crate::state::AppState;

const DEFAULT_LIMIT: i64 = 100;

fn wrap<T>(status: StatusCode, data: T) -> (StatusCode, Json<Envelope<T>>) {
    (
        status,
        Json(Envelope {
            status: status.as_u16(),
            data,
        }),
    )
}

fn ok<T>(data: T) -> (StatusCode, Json<Envelope<T>>) {
    wrap(StatusCode::OK, data)
}

fn created<T>(data: T) -> (StatusCode, Json<Envelope<T>>) {
    wrap(StatusCode::CREATED, data)
}

fn failure(status: StatusCode, error: impl Into<String>) -> (StatusCode, Json<ErrorBody>) {
    (
        status,
        Json(ErrorBody {
            status: status.as_u16(),
            error: error.into(),
        }),
    )
}

fn reject(err: ReverieError) -> (StatusCode, Json<ErrorBody>) {
    let status = match &err {
        ReverieError::NotFound(_) => StatusCode::NOT_FOUND,
        ReverieError::Conflict(_) | ReverieError::InvalidOperation(_) => StatusCode::CONFLICT,
        ReverieError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        ReverieError::Provider { .. } => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };

    if status.is_server_error() {
        tracing::error!("request failed: {}", err);
    }

    failure(status, err.to_string())
}

pub async fn health_check() -> StatusCode {
    StatusCode::OK
}

pub async fn stats(State(state): State<Arc<AppState>>) -> ApiResult<StatsResponse> {
    let users = state.system.users().count().await.map_err(reject)?;
    let questions = state.system.questions().count().await.map_err(reject)?;
    let tts_records = state.system.tts_records().count().await.map_err(reject)?;

    Ok(ok(StatsResponse {
        users,
        questions,
        tts_records,
    }))
}

// ─── Social login and users ───────────────────────────────────────────────

pub async fn kakao_login(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<KakaoLoginRequest>,
) -> ApiResult<User> {
    let user = if let Some(code) = payload.code {
        state.system.login_with_code(&code).await
    } else if let Some(token) = payload.access_token {
        state.system.login_with_access_token(&token).await
    } else {
        return Err(failure(
            StatusCode::UNPROCESSABLE_ENTITY,
            "either code or access_token is required",
        ));
    };

    user.map(ok).map_err(reject)
}

pub async fn get_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<User> {
    match state.system.users().load(&id).await.map_err(reject)? {
        Some(user) => Ok(ok(user)),
        None => Err(failure(StatusCode::NOT_FOUND, format!("user {id} not found"))),
    }
}

pub async fn update_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(payload): Json<UpdateUserRequest>,
) -> ApiResult<User> {
    let changed = state
        .system
        .users()
        .update_profile(
            &id,
            payload.nickname.as_deref(),
            payload.profile_image_url.as_deref(),
            payload.email.as_deref(),
        )
        .await
        .map_err(reject)?;

    if !changed {
        return Err(failure(StatusCode::NOT_FOUND, format!("user {id} not found")));
    }

    match state.system.users().load(&id).await.map_err(reject)? {
        Some(user) => Ok(ok(user)),
        None => Err(failure(StatusCode::NOT_FOUND, format!("user {id} not found"))),
    }
}

pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<DeletedResponse> {
    let deleted = state.system.delete_user(&id).await.map_err(reject)?;
    if deleted {
        Ok(ok(DeletedResponse { deleted: true }))
    } else {
        Err(failure(StatusCode::NOT_FOUND, format!("user {id} not found")))
    }
}

// ─── Questions ────────────────────────────────────────────────────────────

pub async fn create_question(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateQuestionRequest>,
) -> ApiResult<Question> {
    if payload.text.trim().is_empty() {
        return Err(failure(
            StatusCode::UNPROCESSABLE_ENTITY,
            "question text must not be empty",
        ));
    }

    let question = Question::new(payload.category, payload.text);
    state.system.questions().save(&question).await.map_err(reject)?;
    Ok(created(question))
}

pub async fn list_questions(
    State(state): State<Arc<AppState>>,
    Query(params): Query<QuestionQuery>,
) -> ApiResult<Vec<Question>> {
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT);
    state
        .system
        .questions()
        .list(params.category.as_deref(), limit)
        .await
        .map(ok)
        .map_err(reject)
}

pub async fn random_question(
    State(state): State<Arc<AppState>>,
    Query(params): Query<QuestionQuery>,
) -> ApiResult<Question> {
    match state
        .system
        .questions()
        .random(params.category.as_deref())
        .await
        .map_err(reject)?
    {
        Some(question) => Ok(ok(question)),
        None => Err(failure(StatusCode::NOT_FOUND, "no questions available")),
    }
}

pub async fn delete_question(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<DeletedResponse> {
    let deleted = state.system.questions().delete(&id).await.map_err(reject)?;
    if deleted {
        Ok(ok(DeletedResponse { deleted: true }))
    } else {
        Err(failure(StatusCode::NOT_FOUND, format!("question {id} not found")))
    }
}

// ─── Conversation sessions ────────────────────────────────────────────────

pub async fn create_session(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateSessionRequest>,
) -> ApiResult<ConversationSession> {
    state
        .system
        .create_session(&payload.user_id, payload.title)
        .await
        .map(created)
        .map_err(reject)
}

pub async fn get_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<SessionDetailResponse> {
    let session = match state.system.sessions().load(&id).await.map_err(reject)? {
        Some(session) => session,
        None => {
            return Err(failure(StatusCode::NOT_FOUND, format!("session {id} not found")));
        }
    };

    let message_count = state
        .system
        .sessions()
        .message_count(&id)
        .await
        .map_err(reject)?;

    Ok(ok(SessionDetailResponse {
        session,
        message_count,
    }))
}

pub async fn list_user_sessions(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> ApiResult<Vec<ConversationSession>> {
    state
        .system
        .sessions()
        .list_by_user(&user_id, DEFAULT_LIMIT)
        .await
        .map(ok)
        .map_err(reject)
}

pub async fn close_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<ConversationSession> {
    if state.system.sessions().load(&id).await.map_err(reject)?.is_none() {
        return Err(failure(StatusCode::NOT_FOUND, format!("session {id} not found")));
    }

    // closing an already-closed session is a no-op
    state.system.sessions().close(&id).await.map_err(reject)?;

    match state.system.sessions().load(&id).await.map_err(reject)? {
        Some(session) => Ok(ok(session)),
        None => Err(failure(StatusCode::NOT_FOUND, format!("session {id} not found"))),
    }
}

pub async fn create_message(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
    Json(payload): Json<CreateMessageRequest>,
) -> ApiResult<Message> {
    state
        .system
        .append_message(&session_id, payload.speaker, payload.content)
        .await
        .map(created)
        .map_err(reject)
}

pub async fn list_messages(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> ApiResult<Vec<Message>> {
    if state
        .system
        .sessions()
        .load(&session_id)
        .await
        .map_err(reject)?
        .is_none()
    {
        return Err(failure(
            StatusCode::NOT_FOUND,
            format!("session {session_id} not found"),
        ));
    }

    state
        .system
        .sessions()
        .messages(&session_id)
        .await
        .map(ok)
        .map_err(reject)
}

// ─── Camera sessions ──────────────────────────────────────────────────────

pub async fn start_camera(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateCameraRequest>,
) -> ApiResult<CameraSession> {
    state
        .system
        .start_camera(&payload.user_id)
        .await
        .map(created)
        .map_err(reject)
}

pub async fn get_camera(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<CameraSession> {
    match state.system.camera().load(&id).await.map_err(reject)? {
        Some(session) => Ok(ok(session)),
        None => Err(failure(
            StatusCode::NOT_FOUND,
            format!("camera session {id} not found"),
        )),
    }
}

async fn camera_transition(
    state: &AppState,
    id: &str,
    flipped: bool,
    expected: &str,
) -> ApiResult<CameraSession> {
    if !flipped {
        return Err(failure(
            StatusCode::CONFLICT,
            format!("camera session {id} is not {expected}"),
        ));
    }

    match state.system.camera().load(id).await.map_err(reject)? {
        Some(session) => Ok(ok(session)),
        None => Err(failure(
            StatusCode::NOT_FOUND,
            format!("camera session {id} not found"),
        )),
    }
}

pub async fn camera_record(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<CameraSession> {
    if state.system.camera().load(&id).await.map_err(reject)?.is_none() {
        return Err(failure(
            StatusCode::NOT_FOUND,
            format!("camera session {id} not found"),
        ));
    }

    let flipped = state.system.camera().start_recording(&id).await.map_err(reject)?;
    camera_transition(&state, &id, flipped, "ACTIVE").await
}

pub async fn camera_pause(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<CameraSession> {
    if state.system.camera().load(&id).await.map_err(reject)?.is_none() {
        return Err(failure(
            StatusCode::NOT_FOUND,
            format!("camera session {id} not found"),
        ));
    }

    let flipped = state.system.camera().pause_recording(&id).await.map_err(reject)?;
    camera_transition(&state, &id, flipped, "RECORDING").await
}

pub async fn camera_stop(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<CameraSession> {
    if state.system.camera().load(&id).await.map_err(reject)?.is_none() {
        return Err(failure(
            StatusCode::NOT_FOUND,
            format!("camera session {id} not found"),
        ));
    }

    // stopping an already-inactive session is a no-op
    state.system.camera().deactivate(&id).await.map_err(reject)?;

    match state.system.camera().load(&id).await.map_err(reject)? {
        Some(session) => Ok(ok(session)),
        None => Err(failure(
            StatusCode::NOT_FOUND,
            format!("camera session {id} not found"),
        )),
    }
}

// ─── Voice synthesis ──────────────────────────────────────────────────────

pub async fn synthesize(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<TtsRequest>,
) -> ApiResult<TtsRecord> {
    let speaker = payload
        .speaker
        .unwrap_or_else(|| state.default_speaker.clone());
    let mut request = SynthesisRequest::new(payload.text).with_speaker(speaker);
    if let Some(speed) = payload.speed {
        request = request.with_speed(speed);
    }

    state
        .system
        .synthesize(payload.user_id.as_deref(), request)
        .await
        .map(created)
        .map_err(reject)
}

pub async fn list_user_tts(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> ApiResult<Vec<TtsRecord>> {
    state
        .system
        .tts_records()
        .list_by_user(&user_id, DEFAULT_LIMIT)
        .await
        .map(ok)
        .map_err(reject)
}

pub async fn get_tts(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<TtsRecord> {
    match state.system.tts_records().load(&id).await.map_err(reject)? {
        Some(record) => Ok(ok(record)),
        None => Err(failure(
            StatusCode::NOT_FOUND,
            format!("tts record {id} not found"),
        )),
    }
}

// ─── Media files ──────────────────────────────────────────────────────────

pub async fn upload_media(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
    mut multipart: Multipart,
) -> ApiResult<MediaFile> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| failure(StatusCode::BAD_REQUEST, e.to_string()))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let file_name = field.file_name().unwrap_or("upload").to_string();
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| failure(StatusCode::BAD_REQUEST, e.to_string()))?;

        return state
            .system
            .store_media(&user_id, &file_name, &content_type, &bytes)
            .await
            .map(created)
            .map_err(reject);
    }

    Err(failure(
        StatusCode::UNPROCESSABLE_ENTITY,
        "multipart field 'file' is required",
    ))
}

pub async fn get_media(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<MediaFile> {
    match state.system.media().load(&id).await.map_err(reject)? {
        Some(file) => Ok(ok(file)),
        None => Err(failure(StatusCode::NOT_FOUND, format!("media {id} not found"))),
    }
}

pub async fn download_media(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, (StatusCode, Json<ErrorBody>)> {
    let (file, bytes) = state.system.media_bytes(&id).await.map_err(reject)?;
    Ok(([(header::CONTENT_TYPE, file.content_type)], bytes))
}

pub async fn list_user_media(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> ApiResult<Vec<MediaFile>> {
    state
        .system
        .media()
        .list_by_user(&user_id, DEFAULT_LIMIT)
        .await
        .map(ok)
        .map_err(reject)
}

pub async fn delete_media(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<DeletedResponse> {
    let deleted = state.system.delete_media(&id).await.map_err(reject)?;
    if deleted {
        Ok(ok(DeletedResponse { deleted: true }))
    } else {
        Err(failure(StatusCode::NOT_FOUND, format!("media {id} not found")))
    }
}

// ─── Emotion analyses ─────────────────────────────────────────────────────

pub async fn put_emotion(
    State(state): State<Arc<AppState>>,
    Path(message_id): Path<String>,
    Json(payload): Json<EmotionRequest>,
) -> ApiResult<EmotionAnalysis> {
    state
        .system
        .record_emotion(&message_id, &payload.label, payload.confidence, payload.scores)
        .await
        .map(ok)
        .map_err(reject)
}

pub async fn get_message_emotion(
    State(state): State<Arc<AppState>>,
    Path(message_id): Path<String>,
) -> ApiResult<EmotionAnalysis> {
    match state
        .system
        .emotion()
        .load_by_message(&message_id)
        .await
        .map_err(reject)?
    {
        Some(analysis) => Ok(ok(analysis)),
        None => Err(failure(
            StatusCode::NOT_FOUND,
            format!("no analysis for message {message_id}"),
        )),
    }
}

pub async fn list_session_emotions(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> ApiResult<SessionEmotionsResponse> {
    let analyses = state
        .system
        .emotion()
        .list_by_session(&session_id)
        .await
        .map_err(reject)?;

    let label_counts = state
        .system
        .emotion()
        .label_counts(&session_id)
        .await
        .map_err(reject)?
        .into_iter()
        .map(|(label, count)| LabelCount { label, count })
        .collect();

    Ok(ok(SessionEmotionsResponse {
        analyses,
        label_counts,
    }))
}

// ─── Reminiscence Data Points ─────────────────────────────────────────────

pub async fn update_rdp(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
    Json(payload): Json<RdpUpdate>,
) -> ApiResult<Rdp> {
    state
        .system
        .update_rdp(&session_id, &payload)
        .await
        .map(ok)
        .map_err(reject)
}

pub async fn get_rdp(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> ApiResult<Rdp> {
    match state.system.rdp().load(&session_id).await.map_err(reject)? {
        Some(rdp) => Ok(ok(rdp)),
        None => Err(failure(
            StatusCode::NOT_FOUND,
            format!("no data point for session {session_id}"),
        )),
    }
}

pub async fn finalize_rdp(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> ApiResult<FinalizedRdpResponse> {
    state
        .system
        .finalize_rdp(&session_id)
        .await
        .map(|data_point| {
            ok(FinalizedRdpResponse {
                session_id: session_id.clone(),
                data_point,
            })
        })
        .map_err(reject)
}
