use axum::{
    routing::{get, post, put},
    Router,
};
use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use reverie::{ClovaVoiceClient, KakaoClient, ReverieSystem, Settings};

mod api;
mod models;
mod state;

use crate::state::AppState;

#[derive(Debug, Parser)]
#[command(name = "reverie-server", about = "Reminiscence companion backend")]
struct Args {
    /// Settings file (optional; environment variables override it)
    #[arg(long, default_value = "reverie")]
    config: String,

    /// Override the listen port from the settings file
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,reverie=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let settings = Settings::load(&args.config).expect("Failed to load settings");

    tracing::info!("Initializing Reverie backend...");

    let system = ReverieSystem::new(&settings.storage.data_dir)
        .await
        .expect("Failed to initialize backend")
        .with_synthesizer(Arc::new(ClovaVoiceClient::new(&settings.clova)))
        .with_identity_provider(Arc::new(KakaoClient::new(&settings.kakao)));

    let state = Arc::new(AppState {
        system: Arc::new(system),
        default_speaker: settings.clova.default_speaker.clone(),
    });

    let app = router(state);

    let port = args.port.unwrap_or(settings.server.port);
    let addr: SocketAddr = format!("{}:{}", settings.server.bind, port)
        .parse()
        .expect("invalid bind address");
    tracing::info!("Reverie Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}

fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(api::health_check))
        .route("/v1/stats", get(api::stats))
        // Social login and users
        .route("/v1/auth/kakao", post(api::kakao_login))
        .route(
            "/v1/users/:id",
            get(api::get_user).patch(api::update_user).delete(api::delete_user),
        )
        .route("/v1/users/:id/sessions", get(api::list_user_sessions))
        .route("/v1/users/:id/tts", get(api::list_user_tts))
        .route(
            "/v1/users/:id/media",
            get(api::list_user_media).post(api::upload_media),
        )
        // Canned questions
        .route(
            "/v1/questions",
            get(api::list_questions).post(api::create_question),
        )
        .route("/v1/questions/random", get(api::random_question))
        .route("/v1/questions/:id", axum::routing::delete(api::delete_question))
        // Conversation sessions
        .route("/v1/sessions", post(api::create_session))
        .route("/v1/sessions/:id", get(api::get_session))
        .route("/v1/sessions/:id/close", post(api::close_session))
        .route(
            "/v1/sessions/:id/messages",
            get(api::list_messages).post(api::create_message),
        )
        .route("/v1/sessions/:id/emotions", get(api::list_session_emotions))
        .route(
            "/v1/sessions/:id/rdp",
            get(api::get_rdp).put(api::update_rdp),
        )
        .route("/v1/sessions/:id/rdp/finalize", post(api::finalize_rdp))
        // Camera sessions
        .route("/v1/camera", post(api::start_camera))
        .route("/v1/camera/:id", get(api::get_camera))
        .route("/v1/camera/:id/record", post(api::camera_record))
        .route("/v1/camera/:id/pause", post(api::camera_pause))
        .route("/v1/camera/:id/stop", post(api::camera_stop))
        // Voice synthesis
        .route("/v1/tts", post(api::synthesize))
        .route("/v1/tts/:id", get(api::get_tts))
        // Media files
        .route(
            "/v1/media/:id",
            get(api::get_media).delete(api::delete_media),
        )
        .route("/v1/media/:id/content", get(api::download_media))
        // Emotion analyses
        .route(
            "/v1/messages/:id/emotion",
            put(api::put_emotion).get(api::get_message_emotion),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
