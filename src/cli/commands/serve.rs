//! HTTP API server.
//!
//! Each client creates a session, processes a video into it and asks
//! questions. Requests against one session are serialized; sessions are
//! independent of each other. A session lives until it is deleted or, when
//! `server.session_idle_minutes` is non-zero, until it has been unused for
//! that long.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::error::TubechatError;
use crate::orchestrator::Orchestrator;
use crate::rag::RagResponse;
use crate::session::{AskOutcome, ChatMessage, ChatSession, SessionState, NO_ACTIVE_VIDEO};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, RwLock};
use tower_http::cors::{Any, CorsLayer};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// A stored session and when a request last used it.
struct SessionSlot {
    session: Arc<Mutex<ChatSession>>,
    last_active: Instant,
}

impl SessionSlot {
    fn new(session: ChatSession) -> Self {
        Self {
            session: Arc::new(Mutex::new(session)),
            last_active: Instant::now(),
        }
    }

    fn touch(&mut self) {
        self.last_active = Instant::now();
    }

    /// Idle for at least `idle_timeout` and not held by a running request.
    fn is_expired(&self, idle_timeout: Duration) -> bool {
        Arc::strong_count(&self.session) == 1 && self.last_active.elapsed() >= idle_timeout
    }
}

/// Shared application state.
struct AppState {
    orchestrator: Orchestrator,
    sessions: RwLock<HashMap<Uuid, SessionSlot>>,
    idle_timeout: Option<Duration>,
}

impl AppState {
    fn new(orchestrator: Orchestrator) -> Self {
        let idle_timeout = orchestrator.settings().server.session_idle_timeout();
        Self {
            orchestrator,
            sessions: RwLock::new(HashMap::new()),
            idle_timeout,
        }
    }

    async fn session(&self, id: Uuid) -> Result<Arc<Mutex<ChatSession>>, ApiError> {
        let mut sessions = self.sessions.write().await;
        let slot = sessions
            .get_mut(&id)
            .ok_or_else(|| ApiError::new(StatusCode::NOT_FOUND, format!("Session {} not found", id)))?;
        slot.touch();
        Ok(slot.session.clone())
    }

    /// Drop sessions unused for `idle_timeout`, returning how many were removed.
    async fn evict_idle(&self, idle_timeout: Duration) -> usize {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|id, slot| {
            let expired = slot.is_expired(idle_timeout);
            if expired {
                debug!("Evicting idle session {}", id);
            }
            !expired
        });
        before - sessions.len()
    }
}

/// Sweep idle sessions every minute, or every `idle_timeout` when shorter.
fn spawn_session_sweeper(state: Arc<AppState>, idle_timeout: Duration) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(idle_timeout.min(Duration::from_secs(60)));
        interval.tick().await;

        loop {
            interval.tick().await;
            let evicted = state.evict_idle(idle_timeout).await;
            if evicted > 0 {
                info!("Evicted {} idle sessions", evicted);
            }
        }
    });
}

/// Run the HTTP API server.
pub async fn run_serve(host: &str, port: u16, settings: Settings) -> anyhow::Result<()> {
    if let Err(e) = preflight::check(Operation::Process) {
        Output::error(&format!("{}", e));
        Output::info("Run 'tubechat doctor' for detailed diagnostics.");
        return Err(e.into());
    }

    let orchestrator = Orchestrator::new(settings)?;
    let state = Arc::new(AppState::new(orchestrator));
    let idle_timeout = state.idle_timeout;
    if let Some(idle_timeout) = idle_timeout {
        spawn_session_sweeper(state.clone(), idle_timeout);
    }
    let app = router(state);

    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    Output::header("tubechat API Server");
    println!();
    Output::success(&format!("Listening on http://{}", addr));
    println!();
    println!("Endpoints:");
    Output::kv("Health", "GET    /health");
    Output::kv("New session", "POST   /sessions");
    Output::kv("Get session", "GET    /sessions/{id}");
    Output::kv("Process video", "POST   /sessions/{id}/process");
    Output::kv("Ask", "POST   /sessions/{id}/ask");
    Output::kv("Clear", "POST   /sessions/{id}/clear");
    Output::kv("Delete session", "DELETE /sessions/{id}");
    match idle_timeout {
        Some(timeout) => Output::kv("Idle sessions", &format!("dropped after {} min", timeout.as_secs() / 60)),
        None => Output::kv("Idle sessions", "kept until deleted"),
    }
    println!();
    Output::info("Press Ctrl+C to stop the server.");

    axum::serve(listener, app).await?;

    Ok(())
}

fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/sessions", post(create_session))
        .route("/sessions/{id}", get(get_session).delete(delete_session))
        .route("/sessions/{id}/process", post(process_video))
        .route("/sessions/{id}/ask", post(ask))
        .route("/sessions/{id}/clear", post(clear_session))
        .layer(cors)
        .with_state(state)
}

// === Request/Response Types ===

#[derive(Deserialize)]
struct ProcessRequest {
    url: String,
}

#[derive(Deserialize)]
struct AskRequest {
    question: String,
}

#[derive(Serialize)]
struct SessionResponse {
    id: Uuid,
    state: SessionState,
    current_url: Option<String>,
    video: Option<VideoInfo>,
    messages: Vec<ChatMessage>,
}

#[derive(Serialize)]
struct VideoInfo {
    video_id: String,
    language: String,
    translated_from: Option<String>,
    chunk_count: usize,
}

impl From<&ChatSession> for SessionResponse {
    fn from(session: &ChatSession) -> Self {
        Self {
            id: session.id(),
            state: session.state(),
            current_url: session.current_url().map(str::to_string),
            video: session.active().map(|v| VideoInfo {
                video_id: v.video_id.clone(),
                language: v.transcript.language.clone(),
                translated_from: v.transcript.translated_from.clone(),
                chunk_count: v.chunk_count,
            }),
            messages: session.messages().to_vec(),
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

impl From<TubechatError> for ApiError {
    fn from(e: TubechatError) -> Self {
        let status = match &e {
            TubechatError::VideoIdNotFound | TubechatError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            e if e.is_caption_error() => StatusCode::UNPROCESSABLE_ENTITY,
            TubechatError::Embedding(_)
            | TubechatError::OpenAI(_)
            | TubechatError::Translation(_)
            | TubechatError::Http(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self::new(status, e.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            warn!("{}", self.message);
        }
        (self.status, Json(ErrorResponse { error: self.message })).into_response()
    }
}

// === Handlers ===

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn create_session(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let session = ChatSession::new();
    let body = SessionResponse::from(&session);

    state
        .sessions
        .write()
        .await
        .insert(session.id(), SessionSlot::new(session));
    info!("Created session {}", body.id);

    (StatusCode::CREATED, Json(body))
}

async fn get_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionResponse>, ApiError> {
    let session = state.session(id).await?;
    let session = session.lock().await;
    Ok(Json(SessionResponse::from(&*session)))
}

async fn delete_session(State(state): State<Arc<AppState>>, Path(id): Path<Uuid>) -> Result<StatusCode, ApiError> {
    match state.sessions.write().await.remove(&id) {
        Some(_) => Ok(StatusCode::NO_CONTENT),
        None => Err(ApiError::new(StatusCode::NOT_FOUND, format!("Session {} not found", id))),
    }
}

async fn process_video(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(req): Json<ProcessRequest>,
) -> Result<Json<SessionResponse>, ApiError> {
    let session = state.session(id).await?;
    let mut session = session.lock().await;

    session.process_video(&state.orchestrator, &req.url, |_| {}).await?;
    Ok(Json(SessionResponse::from(&*session)))
}

async fn ask(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(req): Json<AskRequest>,
) -> Result<Json<RagResponse>, ApiError> {
    let session = state.session(id).await?;
    let mut session = session.lock().await;

    match session.ask(&state.orchestrator, &req.question).await? {
        AskOutcome::Answered(response) => Ok(Json(response)),
        AskOutcome::NoActiveVideo => Err(ApiError::new(StatusCode::CONFLICT, NO_ACTIVE_VIDEO)),
    }
}

async fn clear_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionResponse>, ApiError> {
    let session = state.session(id).await?;
    let mut session = session.lock().await;

    session.clear();
    Ok(Json(SessionResponse::from(&*session)))
}
