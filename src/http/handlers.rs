use super::state::AppState;
use crate::live::{LiveCallbacks, LiveSession, SessionState, SessionStats, TranscriptEvent};
use crate::normalize::{
    normalize_quiz_output, DictionaryEntry, ModelResult, QuizQuestion, Roadmap, StudyGuide,
    TranslationResult,
};
use crate::recovery::parse_model_json;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, warn};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct QuizQuery {
    /// Keep at most this many questions
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct StartLiveRequest {
    /// Optional session ID (if not provided, generate UUID)
    pub session_id: Option<String>,

    pub source_language: String,

    pub target_language: String,
}

#[derive(Debug, Serialize)]
pub struct StartLiveResponse {
    pub session_id: String,
    pub status: String,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct StopLiveResponse {
    pub session_id: String,
    pub status: String,
    pub message: String,
    pub stats: SessionStats,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn error_response(status: StatusCode, error: String) -> Response {
    (status, Json(ErrorResponse { error })).into_response()
}

fn session_not_found(session_id: &str) -> Response {
    error_response(StatusCode::NOT_FOUND, format!("Session {} not found", session_id))
}

fn no_json() -> Response {
    error_response(
        StatusCode::UNPROCESSABLE_ENTITY,
        "No JSON could be recovered from the input".to_string(),
    )
}

// ============================================================================
// Normalization handlers
// ============================================================================

/// POST /normalize/json
/// Recover JSON from raw model text
pub async fn normalize_json(body: String) -> Response {
    match parse_model_json(Some(&body)) {
        Some(value) => (StatusCode::OK, Json(value)).into_response(),
        None => no_json(),
    }
}

/// POST /normalize/quiz?limit=N
/// Normalize a question set; an unrecognizable body yields an empty list
pub async fn normalize_quiz(Query(query): Query<QuizQuery>, body: String) -> Response {
    let questions: Vec<QuizQuestion> = normalize_quiz_output(Some(&body), query.limit);
    (StatusCode::OK, Json(questions)).into_response()
}

/// POST /normalize/:kind
/// Coerce raw model text into a typed result
pub async fn normalize_result(Path(kind): Path<String>, body: String) -> Response {
    fn coerce<T: ModelResult + Serialize>(body: &str) -> Response {
        match T::from_model_output(Some(body)) {
            Some(result) => (StatusCode::OK, Json(result)).into_response(),
            None => no_json(),
        }
    }

    match kind.as_str() {
        "dictionary" => coerce::<DictionaryEntry>(&body),
        "study-guide" => coerce::<StudyGuide>(&body),
        "roadmap" => coerce::<Roadmap>(&body),
        "translation" => coerce::<TranslationResult>(&body),
        other => error_response(StatusCode::NOT_FOUND, format!("Unknown result kind: {}", other)),
    }
}

// ============================================================================
// Live session handlers
// ============================================================================

/// POST /live/start
/// Start a new interpretation session
pub async fn start_live(
    State(state): State<AppState>,
    Json(req): Json<StartLiveRequest>,
) -> Response {
    let Some(runtime) = state.live.clone() else {
        return error_response(
            StatusCode::SERVICE_UNAVAILABLE,
            "Live sessions are not configured".to_string(),
        );
    };

    // Generate or use provided session ID
    let session_id = req
        .session_id
        .unwrap_or_else(|| format!("live-{}", uuid::Uuid::new_v4()));

    info!("Starting live session: {}", session_id);

    let mut sessions = state.sessions.write().await;
    if sessions.contains_key(&session_id) {
        return error_response(
            StatusCode::CONFLICT,
            format!("Session {} is already running", session_id),
        );
    }

    let config = runtime.session_config(session_id.clone(), req.source_language, req.target_language);
    let log_id = session_id.clone();
    let callbacks = LiveCallbacks::new(
        {
            let id = log_id.clone();
            move |text, direction| info!(session = %id, ?direction, "{}", text)
        },
        move |err| error!(session = %log_id, "Live session error: {}", err),
    );

    let session = Arc::new(LiveSession::start(config, runtime.resources.clone(), callbacks));
    forget_when_idle(&state, session_id.clone(), &session);
    sessions.insert(session_id.clone(), session);

    (
        StatusCode::OK,
        Json(StartLiveResponse {
            session_id: session_id.clone(),
            status: "opening".to_string(),
            message: format!("Live session {} starting", session_id),
        }),
    )
        .into_response()
}

/// Remove the registry entry once the session ends on its own (open failure,
/// stream error); an entry replaced under the same id is left alone
fn forget_when_idle(state: &AppState, session_id: String, session: &Arc<LiveSession>) {
    let sessions = Arc::clone(&state.sessions);
    let registered = Arc::downgrade(session);
    let mut lifecycle = session.subscribe_state();

    tokio::spawn(async move {
        let _ = lifecycle.wait_for(|s| *s == SessionState::Idle).await;

        let mut sessions = sessions.write().await;
        let same = sessions
            .get(&session_id)
            .is_some_and(|current| std::ptr::eq(Arc::as_ptr(current), registered.as_ptr()));
        if same {
            sessions.remove(&session_id);
            info!("Live session {} ended, removed from registry", session_id);
        }
    });
}

/// POST /live/stop/:session_id
/// Stop a session and return its final stats
pub async fn stop_live(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Response {
    info!("Stopping live session: {}", session_id);

    // Find and remove session
    let session = {
        let mut sessions = state.sessions.write().await;
        sessions.remove(&session_id)
    };

    match session {
        Some(session) => {
            let stats = session.shutdown().await;
            info!("Live session stopped: {}", session_id);
            (
                StatusCode::OK,
                Json(StopLiveResponse {
                    session_id: session_id.clone(),
                    status: "stopped".to_string(),
                    message: "Live session stopped".to_string(),
                    stats,
                }),
            )
                .into_response()
        }
        None => {
            warn!("Session {} not found", session_id);
            session_not_found(&session_id)
        }
    }
}

/// GET /live/:session_id/status
pub async fn get_live_status(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Response {
    let sessions = state.sessions.read().await;

    match sessions.get(&session_id) {
        Some(session) => (StatusCode::OK, Json(session.get_stats().await)).into_response(),
        None => session_not_found(&session_id),
    }
}

/// GET /live/:session_id/transcript
/// Transcript accumulated so far, in arrival order
pub async fn get_live_transcript(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Response {
    let sessions = state.sessions.read().await;

    match sessions.get(&session_id) {
        Some(session) => {
            let transcript: Vec<TranscriptEvent> = session.transcript().await;
            (StatusCode::OK, Json(transcript)).into_response()
        }
        None => session_not_found(&session_id),
    }
}

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
