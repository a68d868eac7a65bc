use super::handlers;
use super::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Create the HTTP router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Model output normalization
        .route("/normalize/json", post(handlers::normalize_json))
        .route("/normalize/quiz", post(handlers::normalize_quiz))
        .route("/normalize/:kind", post(handlers::normalize_result))
        // Live session control
        .route("/live/start", post(handlers::start_live))
        .route("/live/stop/:session_id", post(handlers::stop_live))
        // Live session queries
        .route("/live/:session_id/status", get(handlers::get_live_status))
        .route("/live/:session_id/transcript", get(handlers::get_live_transcript))
        // Browser clients call the API directly
        .layer(CorsLayer::permissive())
        // Add tracing middleware for request logging
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
