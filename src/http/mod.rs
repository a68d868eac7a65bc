//! HTTP API server
//!
//! This module provides a REST API over the normalizers and live sessions:
//! - POST /normalize/json - Recover JSON from raw model text
//! - POST /normalize/quiz - Normalize a quiz question set
//! - POST /normalize/:kind - Coerce dictionary, study-guide, roadmap or translation output
//! - POST /live/start - Start an interpretation session
//! - POST /live/stop/:id - Stop a session
//! - GET /live/:id/status - Query session status
//! - GET /live/:id/transcript - Get accumulated transcript
//! - GET /health - Health check

mod handlers;
mod routes;
mod state;

pub use handlers::{ErrorResponse, StartLiveRequest, StartLiveResponse, StopLiveResponse};
pub use routes::create_router;
pub use state::{AppState, LiveRuntime};
