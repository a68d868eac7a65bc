use crate::live::{LiveSession, LiveSessionConfig, SessionResources};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// What the server needs to open live sessions
pub struct LiveRuntime {
    /// Template for new sessions; id and languages are filled per request
    pub defaults: LiveSessionConfig,
    pub resources: SessionResources,
}

impl LiveRuntime {
    pub fn new(defaults: LiveSessionConfig, resources: SessionResources) -> Self {
        Self { defaults, resources }
    }

    pub fn session_config(&self, session_id: String, source_language: String, target_language: String) -> LiveSessionConfig {
        LiveSessionConfig {
            session_id,
            source_language,
            target_language,
            ..self.defaults.clone()
        }
    }
}

/// Shared application state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Live sessions (session_id → session)
    pub sessions: Arc<RwLock<HashMap<String, Arc<LiveSession>>>>,

    /// `None` when live sessions are not configured (e.g. no API key)
    pub live: Option<Arc<LiveRuntime>>,
}

impl AppState {
    pub fn new() -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            live: None,
        }
    }

    pub fn with_live(mut self, runtime: LiveRuntime) -> Self {
        self.live = Some(Arc::new(runtime));
        self
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}
