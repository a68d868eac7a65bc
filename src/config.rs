use anyhow::{Context, Result};
use serde::Deserialize;

use crate::gemini::{TutorModels, DEFAULT_BASE_URL};
use crate::live::{LiveSessionConfig, DEFAULT_LIVE_ENDPOINT};

/// Environment variable prefix for overrides, e.g. `LUMINOUS__SERVICE__HTTP__PORT=9000`
pub const ENV_PREFIX: &str = "LUMINOUS";

/// Consulted when `gemini.api_key` is empty
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub service: ServiceConfig,
    pub gemini: GeminiConfig,
    pub audio: AudioConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub name: String,
    pub http: HttpConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: "luminous".to_string(),
            http: HttpConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GeminiConfig {
    pub api_key: String,
    pub base_url: String,
    pub live_endpoint: String,
    pub fast_model: String,
    pub smart_model: String,
    pub audio_model: String,
    pub live_model: String,
    pub voice: String,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        let models = TutorModels::default();
        Self {
            api_key: String::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            live_endpoint: DEFAULT_LIVE_ENDPOINT.to_string(),
            fast_model: models.fast,
            smart_model: models.smart,
            audio_model: models.audio,
            live_model: LiveSessionConfig::default().model,
            voice: models.voice,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Rate microphone frames are sent at
    pub input_sample_rate: u32,
    /// Rate model audio is played at
    pub output_sample_rate: u32,
    /// Samples per outbound frame
    pub frame_samples: usize,
    /// Capture device buffer size
    pub capture_buffer_ms: u64,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            input_sample_rate: 16000,
            output_sample_rate: 24000,
            frame_samples: 4096,
            capture_buffer_ms: 100,
        }
    }
}

impl Config {
    /// Load `path` (optional, extension may be omitted) and apply `LUMINOUS__*` overrides
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(config::Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()
            .with_context(|| format!("Failed to read config {}", path))?;

        let mut cfg: Config = settings
            .try_deserialize()
            .context("Invalid configuration")?;

        if cfg.gemini.api_key.trim().is_empty() {
            if let Ok(key) = std::env::var(API_KEY_ENV) {
                cfg.gemini.api_key = key;
            }
        }

        Ok(cfg)
    }

    pub fn has_api_key(&self) -> bool {
        !self.gemini.api_key.trim().is_empty()
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.service.http.bind, self.service.http.port)
    }

    pub fn tutor_models(&self) -> TutorModels {
        TutorModels {
            fast: self.gemini.fast_model.clone(),
            smart: self.gemini.smart_model.clone(),
            audio: self.gemini.audio_model.clone(),
            voice: self.gemini.voice.clone(),
        }
    }

    /// Session settings for a new interpretation session between two languages
    pub fn live_session_config(&self, source_language: &str, target_language: &str) -> LiveSessionConfig {
        LiveSessionConfig {
            source_language: source_language.to_string(),
            target_language: target_language.to_string(),
            model: self.gemini.live_model.clone(),
            voice: self.gemini.voice.clone(),
            input_sample_rate: self.audio.input_sample_rate,
            output_sample_rate: self.audio.output_sample_rate,
            frame_samples: self.audio.frame_samples,
            capture_buffer_ms: self.audio.capture_buffer_ms,
            ..LiveSessionConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent");
        let cfg = Config::load(path.to_str().unwrap()).unwrap();

        assert_eq!(cfg.service.http.port, 8080);
        assert_eq!(cfg.audio.frame_samples, 4096);
        assert_eq!(cfg.gemini.base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "[service.http]\nport = 9100\n\n[audio]\noutput_sample_rate = 48000\n\n[gemini]\nvoice = \"Kore\""
        )
        .unwrap();

        let cfg = Config::load(file.path().to_str().unwrap()).unwrap();
        assert_eq!(cfg.service.http.port, 9100);
        assert_eq!(cfg.service.http.bind, "127.0.0.1");
        assert_eq!(cfg.audio.output_sample_rate, 48000);
        assert_eq!(cfg.audio.input_sample_rate, 16000);

        let live = cfg.live_session_config("English", "French");
        assert_eq!(live.voice, "Kore");
        assert_eq!(live.output_sample_rate, 48000);
        assert_eq!(live.target_language, "French");
        assert_eq!(cfg.tutor_models().voice, "Kore");
    }

    #[test]
    fn test_environment_override() {
        std::env::set_var("LUMINOUS__SERVICE__NAME", "luminous-test");
        let dir = tempfile::tempdir().unwrap();
        let cfg = Config::load(dir.path().join("none").to_str().unwrap()).unwrap();
        std::env::remove_var("LUMINOUS__SERVICE__NAME");

        assert_eq!(cfg.service.name, "luminous-test");
    }
}
