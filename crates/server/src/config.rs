//! Server configuration

use medscribe_core::capture::DEFAULT_MAX_RECORDING_BYTES;
use std::path::PathBuf;
use std::time::Duration;

use crate::ai::DEFAULT_INTENT_TIMEOUT;

/// Generative model settings
#[derive(Debug, Clone)]
pub struct AiConfig {
    pub model: String,
    pub base_url: String,
    /// Budget for the form-intent classifier before extraction goes ahead
    pub intent_timeout: Duration,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            model: "gemini-2.5-flash".into(),
            base_url: "https://generativelanguage.googleapis.com".into(),
            intent_timeout: DEFAULT_INTENT_TIMEOUT,
        }
    }
}

/// Server configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub bind_address: String,
    /// Directory holding `medscribe_history.json`
    pub data_dir: PathBuf,
    pub cors_origins: Vec<String>,
    pub rate_limit_rps: u32,
    /// Whether the server may accept recorded audio at all
    pub recording_enabled: bool,
    /// Largest audio clip accepted, inline or recorded
    pub max_audio_bytes: usize,
    pub ai: AiConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".into(),
            data_dir: PathBuf::from("./data"),
            cors_origins: vec!["*".into()],
            rate_limit_rps: 50,
            recording_enabled: true,
            max_audio_bytes: DEFAULT_MAX_RECORDING_BYTES,
            ai: AiConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Self {
            bind_address: lookup("BIND_ADDRESS").unwrap_or(defaults.bind_address),
            data_dir: lookup("MEDSCRIBE_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
            cors_origins: lookup("CORS_ORIGINS")
                .map(|s| {
                    s.split(',')
                        .map(|o| o.trim().to_string())
                        .filter(|o| !o.is_empty())
                        .collect()
                })
                .unwrap_or(defaults.cors_origins),
            rate_limit_rps: lookup("RATE_LIMIT_RPS")
                .and_then(|s| s.parse().ok())
                .filter(|rps| *rps > 0)
                .unwrap_or(defaults.rate_limit_rps),
            recording_enabled: lookup("MEDSCRIBE_RECORDING_ENABLED")
                .map(|s| !matches!(s.trim().to_ascii_lowercase().as_str(), "false" | "0" | "no"))
                .unwrap_or(defaults.recording_enabled),
            max_audio_bytes: lookup("MEDSCRIBE_MAX_AUDIO_BYTES")
                .and_then(|s| s.parse().ok())
                .filter(|bytes| *bytes > 0)
                .unwrap_or(defaults.max_audio_bytes),
            ai: AiConfig {
                model: lookup("GEMINI_MODEL").unwrap_or(defaults.ai.model),
                base_url: lookup("GEMINI_BASE_URL").unwrap_or(defaults.ai.base_url),
                intent_timeout: lookup("MEDSCRIBE_INTENT_TIMEOUT_MS")
                    .and_then(|s| s.parse().ok())
                    .map(Duration::from_millis)
                    .unwrap_or(defaults.ai.intent_timeout),
            },
        }
    }

    /// Request body limit for extraction: base64 inflates audio by 4/3,
    /// plus room for the JSON envelope
    pub fn extract_body_limit(&self) -> usize {
        self.max_audio_bytes.div_ceil(3) * 4 + 64 * 1024
    }
}
