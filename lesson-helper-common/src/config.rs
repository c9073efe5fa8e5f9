//! Configuration module for loading environment variables and settings.

use std::fmt;

use crate::error::ConfigError;

/// Default Gemini model used by the tutor.
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-pro";

/// Default base URL of the Gemini (Generative Language) API.
pub const DEFAULT_GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Default base URL of the Cloud Text-to-Speech API.
pub const DEFAULT_TTS_API_BASE: &str = "https://texttospeech.googleapis.com/v1";

/// Application configuration loaded from environment variables.
///
/// Secrets are optional at this level: each server checks for the ones it
/// actually needs when it is constructed.
#[derive(Clone)]
pub struct Config {
    /// Gemini API key (`GEMINI_KEY`)
    pub gemini_api_key: Option<String>,
    /// Shared secret callers must present in `x-shared-secret` (`SHARED_SECRET`)
    pub shared_secret: Option<String>,
    /// Gemini model name
    pub gemini_model: String,
    /// Gemini API base URL
    pub gemini_api_base: String,
    /// Cloud TTS API base URL
    pub tts_api_base: String,
}

impl Config {
    /// Load configuration from environment variables and .env file.
    ///
    /// # Errors
    /// Returns `ConfigError` if a variable is present but invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build configuration from an arbitrary variable lookup.
    ///
    /// Empty or whitespace-only values are treated as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let gemini_model = var("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string());
        if gemini_model.contains('/') || gemini_model.contains(char::is_whitespace) {
            return Err(ConfigError::invalid_value(
                "GEMINI_MODEL",
                format!("'{}' is not a model name", gemini_model),
            ));
        }

        Ok(Self {
            gemini_api_key: var("GEMINI_KEY"),
            shared_secret: var("SHARED_SECRET"),
            gemini_model,
            gemini_api_base: var("GEMINI_API_BASE")
                .unwrap_or_else(|| DEFAULT_GEMINI_API_BASE.to_string()),
            tts_api_base: var("TTS_API_BASE").unwrap_or_else(|| DEFAULT_TTS_API_BASE.to_string()),
        })
    }

    /// The Gemini API key, or an error naming the missing variable.
    pub fn require_gemini_api_key(&self) -> Result<&str, ConfigError> {
        self.gemini_api_key
            .as_deref()
            .ok_or_else(|| ConfigError::missing_env_var("GEMINI_KEY"))
    }

    /// Get the Gemini `generateContent` endpoint for the configured model.
    pub fn gemini_endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.gemini_api_base.trim_end_matches('/'),
            self.gemini_model
        )
    }

    /// Get the Cloud TTS `text:synthesize` endpoint.
    pub fn tts_endpoint(&self) -> String {
        format!("{}/text:synthesize", self.tts_api_base.trim_end_matches('/'))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            gemini_api_key: None,
            shared_secret: None,
            gemini_model: DEFAULT_GEMINI_MODEL.to_string(),
            gemini_api_base: DEFAULT_GEMINI_API_BASE.to_string(),
            tts_api_base: DEFAULT_TTS_API_BASE.to_string(),
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redact = |v: &Option<String>| v.as_ref().map(|_| "<redacted>");
        f.debug_struct("Config")
            .field("gemini_api_key", &redact(&self.gemini_api_key))
            .field("shared_secret", &redact(&self.shared_secret))
            .field("gemini_model", &self.gemini_model)
            .field("gemini_api_base", &self.gemini_api_base)
            .field("tts_api_base", &self.tts_api_base)
            .finish()
    }
}
