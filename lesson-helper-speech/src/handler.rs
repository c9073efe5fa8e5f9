//! Speech synthesis handler for the `synthesizeSpeech` function.
//!
//! This module provides the `SpeechHandler` struct and request types for
//! text-to-speech synthesis using Google's Cloud TTS API.

use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use lesson_helper_common::auth::AuthProvider;
use lesson_helper_common::config::Config;
use lesson_helper_common::error::Error;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

/// Language the lessons are read in.
pub const DEFAULT_LANGUAGE_CODE: &str = "en-US";

/// Voice used for every lesson (female, Neural2).
pub const DEFAULT_VOICE: &str = "en-US-Neural2-F";

/// SSML gender of [`DEFAULT_VOICE`].
pub const DEFAULT_VOICE_GENDER: &str = "FEMALE";

/// Audio encoding requested from Cloud TTS.
pub const AUDIO_ENCODING: &str = "MP3";

/// MIME type of [`AUDIO_ENCODING`].
pub const AUDIO_MIME_TYPE: &str = "audio/mpeg";

/// Returned to the caller when `text` is missing.
pub const MISSING_TEXT_MESSAGE: &str = "The function must be called with 'text'.";

/// Returned to the caller for every upstream failure.
pub const INTERNAL_ERROR_MESSAGE: &str = "An error occurred while synthesizing speech.";

/// Text to read aloud.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
pub struct SpeechRequest {
    /// Text to synthesize into speech.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

/// Synthesized audio as returned to the app.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeechResponse {
    /// MP3 audio, standard base64 with padding.
    pub audio_base64: String,
}

/// Validation error details for speech requests.
#[derive(Debug, Clone)]
pub struct ValidationError {
    /// The field that failed validation.
    pub field: String,
    /// Description of the validation failure.
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl SpeechRequest {
    /// Create a request for the given text.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
        }
    }

    /// Validate the request. Empty text counts as missing.
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        match self.text.as_deref() {
            Some(text) if !text.is_empty() => Ok(()),
            _ => Err(vec![ValidationError {
                field: "text".to_string(),
                message: "Text cannot be empty".to_string(),
            }]),
        }
    }
}

/// Decoded audio returned by Cloud TTS.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthesizedAudio {
    /// Raw audio bytes
    pub data: Vec<u8>,
    /// MIME type of the audio
    pub mime_type: String,
}

impl SynthesizedAudio {
    /// The audio bytes in standard base64.
    pub fn to_base64(&self) -> String {
        BASE64.encode(&self.data)
    }

    /// `data:` URI embedding the audio.
    pub fn to_data_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.to_base64())
    }
}

impl From<&SynthesizedAudio> for SpeechResponse {
    fn from(audio: &SynthesizedAudio) -> Self {
        Self {
            audio_base64: audio.to_base64(),
        }
    }
}

/// Speech synthesis handler.
///
/// Handles speech requests using the Cloud TTS API with ADC bearer tokens.
pub struct SpeechHandler {
    /// Application configuration.
    pub config: Config,
    /// HTTP client for API requests.
    pub http: reqwest::Client,
    /// Authentication provider.
    pub auth: AuthProvider,
}

impl SpeechHandler {
    /// Create a new SpeechHandler with the given configuration.
    ///
    /// # Errors
    /// Returns an error if auth provider initialization fails.
    #[instrument(level = "debug", name = "speech_handler_new", skip_all)]
    pub async fn new(config: Config) -> Result<Self, Error> {
        debug!("Initializing SpeechHandler");

        let auth = AuthProvider::new().await?;
        let http = reqwest::Client::new();

        Ok(Self { config, http, auth })
    }

    /// Create a new SpeechHandler with provided dependencies.
    pub fn with_deps(config: Config, http: reqwest::Client, auth: AuthProvider) -> Self {
        Self { config, http, auth }
    }

    /// Synthesize speech from text.
    ///
    /// # Returns
    /// * `Ok(SynthesizedAudio)` - MP3 audio bytes
    /// * `Err(Error::Validation)` - If text is missing
    /// * `Err(Error)` - If the token fetch or the API call fails, or no audio comes back
    #[instrument(level = "info", name = "synthesize_speech", skip(self, request))]
    pub async fn synthesize(&self, request: SpeechRequest) -> Result<SynthesizedAudio, Error> {
        request.validate().map_err(|errors| {
            let messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            debug!(errors = %messages.join("; "), "Rejecting speech request");
            Error::validation(MISSING_TEXT_MESSAGE)
        })?;

        let text = request.text.unwrap_or_default();
        info!(voice = DEFAULT_VOICE, text_len = text.len(), "Synthesizing speech with Cloud TTS API");

        let tts_request = TtsRequest::new(text);

        let authorization = self.auth.bearer_header().await?;

        let endpoint = self.config.tts_endpoint();
        debug!(endpoint = %endpoint, "Calling Cloud TTS API");

        let response = self
            .http
            .post(&endpoint)
            .header(reqwest::header::AUTHORIZATION, authorization)
            .json(&tts_request)
            .send()
            .await
            .map_err(|e| Error::api(&endpoint, 0, format!("Request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::api(&endpoint, status.as_u16(), body));
        }

        let api_response: TtsResponse = response.json().await.map_err(|e| {
            Error::api(
                &endpoint,
                status.as_u16(),
                format!("Failed to parse response: {}", e),
            )
        })?;

        let audio_content = api_response
            .audio_content
            .filter(|content| !content.is_empty())
            .ok_or_else(|| Error::api(&endpoint, status.as_u16(), "No audio content returned from API"))?;

        let data = BASE64.decode(audio_content.as_bytes()).map_err(|e| {
            Error::api(&endpoint, status.as_u16(), format!("Invalid audio content: {}", e))
        })?;

        info!(bytes = data.len(), "Received audio data from Cloud TTS API");

        Ok(SynthesizedAudio {
            data,
            mime_type: AUDIO_MIME_TYPE.to_string(),
        })
    }
}

// =============================================================================
// API Request/Response Types
// =============================================================================

/// Cloud TTS API request.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TtsRequest {
    pub input: TtsInput,
    pub voice: TtsVoice,
    pub audio_config: TtsAudioConfig,
}

impl TtsRequest {
    /// Request for `text` with the fixed lesson voice and MP3 output.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            input: TtsInput { text: text.into() },
            voice: TtsVoice {
                language_code: DEFAULT_LANGUAGE_CODE.to_string(),
                name: DEFAULT_VOICE.to_string(),
                ssml_gender: DEFAULT_VOICE_GENDER.to_string(),
            },
            audio_config: TtsAudioConfig {
                audio_encoding: AUDIO_ENCODING.to_string(),
            },
        }
    }
}

/// TTS input.
#[derive(Debug, Serialize)]
pub struct TtsInput {
    pub text: String,
}

/// TTS voice selection.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TtsVoice {
    /// Language code (e.g., "en-US")
    pub language_code: String,
    /// Voice name
    pub name: String,
    /// MALE, FEMALE or NEUTRAL
    pub ssml_gender: String,
}

/// TTS audio configuration.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TtsAudioConfig {
    pub audio_encoding: String,
}

/// Cloud TTS API response.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TtsResponse {
    /// Base64-encoded audio content
    #[serde(default)]
    pub audio_content: Option<String>,
}
