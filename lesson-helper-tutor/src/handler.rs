//! Tutor handler for the `askTheTutor` function.
//!
//! This module provides the `TutorHandler` struct and the request types for
//! answering a child's question about a lesson with Google's Gemini API.

use lesson_helper_common::config::Config;
use lesson_helper_common::error::Error;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

/// Returned to the caller when a required field is missing.
pub const MISSING_FIELDS_MESSAGE: &str =
    "The function must be called with 'lessonContext' and 'userQuestion'.";

/// Returned to the caller for every upstream failure.
pub const INTERNAL_ERROR_MESSAGE: &str = "An error occurred while talking to the AI tutor.";

/// What the tutor is told to say when a question falls outside the lesson.
pub const OFF_TOPIC_REPLY: &str =
    "That's a wonderful question! Let's focus on our lesson for now.";

/// Name the tutor introduces itself with.
pub const TUTOR_PERSONA: &str = "Emma's Helper";

/// Header carrying the Gemini API key.
const API_KEY_HEADER: &str = "x-goog-api-key";

/// Finish reasons whose candidate text must not reach the child.
pub const BLOCKED_FINISH_REASONS: &[&str] = &[
    "SAFETY",
    "RECITATION",
    "LANGUAGE",
    "BLOCKLIST",
    "PROHIBITED_CONTENT",
    "SPII",
];

/// Longest slice of an unparseable upstream body kept in the error.
const MAX_RAW_BODY_CHARS: usize = 1000;

/// Question about a lesson, as sent by the app.
///
/// Both fields are optional at the type level so that a missing field is
/// reported with the function's own message rather than a parse error.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TutorRequest {
    /// Text of the lesson the child is working on.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lesson_context: Option<String>,

    /// The child's question.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_question: Option<String>,
}

/// The tutor's reply.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct TutorResponse {
    /// Answer text, exactly as the model produced it.
    pub answer: String,
}

/// Validation error details.
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

fn is_present(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|v| !v.is_empty())
}

impl TutorRequest {
    /// Create a request from its two fields.
    pub fn new(lesson_context: impl Into<String>, user_question: impl Into<String>) -> Self {
        Self {
            lesson_context: Some(lesson_context.into()),
            user_question: Some(user_question.into()),
        }
    }

    /// Validate the request.
    ///
    /// A field that is absent, null or empty is reported as missing.
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if !is_present(&self.lesson_context) {
            errors.push(ValidationError {
                field: "lessonContext".to_string(),
                message: "is required".to_string(),
            });
        }

        if !is_present(&self.user_question) {
            errors.push(ValidationError {
                field: "userQuestion".to_string(),
                message: "is required".to_string(),
            });
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Build the prompt sent to the model.
///
/// The lesson context and question are embedded as given.
pub fn build_prompt(lesson_context: &str, user_question: &str) -> String {
    format!(
        "You are \"{persona},\" a friendly, patient, and encouraging tutor for a 6-year-old child.\n\
         Your personality is gentle and positive.\n\
         \n\
         You MUST follow these rules strictly:\n\
         1. Your answer must be based ONLY on the provided \"Lesson Context.\"\n\
         2. Do NOT use any outside knowledge.\n\
         3. Keep your answers very short, simple, and easy for a child to understand (1-2 sentences).\n\
         4. If the user's question cannot be answered from the context, respond with a friendly message like: \"{off_topic}\"\n\
         \n\
         ---\n\
         Lesson Context: \"{lesson_context}\"\n\
         ---\n\
         Child's Question: \"{user_question}\"\n\
         ---\n\
         Your Answer:\n",
        persona = TUTOR_PERSONA,
        off_topic = OFF_TOPIC_REPLY,
    )
}

/// Tutor handler.
///
/// Answers lesson questions using the Gemini `generateContent` API.
pub struct TutorHandler {
    /// Application configuration.
    pub config: Config,
    /// HTTP client for API requests.
    pub http: reqwest::Client,
    api_key: String,
}

impl TutorHandler {
    /// Create a new TutorHandler with the given configuration.
    ///
    /// # Errors
    /// Returns a configuration error if `GEMINI_KEY` is not set.
    #[instrument(level = "debug", name = "tutor_handler_new", skip_all)]
    pub fn new(config: Config) -> Result<Self, Error> {
        Self::with_client(config, reqwest::Client::new())
    }

    /// Create a new TutorHandler that sends requests through `http`.
    pub fn with_client(config: Config, http: reqwest::Client) -> Result<Self, Error> {
        let api_key = config.require_gemini_api_key()?.to_string();
        debug!(model = %config.gemini_model, "Initializing TutorHandler");
        Ok(Self {
            config,
            http,
            api_key,
        })
    }

    /// Answer a child's question about a lesson.
    ///
    /// # Returns
    /// * `Ok(TutorResponse)` - The model's answer, unmodified
    /// * `Err(Error::Validation)` - If either field is missing
    /// * `Err(Error::Api)` - If the Gemini call fails or the answer is blocked
    #[instrument(level = "info", name = "tutor_ask", skip(self, request))]
    pub async fn ask(&self, request: TutorRequest) -> Result<TutorResponse, Error> {
        request.validate().map_err(|errors| {
            let fields: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            debug!(errors = %fields.join("; "), "Rejecting tutor request");
            Error::validation(MISSING_FIELDS_MESSAGE)
        })?;

        let lesson_context = request.lesson_context.unwrap_or_default();
        let user_question = request.user_question.unwrap_or_default();

        info!(
            model = %self.config.gemini_model,
            context_len = lesson_context.len(),
            question_len = user_question.len(),
            "Asking Gemini"
        );

        let prompt = build_prompt(&lesson_context, &user_question);
        let answer = self.generate(prompt).await?;

        info!(answer_len = answer.len(), "Received answer from Gemini");
        Ok(TutorResponse { answer })
    }

    /// Send a single user turn to Gemini and return the answer text.
    async fn generate(&self, prompt: String) -> Result<String, Error> {
        let request = GeminiRequest {
            contents: vec![GeminiContent {
                role: "user".to_string(),
                parts: vec![GeminiPart { text: prompt }],
            }],
        };

        let endpoint = self.config.gemini_endpoint();
        debug!(endpoint = %endpoint, "Calling Gemini API");

        let response = self
            .http
            .post(&endpoint)
            .header(API_KEY_HEADER, &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::api(&endpoint, 0, format!("Request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::api(&endpoint, status.as_u16(), body));
        }

        let response_text = response.text().await.map_err(|e| {
            Error::api(&endpoint, status.as_u16(), format!("Failed to read response: {}", e))
        })?;

        let api_response: GeminiResponse = serde_json::from_str(&response_text).map_err(|e| {
            let raw: String = response_text.chars().take(MAX_RAW_BODY_CHARS).collect();
            Error::api(
                &endpoint,
                status.as_u16(),
                format!("Failed to parse response: {}. Raw: {}", e, raw),
            )
        })?;

        extract_answer(&api_response)
            .map_err(|reason| Error::api(&endpoint, status.as_u16(), reason))
    }
}

/// Answer text of a Gemini response.
///
/// The first candidate's text parts are concatenated as-is; a candidate that
/// finished normally without text yields an empty answer. A blocked prompt,
/// a response without candidates, or a candidate stopped for one of
/// [`BLOCKED_FINISH_REASONS`] is an error describing why.
pub fn extract_answer(response: &GeminiResponse) -> Result<String, String> {
    let Some(candidate) = response.candidates.first() else {
        return Err(match block_reason(response) {
            Some(reason) => {
                warn!(block_reason = %reason, "Gemini blocked the prompt");
                format!("Prompt blocked: {}", reason)
            }
            None => "No candidates in response".to_string(),
        });
    };

    if let Some(reason) = candidate
        .finish_reason
        .as_deref()
        .filter(|reason| BLOCKED_FINISH_REASONS.contains(reason))
    {
        warn!(finish_reason = %reason, "Gemini withheld the answer");
        return Err(format!("Response blocked (finish reason: {})", reason));
    }

    Ok(candidate
        .content
        .iter()
        .flat_map(|content| &content.parts)
        .filter_map(|part| part.text.as_deref())
        .collect())
}

fn block_reason(response: &GeminiResponse) -> Option<&str> {
    response
        .prompt_feedback
        .as_ref()
        .and_then(|feedback| feedback.block_reason.as_deref())
}

// =============================================================================
// API Request/Response Types
// =============================================================================

/// Gemini `generateContent` request.
#[derive(Debug, Serialize)]
pub struct GeminiRequest {
    pub contents: Vec<GeminiContent>,
}

/// A single conversation turn.
#[derive(Debug, Serialize)]
pub struct GeminiContent {
    /// Role (user or model)
    pub role: String,
    pub parts: Vec<GeminiPart>,
}

/// Text part of a request turn.
#[derive(Debug, Serialize)]
pub struct GeminiPart {
    pub text: String,
}

/// Gemini API response.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiResponse {
    #[serde(default)]
    pub candidates: Vec<GeminiCandidate>,
    #[serde(default)]
    pub prompt_feedback: Option<GeminiPromptFeedback>,
}

/// Gemini response candidate.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiCandidate {
    #[serde(default)]
    pub content: Option<GeminiResponseContent>,
    /// STOP, MAX_TOKENS, SAFETY, ...
    #[serde(default)]
    pub finish_reason: Option<String>,
}

/// Gemini response content.
#[derive(Debug, Default, Deserialize)]
pub struct GeminiResponseContent {
    #[serde(default)]
    pub parts: Vec<GeminiResponsePart>,
}

/// Gemini response part. Non-text parts carry no `text`.
#[derive(Debug, Default, Deserialize)]
pub struct GeminiResponsePart {
    #[serde(default)]
    pub text: Option<String>,
}

/// Why a prompt was rejected before generation.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiPromptFeedback {
    #[serde(default)]
    pub block_reason: Option<String>,
}
