//! Error types for the common library.
//!
//! This module provides the internal error hierarchy using `thiserror`. These
//! errors never reach callers directly: the callable layer maps them onto a
//! [`CallableError`](crate::callable::CallableError) with a fixed code.
//!
//! # Error Categories
//!
//! - `ConfigError`: Missing or invalid configuration
//! - `AuthError`: Google authentication failures
//! - `Error::Api`: Upstream API errors (includes endpoint and status)
//! - `Error::Validation`: Input validation failures

use thiserror::Error;

/// Unified error type for the Lesson Helper functions.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration errors (missing env vars, invalid values)
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Authentication errors (ADC not configured, token refresh failures)
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// Upstream API errors with endpoint and HTTP status context.
    ///
    /// A status code of 0 means the request never produced a response
    /// (connection refused, DNS failure, and so on).
    #[error("API error for {endpoint} (HTTP {status_code}): {message}")]
    Api {
        /// The API endpoint that was called
        endpoint: String,
        /// HTTP status code returned by the API
        status_code: u16,
        /// Error message from the API or describing the failure
        message: String,
    },

    /// Input validation errors. The message is safe to show to callers.
    #[error("Validation error: {0}")]
    Validation(String),
}

impl Error {
    /// Create a new API error with endpoint, status code, and message.
    ///
    /// # Example
    ///
    /// ```
    /// use lesson_helper_common::error::Error;
    ///
    /// let err = Error::api(
    ///     "https://texttospeech.googleapis.com/v1/text:synthesize",
    ///     503,
    ///     "Service unavailable"
    /// );
    /// assert!(err.to_string().contains("texttospeech"));
    /// assert!(err.to_string().contains("503"));
    /// ```
    pub fn api(endpoint: impl Into<String>, status_code: u16, message: impl Into<String>) -> Self {
        Error::Api {
            endpoint: endpoint.into(),
            status_code,
            message: message.into(),
        }
    }

    /// Create a new validation error.
    ///
    /// # Example
    ///
    /// ```
    /// use lesson_helper_common::error::Error;
    ///
    /// let err = Error::validation("text cannot be empty");
    /// assert!(err.to_string().contains("text cannot be empty"));
    /// ```
    pub fn validation(message: impl Into<String>) -> Self {
        Error::Validation(message.into())
    }

    /// Whether this error was caused by the caller's input.
    pub fn is_validation(&self) -> bool {
        matches!(self, Error::Validation(_))
    }
}

/// Configuration errors.
///
/// These errors occur when loading or validating configuration from
/// environment variables.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required environment variable is not set
    #[error("Required environment variable {0} is not set")]
    MissingEnvVar(String),

    /// An environment variable has an invalid value
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

impl ConfigError {
    /// Create a new missing environment variable error.
    pub fn missing_env_var(name: impl Into<String>) -> Self {
        ConfigError::MissingEnvVar(name.into())
    }

    /// Create a new invalid value error.
    pub fn invalid_value(name: impl Into<String>, reason: impl Into<String>) -> Self {
        ConfigError::InvalidValue(name.into(), reason.into())
    }
}

/// Authentication errors.
///
/// These errors occur while obtaining OAuth2 tokens for Google Cloud APIs
/// using Application Default Credentials (ADC).
#[derive(Debug, Error)]
pub enum AuthError {
    /// ADC is not configured
    #[error("ADC not configured. Run 'gcloud auth application-default login' or set GOOGLE_APPLICATION_CREDENTIALS")]
    NotConfigured,

    /// Token refresh failed
    #[error("Token refresh failed: {0}")]
    RefreshFailed(String),
}

impl AuthError {
    /// Create a new token refresh failed error.
    pub fn refresh_failed(message: impl Into<String>) -> Self {
        AuthError::RefreshFailed(message.into())
    }
}

/// Result type alias using the unified Error type.
pub type Result<T> = std::result::Result<T, Error>;
