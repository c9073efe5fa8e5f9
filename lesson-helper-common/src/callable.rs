//! Callable function wire protocol.
//!
//! Both functions speak the Firebase callable protocol over HTTP:
//!
//! - request body: `{"data": <payload>}`
//! - success: HTTP 200 with `{"result": <payload>}`
//! - failure: `{"error": {"status": "INVALID_ARGUMENT", "message": "..."}}`
//!   with the HTTP status mapped from the error code
//!
//! [`CallableError`] is the only error type a caller ever sees. Internal
//! errors are logged here and replaced by the handler's fixed message.

use std::fmt;

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use rmcp::ErrorData as McpError;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error};

use crate::error::Error;

/// Message returned when the request envelope itself is malformed.
pub const BAD_REQUEST_MESSAGE: &str = "Bad Request";

/// Error codes a callable function can return.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FunctionsErrorCode {
    /// A required argument is missing or malformed.
    InvalidArgument,
    /// The caller did not present valid credentials.
    Unauthenticated,
    /// Something failed on the server side.
    Internal,
}

impl FunctionsErrorCode {
    /// Canonical status name used in the error envelope.
    pub fn status(&self) -> &'static str {
        match self {
            FunctionsErrorCode::InvalidArgument => "INVALID_ARGUMENT",
            FunctionsErrorCode::Unauthenticated => "UNAUTHENTICATED",
            FunctionsErrorCode::Internal => "INTERNAL",
        }
    }

    /// Client-side code name (what app code matches on).
    pub fn as_str(&self) -> &'static str {
        match self {
            FunctionsErrorCode::InvalidArgument => "invalid-argument",
            FunctionsErrorCode::Unauthenticated => "unauthenticated",
            FunctionsErrorCode::Internal => "internal",
        }
    }

    /// HTTP status the code travels with.
    pub fn http_status(&self) -> StatusCode {
        match self {
            FunctionsErrorCode::InvalidArgument => StatusCode::BAD_REQUEST,
            FunctionsErrorCode::Unauthenticated => StatusCode::UNAUTHORIZED,
            FunctionsErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl fmt::Display for FunctionsErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned to callers of a callable function.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{code}: {message}")]
pub struct CallableError {
    /// Error code
    pub code: FunctionsErrorCode,
    /// Human-readable message, safe to show to the caller
    pub message: String,
}

impl CallableError {
    /// Create a new callable error.
    pub fn new(code: FunctionsErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Create an `invalid-argument` error.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new(FunctionsErrorCode::InvalidArgument, message)
    }

    /// Create an `unauthenticated` error.
    pub fn unauthenticated(message: impl Into<String>) -> Self {
        Self::new(FunctionsErrorCode::Unauthenticated, message)
    }

    /// Create an `internal` error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(FunctionsErrorCode::Internal, message)
    }

    /// Map an internal error onto what the caller is allowed to see.
    ///
    /// Validation errors keep their message. Everything else is logged and
    /// replaced by `internal_message`.
    pub fn from_error(err: &Error, internal_message: &str) -> Self {
        match err {
            Error::Validation(message) => Self::invalid_argument(message.clone()),
            other => {
                error!(error = %other, "{}", internal_message);
                Self::internal(internal_message)
            }
        }
    }

    /// Convert into an MCP protocol error.
    pub fn into_mcp_error(self) -> McpError {
        match self.code {
            FunctionsErrorCode::InvalidArgument => McpError::invalid_params(self.message, None),
            FunctionsErrorCode::Unauthenticated => McpError::invalid_request(self.message, None),
            FunctionsErrorCode::Internal => McpError::internal_error(self.message, None),
        }
    }
}

#[derive(Serialize)]
struct ErrorEnvelope<'a> {
    error: ErrorDetail<'a>,
}

#[derive(Serialize)]
struct ErrorDetail<'a> {
    status: &'static str,
    message: &'a str,
}

impl IntoResponse for CallableError {
    fn into_response(self) -> Response {
        let body = ErrorEnvelope {
            error: ErrorDetail {
                status: self.code.status(),
                message: &self.message,
            },
        };
        (self.code.http_status(), Json(body)).into_response()
    }
}

/// Successful callable response: `{"result": ...}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallableResponse<T> {
    /// The function's return value
    pub result: T,
}

impl<T> CallableResponse<T> {
    /// Wrap a result.
    pub fn new(result: T) -> Self {
        Self { result }
    }
}

impl<T: Serialize> IntoResponse for CallableResponse<T> {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}

/// Decode the `data` member of a callable request body.
///
/// A body that is not a JSON object with a `data` member fails with
/// [`BAD_REQUEST_MESSAGE`]. A `data` member that does not fit `T` fails with
/// `invalid_message`.
pub fn decode_data<T: DeserializeOwned>(body: &[u8], invalid_message: &str) -> Result<T, CallableError> {
    let envelope: serde_json::Value = serde_json::from_slice(body).map_err(|e| {
        debug!(error = %e, "Request body is not JSON");
        CallableError::invalid_argument(BAD_REQUEST_MESSAGE)
    })?;

    let data = envelope
        .as_object()
        .and_then(|object| object.get("data"))
        .ok_or_else(|| {
            debug!("Request body is missing data");
            CallableError::invalid_argument(BAD_REQUEST_MESSAGE)
        })?;

    T::deserialize(data).map_err(|e| {
        debug!(error = %e, "Request data has the wrong shape");
        CallableError::invalid_argument(invalid_message)
    })
}
