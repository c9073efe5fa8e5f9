//! Shared-secret guard for callable functions.
//!
//! Callers present the secret in the `x-shared-secret` header. The guard runs
//! as axum middleware in front of every route, so a request with a wrong or
//! missing secret is rejected before its body is even read.

use std::fmt;
use std::sync::Arc;

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use subtle::ConstantTimeEq;
use tracing::warn;

use crate::callable::CallableError;

/// Header carrying the caller's shared secret.
pub const SHARED_SECRET_HEADER: &str = "x-shared-secret";

/// Message returned when the secret does not match.
pub const UNAUTHENTICATED_MESSAGE: &str = "Invalid or missing secret key.";

/// A configured shared secret.
#[derive(Clone)]
pub struct SharedSecret(Arc<str>);

impl SharedSecret {
    /// Wrap a secret value.
    pub fn new(value: impl AsRef<str>) -> Self {
        Self(Arc::from(value.as_ref()))
    }

    /// Check a presented value in constant time.
    pub fn verify(&self, presented: Option<&str>) -> bool {
        match presented {
            Some(presented) => presented.as_bytes().ct_eq(self.0.as_bytes()).into(),
            None => false,
        }
    }
}

impl fmt::Debug for SharedSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SharedSecret(<redacted>)")
    }
}

/// Axum middleware rejecting requests whose `x-shared-secret` does not match.
///
/// Use with `axum::middleware::from_fn_with_state(secret, require_shared_secret)`.
pub async fn require_shared_secret(
    State(secret): State<SharedSecret>,
    request: Request,
    next: Next,
) -> Response {
    let presented = request
        .headers()
        .get(SHARED_SECRET_HEADER)
        .and_then(|value| value.to_str().ok());

    if !secret.verify(presented) {
        warn!(
            path = %request.uri().path(),
            header_present = presented.is_some(),
            "Rejected request with invalid shared secret"
        );
        return CallableError::unauthenticated(UNAUTHENTICATED_MESSAGE).into_response();
    }

    next.run(request).await
}
