//! Google OAuth2 credentials for the Cloud Text-to-Speech call.
//!
//! Tokens normally come from Application Default Credentials through
//! `gcp_auth`, which caches them and refreshes them before expiry. A fixed
//! token can be used instead against emulators and mock servers.
//!
//! The Gemini API is not covered here: it is called with an API key.

use std::fmt;
use std::sync::Arc;

use gcp_auth::TokenProvider;
use tracing::{debug, instrument};

use crate::error::AuthError;

/// OAuth2 scope Cloud TTS accepts.
pub const CLOUD_PLATFORM_SCOPE: &str = "https://www.googleapis.com/auth/cloud-platform";

#[derive(Clone)]
enum Credentials {
    Adc(Arc<dyn TokenProvider>),
    Fixed(Arc<str>),
}

/// Source of bearer tokens for Google Cloud APIs.
#[derive(Clone)]
pub struct AuthProvider {
    credentials: Credentials,
}

impl AuthProvider {
    /// Discover Application Default Credentials.
    ///
    /// Looks at `GOOGLE_APPLICATION_CREDENTIALS`, the gcloud user credentials
    /// file, the metadata server on Google Cloud, and finally the gcloud CLI.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::NotConfigured` when none of them yields credentials.
    #[instrument(level = "debug", name = "adc_discover")]
    pub async fn new() -> Result<Self, AuthError> {
        let provider = gcp_auth::provider().await.map_err(|e| {
            debug!(error = %e, "No Application Default Credentials");
            AuthError::NotConfigured
        })?;

        debug!("Application Default Credentials found");
        Ok(Self {
            credentials: Credentials::Adc(provider),
        })
    }

    /// Use a fixed access token, e.g. one printed by
    /// `gcloud auth print-access-token`. It is never refreshed.
    pub fn from_token(token: impl AsRef<str>) -> Self {
        Self {
            credentials: Credentials::Fixed(Arc::from(token.as_ref())),
        }
    }

    /// Whether tokens come from Application Default Credentials.
    pub fn is_adc(&self) -> bool {
        matches!(self.credentials, Credentials::Adc(_))
    }

    /// An access token for [`CLOUD_PLATFORM_SCOPE`].
    ///
    /// # Errors
    ///
    /// Returns `AuthError::RefreshFailed` if ADC cannot mint a token or the
    /// fixed token is empty.
    pub async fn access_token(&self) -> Result<String, AuthError> {
        match &self.credentials {
            Credentials::Adc(provider) => {
                let token = provider.token(&[CLOUD_PLATFORM_SCOPE]).await.map_err(|e| {
                    debug!(error = %e, "Token refresh failed");
                    AuthError::refresh_failed(e.to_string())
                })?;
                Ok(token.as_str().to_string())
            }
            Credentials::Fixed(token) if token.is_empty() => {
                Err(AuthError::refresh_failed("fixed access token is empty"))
            }
            Credentials::Fixed(token) => Ok(token.to_string()),
        }
    }

    /// `Authorization` header value carrying a fresh access token.
    pub async fn bearer_header(&self) -> Result<String, AuthError> {
        Ok(format!("Bearer {}", self.access_token().await?))
    }
}

impl fmt::Debug for AuthProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let source = if self.is_adc() { "adc" } else { "fixed" };
        f.debug_struct("AuthProvider").field("source", &source).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fixed_token() {
        let auth = AuthProvider::from_token("test-token-123");

        assert!(!auth.is_adc());
        assert_eq!(auth.access_token().await.unwrap(), "test-token-123");
    }

    #[tokio::test]
    async fn test_bearer_header() {
        let auth = AuthProvider::from_token("ya29.abc");
        assert_eq!(auth.bearer_header().await.unwrap(), "Bearer ya29.abc");
    }

    #[tokio::test]
    async fn test_empty_fixed_token_is_rejected() {
        let err = AuthProvider::from_token("").bearer_header().await.unwrap_err();
        assert!(matches!(err, AuthError::RefreshFailed(_)));
    }

    #[tokio::test]
    async fn test_clones_share_token() {
        let auth = AuthProvider::from_token("shared");
        let copy = auth.clone();
        assert_eq!(copy.access_token().await.unwrap(), "shared");
    }

    #[test]
    fn test_debug_does_not_print_token() {
        let auth = AuthProvider::from_token("ya29.super-secret");
        let debug = format!("{:?}", auth);
        assert!(!debug.contains("super-secret"));
        assert!(debug.contains("fixed"));
    }
}
