//! OpenTelemetry tracing with Google Cloud Trace export.
//!
//! Only compiled with the `otel` feature:
//!
//! ```toml
//! [dependencies]
//! lesson-helper-common = { version = "*", features = ["otel"] }
//! ```
//!
//! # Usage
//!
//! ```no_run
//! use lesson_helper_common::otel::{OtelConfig, init_tracing_with_optional_otel};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = OtelConfig::from_env().with_service_name("lesson-helper-tutor");
//!     let _guard = init_tracing_with_optional_otel(config).await;
//!     tracing::info!("Function started");
//! }
//! ```
//!
//! # Environment Variables
//!
//! - `OTEL_ENABLED`: "true" or "1" to enable export (default: disabled)
//! - `PROJECT_ID`: Cloud project receiving traces, falling back to `GOOGLE_CLOUD_PROJECT`
//! - `OTEL_SERVICE_NAME`: service name attached to spans (default: "lesson-helper")
//! - `RUST_LOG`: log filtering, as without the feature

use crate::tracing::{env_filter, fmt_layer};
use opentelemetry_gcloud_trace::GcpCloudTraceExporterBuilder;
use std::env;
use thiserror::Error;
use tracing_subscriber::prelude::*;

/// Service name used when `OTEL_SERVICE_NAME` is unset.
pub const DEFAULT_SERVICE_NAME: &str = "lesson-helper";

/// Errors that can occur during OpenTelemetry initialization.
#[derive(Debug, Error)]
pub enum OtelError {
    #[error("OpenTelemetry is not enabled. Set OTEL_ENABLED=true to enable.")]
    NotEnabled,

    #[error("PROJECT_ID environment variable is required for Google Cloud Trace export")]
    MissingProjectId,

    #[error("Failed to create Google Cloud Trace exporter: {0}")]
    ExporterCreationFailed(String),

    #[error("Failed to install tracer provider: {0}")]
    TracerInstallFailed(String),

    #[error("Failed to set global tracing subscriber: {0}")]
    SubscriberSetFailed(String),
}

/// Configuration for OpenTelemetry tracing.
#[derive(Debug, Clone)]
pub struct OtelConfig {
    pub enabled: bool,
    pub project_id: Option<String>,
    pub service_name: String,
    /// Used when `RUST_LOG` is not set.
    pub default_log_level: String,
}

impl Default for OtelConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            project_id: None,
            service_name: DEFAULT_SERVICE_NAME.to_string(),
            default_log_level: "info".to_string(),
        }
    }
}

impl OtelConfig {
    /// Enabled configuration exporting to `project_id`.
    pub fn new(project_id: impl Into<String>) -> Self {
        Self {
            enabled: true,
            project_id: Some(project_id.into()),
            ..Default::default()
        }
    }

    /// Load configuration from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Self {
            enabled: lookup("OTEL_ENABLED").is_some_and(|v| is_truthy(&v)),
            project_id: non_empty("PROJECT_ID").or_else(|| non_empty("GOOGLE_CLOUD_PROJECT")),
            service_name: non_empty("OTEL_SERVICE_NAME")
                .unwrap_or_else(|| DEFAULT_SERVICE_NAME.to_string()),
            default_log_level: "info".to_string(),
        }
    }

    pub fn with_service_name(mut self, name: impl Into<String>) -> Self {
        self.service_name = name.into();
        self
    }

    pub fn with_default_log_level(mut self, level: impl Into<String>) -> Self {
        self.default_log_level = level.into();
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}

fn is_truthy(value: &str) -> bool {
    value == "true" || value == "1"
}

/// Shuts the tracer provider down when dropped.
///
/// Keep it alive for the lifetime of the process so buffered spans are flushed.
pub struct OtelGuard {
    provider: opentelemetry_sdk::trace::SdkTracerProvider,
}

impl Drop for OtelGuard {
    fn drop(&mut self) {
        tracing::debug!("Shutting down OpenTelemetry tracer provider");
        if let Err(e) = self.provider.shutdown() {
            tracing::error!("Failed to shutdown OpenTelemetry tracer provider: {:?}", e);
        }
    }
}

/// Install a subscriber that logs to stderr and exports spans to Cloud Trace.
///
/// # Errors
///
/// Fails when the config is disabled, has no project, when the exporter
/// cannot be built, or when a global subscriber is already installed.
pub async fn init_otel_tracing(config: OtelConfig) -> Result<OtelGuard, OtelError> {
    if !config.enabled {
        return Err(OtelError::NotEnabled);
    }

    let project_id = config.project_id.ok_or(OtelError::MissingProjectId)?;

    let exporter = GcpCloudTraceExporterBuilder::new(project_id);

    let provider = exporter
        .create_provider()
        .await
        .map_err(|e| OtelError::ExporterCreationFailed(e.to_string()))?;

    let tracer = exporter
        .install(&provider)
        .await
        .map_err(|e| OtelError::TracerInstallFailed(e.to_string()))?;

    opentelemetry::global::set_tracer_provider(provider.clone());

    tracing_subscriber::registry()
        .with(env_filter(&config.default_log_level))
        .with(fmt_layer())
        .with(tracing_opentelemetry::layer().with_tracer(tracer))
        .try_init()
        .map_err(|e| OtelError::SubscriberSetFailed(e.to_string()))?;

    tracing::info!(
        service_name = %config.service_name,
        "OpenTelemetry tracing initialized with Google Cloud Trace export"
    );

    Ok(OtelGuard { provider })
}

/// Initialize tracing, exporting to Cloud Trace when the config enables it.
///
/// Falls back to console-only tracing when export is disabled or fails to
/// start. Returns the guard only when export is active.
pub async fn init_tracing_with_optional_otel(config: OtelConfig) -> Option<OtelGuard> {
    if !config.enabled {
        init_fallback_tracing(&config.default_log_level);
        tracing::debug!("OpenTelemetry disabled, using standard tracing");
        return None;
    }

    let default_level = config.default_log_level.clone();
    match init_otel_tracing(config).await {
        Ok(guard) => Some(guard),
        Err(e) => {
            init_fallback_tracing(&default_level);
            tracing::warn!("Failed to initialize OpenTelemetry, using standard tracing: {}", e);
            None
        }
    }
}

fn init_fallback_tracing(default_level: &str) {
    let _ = tracing_subscriber::registry()
        .with(env_filter(default_level))
        .with(fmt_layer())
        .try_init();
}

/// Whether `OTEL_ENABLED` asks for export, without loading the full config.
pub fn is_otel_enabled() -> bool {
    env::var("OTEL_ENABLED").is_ok_and(|v| is_truthy(&v))
}
