//! Lesson Helper Common Library
//!
//! Shared utilities for configuration, authentication, error handling, the
//! callable wire protocol, and tracing across the Lesson Helper functions.

#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod auth;
pub mod callable;
pub mod config;
pub mod error;
pub mod secret;
pub mod server;
pub mod tracing;
pub mod transport;

#[cfg(feature = "otel")]
#[cfg_attr(docsrs, doc(cfg(feature = "otel")))]
pub mod otel;


pub use callable::{CallableError, CallableResponse, FunctionsErrorCode};
pub use config::Config;
pub use error::{AuthError, ConfigError, Error, Result};
pub use secret::SharedSecret;
pub use server::{FunctionServerBuilder, ServerError, shutdown_channel};
pub use transport::{Transport, TransportArgs, TransportMode};
