//! Workspace-level integration tests for the Lesson Helper functions.
//!
//! These tests verify:
//! - Each server can be built from configuration and reports its tools
//! - Tool schemas are well-formed and use the app's camelCase field names
//! - Both functions answer with the same callable error envelope

pub mod error_envelope;
pub mod server_startup;
pub mod tool_schema;
