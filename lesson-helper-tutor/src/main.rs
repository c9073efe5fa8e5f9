//! Lesson Helper Tutor
//!
//! Serves the `askTheTutor` callable function and the `ask_the_tutor` MCP tool.

use anyhow::Result;
use clap::Parser;
use lesson_helper_common::{Config, FunctionServerBuilder, SharedSecret, TransportArgs};
use lesson_helper_tutor::TutorServer;

#[cfg(feature = "otel")]
use lesson_helper_common::otel::{OtelConfig, init_tracing_with_optional_otel};

/// Command-line arguments for the tutor function.
#[derive(Parser, Debug)]
#[command(name = "lesson-helper-tutor")]
#[command(about = "askTheTutor function answering lesson questions with Gemini")]
struct Args {
    /// Transport configuration
    #[command(flatten)]
    transport: TransportArgs,
}

#[tokio::main]
async fn main() -> Result<()> {
    #[cfg(feature = "otel")]
    let _otel_guard = {
        let config = OtelConfig::from_env().with_service_name("lesson-helper-tutor");
        init_tracing_with_optional_otel(config).await
    };

    #[cfg(not(feature = "otel"))]
    lesson_helper_common::tracing::init_tracing();

    tracing::info!("lesson-helper-tutor starting...");

    let args = Args::parse();

    let config = Config::from_env()?;
    tracing::info!(
        model = %config.gemini_model,
        shared_secret = config.shared_secret.is_some(),
        "Configuration loaded"
    );

    let shared_secret = config.shared_secret.as_deref().map(SharedSecret::new);
    if shared_secret.is_none() {
        tracing::warn!("SHARED_SECRET is not set, askTheTutor accepts calls without a secret");
    }

    let server = TutorServer::new(config)?;

    let transport = args.transport.into_transport();
    FunctionServerBuilder::new(server.clone())
        .with_routes(server.callable_routes())
        .with_shared_secret(shared_secret)
        .with_transport(transport)
        .run()
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}
