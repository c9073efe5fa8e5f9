//! Lesson Helper Speech
//!
//! Serves the `synthesizeSpeech` callable function and the `synthesize_speech` MCP tool.

use anyhow::Result;
use clap::Parser;
use lesson_helper_common::{Config, FunctionServerBuilder, TransportArgs};
use lesson_helper_speech::SpeechServer;

#[cfg(feature = "otel")]
use lesson_helper_common::otel::{OtelConfig, init_tracing_with_optional_otel};

/// Command-line arguments for the speech function.
#[derive(Parser, Debug)]
#[command(name = "lesson-helper-speech")]
#[command(about = "synthesizeSpeech function reading lesson text aloud with Cloud TTS")]
struct Args {
    /// Transport configuration
    #[command(flatten)]
    transport: TransportArgs,
}

#[tokio::main]
async fn main() -> Result<()> {
    #[cfg(feature = "otel")]
    let _otel_guard = {
        let config = OtelConfig::from_env().with_service_name("lesson-helper-speech");
        init_tracing_with_optional_otel(config).await
    };

    #[cfg(not(feature = "otel"))]
    lesson_helper_common::tracing::init_tracing();

    tracing::info!("lesson-helper-speech starting...");

    let args = Args::parse();

    let config = Config::from_env()?;
    tracing::info!(tts_api_base = %config.tts_api_base, "Configuration loaded");

    let server = SpeechServer::new(config);

    let transport = args.transport.into_transport();
    FunctionServerBuilder::new(server.clone())
        .with_routes(server.callable_routes())
        .with_transport(transport)
        .run()
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}
