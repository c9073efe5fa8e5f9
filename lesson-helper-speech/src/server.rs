//! Server surfaces for speech synthesis.
//!
//! This module exposes the speech handler two ways:
//! - the `synthesizeSpeech` callable function route (`POST /synthesizeSpeech`)
//! - the `synthesize_speech` MCP tool, returning a `data:audio/mpeg;base64,...` URI

use crate::handler::{
    INTERNAL_ERROR_MESSAGE, MISSING_TEXT_MESSAGE, SpeechHandler, SpeechRequest, SpeechResponse,
    SynthesizedAudio,
};
use axum::{Router, body::Bytes, extract::State, routing::post};
use lesson_helper_common::callable::{CallableError, CallableResponse, decode_data};
use lesson_helper_common::config::Config;
use lesson_helper_common::error::Error;
use rmcp::{
    ErrorData as McpError, ServerHandler,
    model::{CallToolResult, Content, ServerCapabilities, ServerInfo, Tool},
};
use std::borrow::Cow;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, instrument};
use uuid::Uuid;

/// Route of the callable function.
pub const SYNTHESIZE_SPEECH_PATH: &str = "/synthesizeSpeech";

/// Name of the MCP tool.
pub const SYNTHESIZE_SPEECH_TOOL: &str = "synthesize_speech";

/// Speech server, shared by the callable route and the MCP handler.
#[derive(Clone)]
pub struct SpeechServer {
    /// Handler for speech synthesis operations
    handler: Arc<RwLock<Option<SpeechHandler>>>,
    /// Server configuration
    config: Config,
}

impl SpeechServer {
    /// Create a new SpeechServer with the given configuration.
    ///
    /// Credentials are resolved on the first call.
    pub fn new(config: Config) -> Self {
        Self {
            handler: Arc::new(RwLock::new(None)),
            config,
        }
    }

    /// Create a server around an already-built handler.
    pub fn with_handler(handler: SpeechHandler) -> Self {
        Self {
            config: handler.config.clone(),
            handler: Arc::new(RwLock::new(Some(handler))),
        }
    }

    /// Initialize the handler (called lazily on first use).
    async fn ensure_handler(&self) -> Result<(), Error> {
        if self.handler.read().await.is_some() {
            return Ok(());
        }

        let mut handler = self.handler.write().await;
        if handler.is_none() {
            *handler = Some(SpeechHandler::new(self.config.clone()).await?);
        }
        Ok(())
    }

    async fn synthesize_audio(&self, request: SpeechRequest) -> Result<SynthesizedAudio, CallableError> {
        let to_callable = |e: Error| CallableError::from_error(&e, INTERNAL_ERROR_MESSAGE);

        // Validation does not need credentials.
        request
            .validate()
            .map_err(|_| CallableError::invalid_argument(MISSING_TEXT_MESSAGE))?;

        self.ensure_handler().await.map_err(to_callable)?;

        let handler_guard = self.handler.read().await;
        let handler = handler_guard
            .as_ref()
            .ok_or_else(|| CallableError::internal(INTERNAL_ERROR_MESSAGE))?;

        handler.synthesize(request).await.map_err(to_callable)
    }

    /// Synthesize speech, with errors already mapped for the caller.
    pub async fn synthesize(&self, request: SpeechRequest) -> Result<SpeechResponse, CallableError> {
        let audio = self.synthesize_audio(request).await?;
        Ok(SpeechResponse::from(&audio))
    }

    /// Router serving `POST /synthesizeSpeech`.
    pub fn callable_routes(&self) -> Router {
        Router::new()
            .route(SYNTHESIZE_SPEECH_PATH, post(synthesize_speech))
            .with_state(self.clone())
    }

    /// The MCP tools this server offers.
    pub fn tools() -> Vec<Tool> {
        use schemars::schema_for;

        let schema = schema_for!(SpeechRequest);
        let input_schema = match serde_json::to_value(&schema).unwrap_or_default() {
            serde_json::Value::Object(map) => Arc::new(map),
            _ => Arc::new(serde_json::Map::new()),
        };

        vec![Tool {
            name: Cow::Borrowed(SYNTHESIZE_SPEECH_TOOL),
            description: Some(Cow::Borrowed(
                "Read text aloud with a friendly en-US voice using Google Cloud Text-to-Speech. \
                 Returns MP3 audio as a base64 data URI.",
            )),
            input_schema,
            annotations: None,
            icons: None,
            meta: None,
            output_schema: None,
            title: None,
        }]
    }

    async fn synthesize_tool(&self, request: SpeechRequest) -> Result<CallToolResult, McpError> {
        info!("Synthesizing speech over MCP");

        let audio = self
            .synthesize_audio(request)
            .await
            .map_err(CallableError::into_mcp_error)?;
        Ok(CallToolResult::success(vec![Content::text(audio.to_data_uri())]))
    }
}

/// `POST /synthesizeSpeech`
#[instrument(name = "synthesizeSpeech", skip_all, fields(invocation_id = %Uuid::new_v4()))]
async fn synthesize_speech(
    State(server): State<SpeechServer>,
    body: Bytes,
) -> Result<CallableResponse<SpeechResponse>, CallableError> {
    let request: SpeechRequest = decode_data(&body, MISSING_TEXT_MESSAGE)?;
    let response = server.synthesize(request).await?;
    Ok(CallableResponse::new(response))
}

impl ServerHandler for SpeechServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(
                "Text-to-speech for lesson content using Google Cloud TTS. \
                 Use synthesize_speech to turn text into MP3 audio."
                    .to_string(),
            ),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }

    fn list_tools(
        &self,
        _params: Option<rmcp::model::PaginatedRequestParams>,
        _context: rmcp::service::RequestContext<rmcp::service::RoleServer>,
    ) -> impl std::future::Future<Output = Result<rmcp::model::ListToolsResult, McpError>> + Send + '_
    {
        async move {
            Ok(rmcp::model::ListToolsResult {
                tools: Self::tools(),
                next_cursor: None,
                meta: None,
            })
        }
    }

    fn call_tool(
        &self,
        params: rmcp::model::CallToolRequestParams,
        _context: rmcp::service::RequestContext<rmcp::service::RoleServer>,
    ) -> impl std::future::Future<Output = Result<CallToolResult, McpError>> + Send + '_ {
        async move {
            match params.name.as_ref() {
                SYNTHESIZE_SPEECH_TOOL => {
                    let request: SpeechRequest = params
                        .arguments
                        .map(|args| serde_json::from_value(serde_json::Value::Object(args)))
                        .transpose()
                        .map_err(|_| McpError::invalid_params(MISSING_TEXT_MESSAGE, None))?
                        .unwrap_or_default();

                    self.synthesize_tool(request).await
                }
                _ => Err(McpError::invalid_params(
                    format!("Unknown tool: {}", params.name),
                    None,
                )),
            }
        }
    }
}
