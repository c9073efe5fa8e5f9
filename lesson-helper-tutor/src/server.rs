//! Server surfaces for the tutor.
//!
//! This module exposes the tutor handler two ways:
//! - the `askTheTutor` callable function route (`POST /askTheTutor`)
//! - the `ask_the_tutor` MCP tool

use crate::handler::{
    INTERNAL_ERROR_MESSAGE, MISSING_FIELDS_MESSAGE, TutorHandler, TutorRequest, TutorResponse,
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
use tracing::{info, instrument};
use uuid::Uuid;

/// Route of the callable function.
pub const ASK_THE_TUTOR_PATH: &str = "/askTheTutor";

/// Name of the MCP tool.
pub const ASK_THE_TUTOR_TOOL: &str = "ask_the_tutor";

/// Tutor server, shared by the callable route and the MCP handler.
#[derive(Clone)]
pub struct TutorServer {
    handler: Arc<TutorHandler>,
}

impl TutorServer {
    /// Create a new TutorServer with the given configuration.
    ///
    /// # Errors
    /// Fails when `GEMINI_KEY` is not configured.
    pub fn new(config: Config) -> Result<Self, Error> {
        Ok(Self::with_handler(TutorHandler::new(config)?))
    }

    /// Wrap an existing handler.
    pub fn with_handler(handler: TutorHandler) -> Self {
        Self {
            handler: Arc::new(handler),
        }
    }

    /// Answer a question, with errors already mapped for the caller.
    pub async fn ask(&self, request: TutorRequest) -> Result<TutorResponse, CallableError> {
        self.handler
            .ask(request)
            .await
            .map_err(|e| CallableError::from_error(&e, INTERNAL_ERROR_MESSAGE))
    }

    /// Router serving `POST /askTheTutor`.
    pub fn callable_routes(&self) -> Router {
        Router::new()
            .route(ASK_THE_TUTOR_PATH, post(ask_the_tutor))
            .with_state(self.clone())
    }

    /// The MCP tools this server offers.
    pub fn tools() -> Vec<Tool> {
        use schemars::schema_for;

        let schema = schema_for!(TutorRequest);
        let input_schema = match serde_json::to_value(&schema).unwrap_or_default() {
            serde_json::Value::Object(map) => Arc::new(map),
            _ => Arc::new(serde_json::Map::new()),
        };

        vec![Tool {
            name: Cow::Borrowed(ASK_THE_TUTOR_TOOL),
            description: Some(Cow::Borrowed(
                "Answer a young child's question using only the supplied lesson context. \
                 Requires lessonContext and userQuestion. Returns a short, friendly answer.",
            )),
            input_schema,
            annotations: None,
            icons: None,
            meta: None,
            output_schema: None,
            title: None,
        }]
    }

    async fn ask_tool(&self, request: TutorRequest) -> Result<CallToolResult, McpError> {
        info!("Answering tutor question over MCP");

        let response = self.ask(request).await.map_err(CallableError::into_mcp_error)?;
        Ok(CallToolResult::success(vec![Content::text(response.answer)]))
    }
}

/// `POST /askTheTutor`
#[instrument(name = "askTheTutor", skip_all, fields(invocation_id = %Uuid::new_v4()))]
async fn ask_the_tutor(
    State(server): State<TutorServer>,
    body: Bytes,
) -> Result<CallableResponse<TutorResponse>, CallableError> {
    let request: TutorRequest = decode_data(&body, MISSING_FIELDS_MESSAGE)?;
    let response = server.ask(request).await?;
    Ok(CallableResponse::new(response))
}

impl ServerHandler for TutorServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(
                "Lesson tutor for a 6-year-old child backed by Google Gemini. \
                 Use ask_the_tutor with the lesson text and the child's question."
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
                ASK_THE_TUTOR_TOOL => {
                    let request: TutorRequest = params
                        .arguments
                        .map(|args| serde_json::from_value(serde_json::Value::Object(args)))
                        .transpose()
                        .map_err(|_| McpError::invalid_params(MISSING_FIELDS_MESSAGE, None))?
                        .unwrap_or_default();

                    self.ask_tool(request).await
                }
                _ => Err(McpError::invalid_params(
                    format!("Unknown tool: {}", params.name),
                    None,
                )),
            }
        }
    }
}
