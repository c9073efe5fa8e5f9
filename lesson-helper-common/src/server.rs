//! Server builder for the function binaries.
//!
//! One builder serves a function over either transport:
//!
//! - HTTP: the callable routes supplied with [`FunctionServerBuilder::with_routes`],
//!   the MCP streamable HTTP endpoint at `/mcp`, CORS for all origins, and
//!   (when configured) the shared-secret guard in front of all of them
//! - stdio: the MCP handler only, refused when a shared secret is configured
//!
//! # Example
//!
//! ```ignore
//! use lesson_helper_common::server::FunctionServerBuilder;
//! use lesson_helper_common::transport::Transport;
//!
//! let server = TutorServer::new(config)?;
//! FunctionServerBuilder::new(server.clone())
//!     .with_routes(server.callable_routes())
//!     .with_transport(Transport::http(8080))
//!     .run()
//!     .await?;
//! ```

use crate::secret::{SharedSecret, require_shared_secret};
use crate::transport::Transport;
use axum::Router;
use axum::middleware::from_fn_with_state;
use rmcp::{ServerHandler, ServiceExt};
use thiserror::Error;
use tokio::sync::oneshot;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Errors that can occur when running a function server.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Failed to bind to the specified port
    #[error("Failed to bind to port {port}: {message}")]
    BindFailed { port: u16, message: String },

    /// Transport error during communication
    #[error("Transport error: {0}")]
    Transport(String),

    /// A shared secret was configured for a transport that carries no headers
    #[error("Shared secret cannot be enforced over {0}")]
    UnguardedTransport(Transport),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Builder for configuring and running a function server.
pub struct FunctionServerBuilder<H> {
    handler: H,
    routes: Router,
    transport: Transport,
    shared_secret: Option<SharedSecret>,
    shutdown_rx: Option<oneshot::Receiver<()>>,
}

impl<H> FunctionServerBuilder<H>
where
    H: ServerHandler + Clone + Send + Sync + 'static,
{
    /// Create a new server builder with the given MCP handler.
    pub fn new(handler: H) -> Self {
        Self {
            handler,
            routes: Router::new(),
            transport: Transport::default(),
            shared_secret: None,
            shutdown_rx: None,
        }
    }

    /// Add callable function routes (HTTP transport only).
    pub fn with_routes(mut self, routes: Router) -> Self {
        self.routes = self.routes.merge(routes);
        self
    }

    /// Require callers to present this shared secret (HTTP transport only).
    pub fn with_shared_secret(mut self, secret: Option<SharedSecret>) -> Self {
        self.shared_secret = secret;
        self
    }

    /// Set the transport mode for the server.
    pub fn with_transport(mut self, transport: Transport) -> Self {
        self.transport = transport;
        self
    }

    /// Set a shutdown signal receiver for graceful shutdown.
    ///
    /// When the sender is dropped or a message is sent, the server
    /// will initiate graceful shutdown.
    pub fn with_shutdown(mut self, shutdown_rx: oneshot::Receiver<()>) -> Self {
        self.shutdown_rx = Some(shutdown_rx);
        self
    }

    /// Build the HTTP router: callable routes, `/mcp`, guard and CORS.
    ///
    /// CORS is the outermost layer so preflight requests never reach the
    /// shared-secret guard.
    pub fn http_router(&self) -> Router {
        use rmcp::transport::streamable_http_server::{
            StreamableHttpService, session::local::LocalSessionManager,
        };

        let handler = self.handler.clone();
        let mcp_service = StreamableHttpService::new(
            move || Ok(handler.clone()),
            LocalSessionManager::default().into(),
            Default::default(),
        );

        let mut router = self.routes.clone().nest_service("/mcp", mcp_service);

        if let Some(secret) = &self.shared_secret {
            router = router.layer(from_fn_with_state(secret.clone(), require_shared_secret));
        }

        router
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive())
    }

    /// Run the server with the configured transport.
    ///
    /// This method blocks until the server is shut down (via signal or shutdown channel).
    ///
    /// # Errors
    /// Returns [`ServerError::UnguardedTransport`] without serving anything when
    /// a shared secret is combined with the stdio transport.
    pub async fn run(self) -> Result<(), ServerError> {
        tracing::info!(transport = %self.transport, "Starting function server");

        if self.shared_secret.is_some() && self.transport.is_stdio() {
            tracing::error!("Refusing to serve over stdio while SHARED_SECRET is set");
            return Err(ServerError::UnguardedTransport(self.transport));
        }

        match self.transport {
            Transport::Stdio => self.run_stdio().await,
            Transport::Http { port } => self.run_http(port).await,
        }
    }

    /// Run the MCP handler over stdio.
    async fn run_stdio(self) -> Result<(), ServerError> {
        use rmcp::transport::io::stdio;

        let shutdown_future = async {
            if let Some(rx) = self.shutdown_rx {
                let _ = rx.await;
            } else {
                wait_for_shutdown_signal().await;
            }
        };

        let service = self
            .handler
            .serve(stdio())
            .await
            .map_err(|e| ServerError::Transport(e.to_string()))?;

        tokio::select! {
            result = service.waiting() => {
                result.map_err(|e| ServerError::Transport(e.to_string()))?;
                Ok(())
            }
            _ = shutdown_future => {
                tracing::info!("Received shutdown signal, stopping server");
                Ok(())
            }
        }
    }

    /// Serve callable routes and MCP over HTTP.
    async fn run_http(self, port: u16) -> Result<(), ServerError> {
        let router = self.http_router();

        let bind_addr = format!("0.0.0.0:{}", port);
        let tcp_listener = tokio::net::TcpListener::bind(&bind_addr)
            .await
            .map_err(|e| ServerError::BindFailed {
                port,
                message: e.to_string(),
            })?;

        tracing::info!(
            port,
            shared_secret = self.shared_secret.is_some(),
            "HTTP server listening"
        );

        let shutdown_future = async {
            if let Some(rx) = self.shutdown_rx {
                let _ = rx.await;
            } else {
                wait_for_shutdown_signal().await;
            }
        };

        axum::serve(tcp_listener, router)
            .with_graceful_shutdown(shutdown_future)
            .await
            .map_err(|e| ServerError::Transport(e.to_string()))?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Wait for a shutdown signal (SIGTERM or SIGINT).
async fn wait_for_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut sigterm =
            signal(SignalKind::terminate()).expect("Failed to register SIGTERM handler");
        let mut sigint =
            signal(SignalKind::interrupt()).expect("Failed to register SIGINT handler");

        tokio::select! {
            _ = sigterm.recv() => {
                tracing::info!("Received SIGTERM");
            }
            _ = sigint.recv() => {
                tracing::info!("Received SIGINT");
            }
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to register Ctrl+C handler");
        tracing::info!("Received Ctrl+C");
    }
}

/// Convenience function to set up graceful shutdown handling.
///
/// Returns a sender that can be used to trigger shutdown programmatically,
/// and a receiver to pass to the server builder.
pub fn shutdown_channel() -> (oneshot::Sender<()>, oneshot::Receiver<()>) {
    oneshot::channel()
}
