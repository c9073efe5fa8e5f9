//! Transport configuration for the function servers.
//!
//! Two transport modes are supported:
//!
//! - **HTTP** (default): callable function routes plus the MCP streamable
//!   HTTP endpoint at `/mcp`, on one port
//! - **Stdio**: MCP over stdin/stdout for local agent tooling
//!
//! # Example
//!
//! ```ignore
//! use lesson_helper_common::transport::TransportArgs;
//! use clap::Parser;
//!
//! #[derive(Parser)]
//! struct Args {
//!     #[command(flatten)]
//!     transport: TransportArgs,
//! }
//!
//! let args = Args::parse();
//! let transport = args.transport.into_transport();
//! ```

use clap::Args;
use std::fmt;

/// Default HTTP port (Cloud Run / Functions convention).
pub const DEFAULT_PORT: u16 = 8080;

/// Transport mode for serving a function.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    /// HTTP transport: callable routes and MCP on one port.
    Http {
        /// Port to listen on
        port: u16,
    },
    /// Standard input/output transport, MCP only.
    Stdio,
}

impl Default for Transport {
    fn default() -> Self {
        Transport::Http { port: DEFAULT_PORT }
    }
}

impl Transport {
    /// Create a new stdio transport.
    pub fn stdio() -> Self {
        Transport::Stdio
    }

    /// Create a new HTTP transport on the specified port.
    pub fn http(port: u16) -> Self {
        Transport::Http { port }
    }

    /// Check if this is a stdio transport.
    pub fn is_stdio(&self) -> bool {
        matches!(self, Transport::Stdio)
    }

    /// Check if this is an HTTP transport.
    pub fn is_http(&self) -> bool {
        matches!(self, Transport::Http { .. })
    }

    /// Get the port if this is a network transport.
    pub fn port(&self) -> Option<u16> {
        match self {
            Transport::Stdio => None,
            Transport::Http { port } => Some(*port),
        }
    }
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Transport::Stdio => write!(f, "stdio"),
            Transport::Http { port } => write!(f, "http (port {})", port),
        }
    }
}

/// Command-line arguments for transport configuration.
#[derive(Args, Debug, Clone)]
pub struct TransportArgs {
    /// Transport mode: http or stdio
    #[arg(long, default_value = "http", value_parser = parse_transport_mode)]
    pub transport: TransportMode,

    /// Port for HTTP transport (default: 8080, or from PORT env var)
    #[arg(long, env = "PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,
}

/// Transport mode parsed from command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransportMode {
    #[default]
    Http,
    Stdio,
}

pub(crate) fn parse_transport_mode(s: &str) -> Result<TransportMode, String> {
    match s.to_lowercase().as_str() {
        "http" => Ok(TransportMode::Http),
        "stdio" => Ok(TransportMode::Stdio),
        _ => Err(format!(
            "Invalid transport mode '{}'. Valid options: http, stdio",
            s
        )),
    }
}

impl TransportArgs {
    /// Convert command-line arguments into a Transport configuration.
    pub fn into_transport(self) -> Transport {
        match self.transport {
            TransportMode::Http => Transport::Http { port: self.port },
            TransportMode::Stdio => Transport::Stdio,
        }
    }
}

impl Default for TransportArgs {
    fn default() -> Self {
        Self {
            transport: TransportMode::Http,
            port: DEFAULT_PORT,
        }
    }
}
