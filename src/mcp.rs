//! MCP server exposing the clock tool over streamable HTTP.
//!
//! Clients connect at [`MCP_PATH`]. Every session gets its own
//! [`ClockServer`]; all of them read the same [`Clock`].
//!
//! Cancelling the token starts a graceful shutdown. Open event streams get
//! the drain timeout to finish before the server is dropped.

use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use rmcp::handler::server::tool::ToolRouter;
use rmcp::model::{CallToolResult, Content, Implementation, ServerCapabilities, ServerInfo};
use rmcp::transport::streamable_http_server::session::local::LocalSessionManager;
use rmcp::transport::streamable_http_server::StreamableHttpService;
use rmcp::{tool, tool_handler, tool_router, ErrorData as McpError, ServerHandler};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::agent::tools::{format_timestamp, Clock};
use crate::error::ServeError;

/// Name reported in the MCP handshake.
pub const SERVER_NAME: &str = "Telling current time";

/// Route the streamable HTTP transport is mounted on.
pub const MCP_PATH: &str = "/mcp";

#[derive(Clone)]
pub struct ClockServer {
    clock: Clock,
    tool_router: ToolRouter<Self>,
}

#[tool_router]
impl ClockServer {
    pub fn new(clock: Clock) -> Self {
        Self {
            clock,
            tool_router: Self::tool_router(),
        }
    }

    #[tool(description = "Get the current time in UTC")]
    async fn time_now(&self) -> Result<CallToolResult, McpError> {
        let now = format_timestamp((self.clock)());
        tracing::debug!(%now, "Served time_now");
        Ok(CallToolResult::success(vec![Content::text(now)]))
    }
}

#[tool_handler]
impl ServerHandler for ClockServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: SERVER_NAME.to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                ..Implementation::from_build_env()
            },
            instructions: Some("Call time_now to read the current time in UTC.".to_string()),
            ..Default::default()
        }
    }
}

/// A bound, not yet serving, MCP endpoint.
pub struct McpServer {
    listener: TcpListener,
    local_addr: SocketAddr,
    clock: Clock,
}

impl McpServer {
    /// Bind `addr`. Port `0` picks a free port.
    pub async fn bind(addr: SocketAddr) -> Result<Self, ServeError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ServeError::Bind {
                addr: addr.to_string(),
                source,
            })?;
        let local_addr = listener.local_addr()?;
        Ok(Self {
            listener,
            local_addr,
            clock: Arc::new(Utc::now),
        })
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Serve until `cancel` fires, then allow `drain` for open streams.
    pub async fn run(self, cancel: CancellationToken, drain: Duration) -> Result<(), ServeError> {
        let clock = self.clock;
        let service = StreamableHttpService::new(
            move || Ok(ClockServer::new(clock.clone())),
            LocalSessionManager::default().into(),
            Default::default(),
        );
        let app = axum::Router::new().nest_service(MCP_PATH, service);

        tracing::info!(addr = %self.local_addr, path = MCP_PATH, "Starting MCP server");

        let graceful = cancel.clone();
        let server = axum::serve(self.listener, app)
            .with_graceful_shutdown(async move { graceful.cancelled().await })
            .into_future();

        tokio::select! {
            result = server => result?,
            _ = async {
                cancel.cancelled().await;
                tokio::time::sleep(drain).await;
            } => {
                tracing::warn!(
                    timeout_secs = drain.as_secs(),
                    "MCP server did not drain in time, stopping"
                );
            }
        }

        tracing::info!("MCP server stopped");
        Ok(())
    }
}
