//! Novita GPU-instance MCP server.
//!
//! Serves the tool catalog from `novita-gpu-tools` over the MCP stdio transport.

pub mod cli;
pub mod error;
pub mod handler;
pub mod logging;

use crate::cli::Cli;
use crate::error::{Result, ServerError};
use crate::handler::NovitaMcpServer;
use novita_gpu_tools::{Dispatcher, ToolSource};
use rmcp::ServiceExt as _;
use rmcp::transport::stdio;
use tracing::info;

/// Build the runtime from `cli` and serve MCP over stdio until the client disconnects.
///
/// Logging must already be initialized.
///
/// # Errors
///
/// Returns an error if the configuration is invalid or the transport fails.
pub async fn run(cli: Cli) -> Result<()> {
    let api_key = cli.api_key()?;
    let catalog = cli.load_catalog()?;
    let dispatcher = Dispatcher::new(cli.base_url.as_str(), api_key, cli.request_timeout())?;
    let tools = ToolSource::new(&catalog, dispatcher)?;

    info!(
        tools = tools.tool_names().len(),
        base_url = %cli.base_url,
        "starting MCP server on stdio"
    );

    let service = NovitaMcpServer::new(tools)
        .serve(stdio())
        .await
        .map_err(|e| ServerError::Startup(format!("failed to start MCP service: {e}")))?;

    service
        .waiting()
        .await
        .map_err(|e| ServerError::Runtime(e.to_string()))?;

    info!("MCP client disconnected; shutting down");
    Ok(())
}
