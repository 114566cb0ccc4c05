//! rmcp `ServerHandler` backed by the tool runtime.

use novita_gpu_tools::{ToolSource, ToolsError};
use rmcp::model::{
    CallToolRequestParams, CallToolResult, Content, ErrorData, Implementation, ListToolsResult,
    PaginatedRequestParams, ServerCapabilities, ServerInfo,
};
use rmcp::service::RequestContext;
use rmcp::{RoleServer, ServerHandler};
use serde_json::{Value, json};
use tracing::{info, warn};

pub const SERVER_NAME: &str = "novita-mcp-server";

const INSTRUCTIONS: &str = "Manage Novita AI GPU cloud resources.\n\n\
    Tools:\n\
    - clusters and products: list-clusters, list-products\n\
    - GPU instances: list/get/create/start/stop/delete/restart-gpu-instance\n\
    - templates: list-templates, get-template, create-template, delete-template\n\
    - container registry auths: list/create/delete-container-registry-auth\n\
    - network storage: create/list/update/delete-network-storage\n\n\
    Results are JSON text. Instance passwords are never returned.";

#[derive(Clone, Debug)]
pub struct NovitaMcpServer {
    tools: ToolSource,
}

impl NovitaMcpServer {
    #[must_use]
    pub fn new(tools: ToolSource) -> Self {
        Self { tools }
    }
}

impl ServerHandler for NovitaMcpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: SERVER_NAME.to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                ..Default::default()
            },
            instructions: Some(INSTRUCTIONS.to_string()),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParams>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, ErrorData> {
        Ok(ListToolsResult {
            tools: self.tools.list_tools(),
            meta: Default::default(),
            next_cursor: None,
        })
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParams,
        _context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, ErrorData> {
        let arguments = request.arguments.map_or(Value::Null, Value::Object);
        match self.tools.call_tool(&request.name, arguments).await {
            Ok(result) => Ok(result),
            Err(e) => map_tool_error(&request.name, e),
        }
    }
}

/// Map a runtime failure onto the MCP surface.
///
/// Upstream failures become failed tool results so the model sees the message; argument and
/// lookup problems are protocol errors.
fn map_tool_error(tool: &str, err: ToolsError) -> Result<CallToolResult, ErrorData> {
    match err {
        e if e.is_execution_error() => {
            info!(tool, error = %e, "tool call failed");
            Ok(CallToolResult::error(vec![Content::text(e.to_string())]))
        }
        ToolsError::Validation {
            message,
            violations,
        } => {
            warn!(tool, %message, "rejected tool arguments");
            Err(ErrorData::invalid_params(
                message,
                Some(json!({
                    "type": "validation-errors",
                    "violations": violations,
                })),
            ))
        }
        ToolsError::UnknownTool(name) => Err(ErrorData::invalid_params(
            format!("Unknown tool: {name}"),
            None,
        )),
        other => Err(ErrorData::internal_error(other.to_string(), None)),
    }
}
