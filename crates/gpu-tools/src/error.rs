//! Error types for `novita-gpu-tools`.

use crate::safety::sanitize_reqwest_error;
use serde_json::Value;
use thiserror::Error;

/// Main error type for catalog loading and tool execution.
#[derive(Error, Debug)]
pub enum ToolsError {
    /// Configuration errors (invalid catalog, invalid base URL, duplicate tool names).
    #[error("Configuration error: {0}")]
    Config(String),

    /// Arguments rejected before dispatch.
    ///
    /// `violations` is a JSON array describing each problem (unknown parameter, missing required
    /// parameter, constraint violation).
    #[error("{message}")]
    Validation { message: String, violations: Value },

    /// The requested tool is not part of the catalog.
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    /// Upstream answered with a non-success status.
    #[error("Novita AI API Error: {status} - {body}")]
    Remote { status: u16, body: String },

    /// The request could not be completed (DNS, connect, timeout, body read).
    #[error("Transport error: {0}")]
    Transport(String),

    /// The API declared a JSON response but the body could not be decoded.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Catalog document parsing errors.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl From<reqwest::Error> for ToolsError {
    fn from(value: reqwest::Error) -> Self {
        Self::Transport(sanitize_reqwest_error(&value))
    }
}

impl ToolsError {
    /// Whether the error happened after the request left the process.
    ///
    /// These are reported to MCP clients as failed tool results rather than protocol errors.
    #[must_use]
    pub fn is_execution_error(&self) -> bool {
        matches!(
            self,
            Self::Remote { .. } | Self::Transport(_) | Self::InvalidResponse(_)
        )
    }
}

/// Result type alias for tool operations.
pub type Result<T> = std::result::Result<T, ToolsError>;
