//! Error types for `novita-mcp-server`.

use novita_gpu_tools::ToolsError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServerError {
    /// Missing or invalid startup configuration.
    #[error("{0}")]
    Config(String),

    /// Catalog or dispatcher construction failed.
    #[error(transparent)]
    Tools(#[from] ToolsError),

    /// Logging or transport could not be initialized.
    #[error("Startup error: {0}")]
    Startup(String),

    /// The MCP service loop ended with an error.
    #[error("Runtime error: {0}")]
    Runtime(String),
}

pub type Result<T> = std::result::Result<T, ServerError>;
