//! Command line and environment configuration.

use crate::error::{Result, ServerError};
use clap::{Parser, ValueEnum};
use novita_gpu_tools::{ApiKey, DEFAULT_BASE_URL, ToolCatalogConfig, builtin_catalog};
use std::path::PathBuf;
use std::time::Duration;

pub const API_KEY_ENV: &str = "NOVITA_API_KEY";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// MCP server for the Novita GPU-instance API (stdio transport).
#[derive(Parser, Debug, Clone)]
#[command(name = "novita-mcp-server", version, about)]
pub struct Cli {
    /// API key used as bearer token for every request.
    #[arg(long, env = API_KEY_ENV, hide_env_values = true)]
    pub api_key: Option<String>,

    /// Base URL of the GPU-instance API.
    #[arg(long, env = "NOVITA_API_BASE_URL", default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    /// Per-request timeout in seconds. No timeout when unset.
    #[arg(long, env = "NOVITA_REQUEST_TIMEOUT_SECS")]
    pub request_timeout_secs: Option<u64>,

    /// Catalog YAML replacing the built-in tool catalog.
    #[arg(long, env = "NOVITA_MCP_CATALOG")]
    pub catalog: Option<PathBuf>,

    /// Log filter (`info`, `debug`, `novita_gpu_tools=trace`, ...).
    #[arg(long, env = "NOVITA_MCP_LOG", default_value = "info")]
    pub log_level: String,

    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

impl Cli {
    /// The configured credential.
    ///
    /// # Errors
    ///
    /// Returns a config error if the key is missing or blank.
    pub fn api_key(&self) -> Result<ApiKey> {
        self.api_key
            .as_deref()
            .and_then(|k| ApiKey::new(k).ok())
            .ok_or_else(|| {
                ServerError::Config(format!("{API_KEY_ENV} environment variable is required"))
            })
    }

    #[must_use]
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs
            .filter(|s| *s > 0)
            .map(Duration::from_secs)
    }

    /// Load the catalog file if one is configured, the built-in catalog otherwise.
    ///
    /// # Errors
    ///
    /// Returns an error if the catalog cannot be read or parsed.
    pub fn load_catalog(&self) -> Result<ToolCatalogConfig> {
        match &self.catalog {
            Some(path) => Ok(ToolCatalogConfig::from_yaml_file(path)?),
            None => Ok(builtin_catalog()?),
        }
    }
}
