//! Declarative tool catalog DSL.
//!
//! A catalog is an ordered list of tools. Each tool binds one HTTP endpoint (method + path below the
//! API base URL) to a set of parameters with a JSON Schema shape and a location (`query` or `body`).

use crate::error::{Result, ToolsError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;

/// Top-level catalog document.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolCatalogConfig {
    /// Tools in the order they are advertised.
    #[serde(default)]
    pub tools: Vec<ToolConfig>,
}

impl ToolCatalogConfig {
    /// Parse a catalog from a YAML document.
    ///
    /// # Errors
    ///
    /// Returns an error if the document is not valid YAML or does not match the catalog shape.
    pub fn from_yaml_str(doc: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(doc)?)
    }

    /// Read and parse a catalog file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_yaml_file(path: &Path) -> Result<Self> {
        let doc = std::fs::read_to_string(path).map_err(|e| {
            ToolsError::Config(format!("failed to read catalog '{}': {e}", path.display()))
        })?;
        Self::from_yaml_str(&doc)
    }

    #[must_use]
    pub fn tool(&self, name: &str) -> Option<&ToolConfig> {
        self.tools.iter().find(|t| t.name == name)
    }
}

/// A single tool bound to one provider endpoint.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolConfig {
    /// Tool name exposed over MCP (kebab-case).
    pub name: String,

    /// HTTP method (`GET`, `POST`, `PATCH`, `DELETE`).
    pub method: String,

    /// Path below the API base URL, e.g. `/gpu/instances`.
    pub path: String,

    #[serde(default)]
    pub description: Option<String>,

    /// Parameters in the order they are emitted into the query string.
    #[serde(default)]
    pub params: Vec<ParamConfig>,

    /// Strip instance credentials from the response before returning it.
    #[serde(default)]
    pub sanitize: bool,

    /// Advertise the tool as destructive even when the method alone would not.
    #[serde(default)]
    pub destructive: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParamConfig {
    pub name: String,

    #[serde(rename = "in")]
    pub location: ParamLocation,

    #[serde(default)]
    pub required: bool,

    /// Value used when the caller omits the parameter. Also advertised in the input schema.
    #[serde(default)]
    pub default: Option<Value>,

    #[serde(default)]
    pub description: Option<String>,

    /// JSON Schema for the value. Defaults to `{"type": "string"}`.
    #[serde(default)]
    pub schema: Option<Value>,
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ParamLocation {
    Query,
    Body,
}
