//! The built-in Novita GPU-instance tool catalog.

use crate::config::ToolCatalogConfig;
use crate::error::Result;

/// Catalog document compiled into the binary.
pub const CATALOG_YAML: &str = include_str!("../catalog/novita.yaml");

/// Parse the built-in catalog.
///
/// # Errors
///
/// Returns an error only if the embedded document is malformed.
pub fn builtin_catalog() -> Result<ToolCatalogConfig> {
    ToolCatalogConfig::from_yaml_str(CATALOG_YAML)
}
