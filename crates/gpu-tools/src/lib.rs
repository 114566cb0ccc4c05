//! Novita GPU-instance API exposed as MCP tools.
//!
//! - [`config`]: the declarative catalog DSL (tool = method + path + params)
//! - [`catalog`]: the built-in catalog covering clusters, products, instances, templates,
//!   registry auths and network storage
//! - [`dispatcher`]: authenticated request dispatch
//! - [`runtime`]: argument handling and tool execution
//! - [`sanitize`]: credential removal from instance listings

pub mod catalog;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod runtime;
pub mod safety;
pub mod sanitize;
mod schema;
pub mod semantics;

pub use catalog::builtin_catalog;
pub use config::ToolCatalogConfig;
pub use dispatcher::{ApiKey, DEFAULT_BASE_URL, Dispatcher};
pub use error::{Result, ToolsError};
pub use runtime::ToolSource;
