//! HTTP semantics helpers.
//!
//! Generates MCP `ToolAnnotations` for catalog tools from RFC 9110-style method semantics. The
//! provider exposes most state changes as `POST`, so a catalog entry can additionally flag itself
//! destructive (stop/delete/restart style endpoints).

use reqwest::Method;
use rmcp::model::ToolAnnotations;

/// Generate MCP tool annotations based on HTTP method semantics.
///
/// `openWorldHint` is always `true`: every tool talks to the provider API. Methods outside the
/// catalog's vocabulary get no hints beyond that.
#[must_use]
pub fn annotations_for_method(method: &Method) -> ToolAnnotations {
    // (read_only, destructive, idempotent)
    let (read_only, destructive, idempotent) = match *method {
        Method::GET | Method::HEAD => (Some(true), Some(false), Some(true)),
        Method::POST => (Some(false), Some(false), Some(false)),
        // Partial updates may or may not repeat cleanly.
        Method::PATCH => (Some(false), Some(true), None),
        Method::DELETE => (Some(false), Some(true), Some(true)),
        _ => (None, None, None),
    };

    ToolAnnotations {
        title: None,
        read_only_hint: read_only,
        destructive_hint: destructive,
        idempotent_hint: idempotent,
        open_world_hint: Some(true),
    }
}

/// Annotations for a catalog tool: method semantics, optionally forced destructive.
#[must_use]
pub fn annotations_for_tool(method: &Method, destructive: bool) -> ToolAnnotations {
    let mut annotations = annotations_for_method(method);
    if destructive {
        annotations.read_only_hint = Some(false);
        annotations.destructive_hint = Some(true);
    }
    annotations
}
