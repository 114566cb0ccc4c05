//! Runtime for executing catalog tools against the provider API.
//!
//! A [`ToolSource`] is built once from a [`ToolCatalogConfig`] and a [`Dispatcher`]. Each call
//! normalizes and validates the arguments, splits them into query string and JSON body, dispatches
//! one request and renders the (optionally sanitized) response as pretty-printed JSON text.

use crate::config::{ParamLocation, ToolCatalogConfig, ToolConfig};
use crate::dispatcher::Dispatcher;
use crate::error::{Result, ToolsError};
use crate::schema::{ArgumentValidator, advertised_schema, build_input_schema, normalize_in_place};
use reqwest::Method;
use rmcp::model::{CallToolResult, Content, JsonObject, Tool};
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info};

struct GeneratedTool {
    name: String,
    description: Option<String>,
    method: Method,
    path: String,
    parameters: Vec<ToolParameter>,
    /// Schema with internal keywords, used for normalization.
    input_schema: Value,
    /// Schema advertised to clients.
    advertised_schema: Arc<JsonObject>,
    validator: ArgumentValidator,
    sanitize: bool,
    destructive: bool,
}

#[derive(Debug, Clone)]
struct ToolParameter {
    name: String,
    location: ParamLocation,
}

#[derive(Debug, Default)]
struct RequestParts {
    path: String,
    body: Option<Value>,
}

/// The executable tool table.
#[derive(Clone)]
pub struct ToolSource {
    inner: Arc<ToolSourceInner>,
}

struct ToolSourceInner {
    tools: Vec<GeneratedTool>,
    dispatcher: Dispatcher,
}

impl std::fmt::Debug for ToolSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolSource")
            .field("tools", &self.inner.tools.len())
            .field("dispatcher", &self.inner.dispatcher)
            .finish()
    }
}

impl ToolSource {
    /// Build a tool source from a catalog.
    ///
    /// The resulting instance is immutable and safe to share across tasks.
    ///
    /// # Errors
    ///
    /// Returns an error if the catalog is invalid (duplicate tool names, duplicate parameter
    /// names, invalid HTTP method, path not starting with `/`, or a schema that does not compile).
    pub fn new(catalog: &ToolCatalogConfig, dispatcher: Dispatcher) -> Result<Self> {
        let tools = generate_tools(catalog)?;
        Ok(Self {
            inner: Arc::new(ToolSourceInner { tools, dispatcher }),
        })
    }

    /// Names of all tools, in catalog order.
    #[must_use]
    pub fn tool_names(&self) -> Vec<&str> {
        self.inner.tools.iter().map(|t| t.name.as_str()).collect()
    }

    /// List the MCP `Tool`s exposed by this source.
    #[must_use]
    pub fn list_tools(&self) -> Vec<Tool> {
        self.inner
            .tools
            .iter()
            .map(|t| {
                let mut tool = Tool::new(
                    t.name.clone(),
                    t.description.clone().unwrap_or_default(),
                    t.advertised_schema.clone(),
                );
                tool.annotations = Some(crate::semantics::annotations_for_tool(
                    &t.method,
                    t.destructive,
                ));
                tool
            })
            .collect()
    }

    /// Execute a tool call.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - the tool name is unknown
    /// - the arguments fail validation (nothing is sent upstream)
    /// - the request fails (transport, non-2xx response, undecodable body)
    pub async fn call_tool(&self, tool_name: &str, arguments: Value) -> Result<CallToolResult> {
        let tool = self
            .inner
            .tools
            .iter()
            .find(|t| t.name == tool_name)
            .ok_or_else(|| ToolsError::UnknownTool(tool_name.to_string()))?;

        let mut args = match arguments {
            Value::Null => Value::Object(Map::new()),
            other => other,
        };
        normalize_in_place(&tool.input_schema, &mut args);
        tool.validator.validate(&args)?;

        let parts = build_request_parts(tool, &args);
        debug!(tool = %tool.name, path = %parts.path, "calling tool");

        let mut payload = self
            .inner
            .dispatcher
            .dispatch(&parts.path, tool.method.clone(), parts.body.as_ref())
            .await?;

        if tool.sanitize {
            crate::sanitize::sanitize(Some(&mut payload));
        }

        info!(tool = %tool.name, "tool call succeeded");

        let text = serde_json::to_string_pretty(&payload).unwrap_or_else(|_| payload.to_string());
        Ok(CallToolResult::success(vec![Content::text(text)]))
    }
}

fn generate_tools(catalog: &ToolCatalogConfig) -> Result<Vec<GeneratedTool>> {
    let mut out = Vec::with_capacity(catalog.tools.len());
    let mut names: HashSet<&str> = HashSet::new();

    for tool_cfg in &catalog.tools {
        let tool_name = tool_cfg.name.as_str();
        if tool_name.trim().is_empty() {
            return Err(ToolsError::Config("Tool name must not be empty".to_string()));
        }
        if !names.insert(tool_name) {
            return Err(ToolsError::Config(format!(
                "Duplicate tool name '{tool_name}' in catalog"
            )));
        }

        let method = parse_http_method(tool_name, &tool_cfg.method)?;
        if !tool_cfg.path.starts_with('/') {
            return Err(ToolsError::Config(format!(
                "Path '{}' of tool '{tool_name}' must start with '/'",
                tool_cfg.path
            )));
        }

        let parameters = collect_tool_parameters(tool_cfg)?;
        let input_schema = build_input_schema(&tool_cfg.params);
        let advertised = advertised_schema(&input_schema);
        let validator = ArgumentValidator::new(tool_name, &advertised)?;
        let advertised_schema = Arc::new(advertised.as_object().cloned().unwrap_or_default());

        out.push(GeneratedTool {
            name: tool_cfg.name.clone(),
            description: tool_cfg.description.clone(),
            method,
            path: tool_cfg.path.clone(),
            parameters,
            input_schema,
            advertised_schema,
            validator,
            sanitize: tool_cfg.sanitize,
            destructive: tool_cfg.destructive,
        });
    }

    Ok(out)
}

fn parse_http_method(tool_name: &str, method: &str) -> Result<Method> {
    let method_str = method.trim();
    method_str.to_uppercase().parse().map_err(|_| {
        ToolsError::Config(format!(
            "Invalid HTTP method '{method_str}' in tool '{tool_name}'"
        ))
    })
}

fn collect_tool_parameters(tool_cfg: &ToolConfig) -> Result<Vec<ToolParameter>> {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut out = Vec::with_capacity(tool_cfg.params.len());
    for p in &tool_cfg.params {
        if !seen.insert(p.name.as_str()) {
            return Err(ToolsError::Config(format!(
                "Duplicate parameter '{}' in tool '{}'",
                p.name, tool_cfg.name
            )));
        }
        out.push(ToolParameter {
            name: p.name.clone(),
            location: p.location,
        });
    }
    Ok(out)
}

/// Split normalized arguments into the request path (with query string) and JSON body.
///
/// Query params are emitted in declaration order; empty values (empty string, empty array) are
/// omitted. A body is produced only when the tool declares body params.
fn build_request_parts(tool: &GeneratedTool, args: &Value) -> RequestParts {
    let mut query: Vec<String> = Vec::new();
    let mut body = Map::new();
    let mut has_body_params = false;

    for p in &tool.parameters {
        let value = args.get(&p.name);
        match p.location {
            ParamLocation::Query => {
                let Some(value) = value else { continue };
                if query_value_is_empty(value) {
                    continue;
                }
                query.push(format!(
                    "{}={}",
                    encode_query_component(&p.name),
                    encode_query_component(&query_value_to_string(value))
                ));
            }
            ParamLocation::Body => {
                has_body_params = true;
                if let Some(value) = value {
                    body.insert(p.name.clone(), value.clone());
                }
            }
        }
    }

    let mut path = tool.path.clone();
    if !query.is_empty() {
        path.push('?');
        path.push_str(&query.join("&"));
    }

    RequestParts {
        path,
        body: has_body_params.then_some(Value::Object(body)),
    }
}

fn query_value_is_empty(value: &Value) -> bool {
    match value {
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Null => true,
        _ => false,
    }
}

fn query_value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(query_value_to_string)
            .collect::<Vec<_>>()
            .join(","),
        other => other.to_string(),
    }
}

fn encode_query_component(s: &str) -> String {
    const HEX: &[u8; 16] = b"0123456789ABCDEF";
    let mut out = String::with_capacity(s.len());
    for &b in s.as_bytes() {
        if matches!(b, b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~') {
            out.push(b as char);
        } else {
            out.push('%');
            out.push(HEX[(b >> 4) as usize] as char);
            out.push(HEX[(b & 0x0F) as usize] as char);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatcher::ApiKey;
    use novita_test_support::{MockResponse, MockUpstream};
    use serde_json::json;

    fn catalog(doc: &str) -> ToolCatalogConfig {
        ToolCatalogConfig::from_yaml_str(doc).expect("catalog")
    }

    fn source(base_url: &str) -> ToolSource {
        let dispatcher = Dispatcher::new(base_url, ApiKey::new("test-key").expect("key"), None)
            .expect("dispatcher");
        ToolSource::new(&crate::catalog::builtin_catalog().expect("catalog"), dispatcher)
            .expect("source")
    }

    fn result_json(result: &CallToolResult) -> Value {
        let result_json = serde_json::to_value(result).expect("CallToolResult serializes");
        let text = result_json
            .get("content")
            .and_then(Value::as_array)
            .and_then(|c| c.first())
            .and_then(|c| c.get("text"))
            .and_then(Value::as_str)
            .expect("content[0].text");
        serde_json::from_str(text).expect("json text")
    }

    #[test]
    fn rejects_duplicate_tool_names() {
        let cfg = catalog(
            r"
tools:
  - { name: a, method: GET, path: /a }
  - { name: a, method: GET, path: /b }
",
        );
        let dispatcher = Dispatcher::new(
            "http://127.0.0.1:1",
            ApiKey::new("k").expect("key"),
            None,
        )
        .expect("dispatcher");
        let err = ToolSource::new(&cfg, dispatcher).unwrap_err();
        assert!(err.to_string().contains("Duplicate tool name 'a'"));
    }

    #[test]
    fn rejects_duplicate_params_and_bad_method() {
        let dispatcher = Dispatcher::new(
            "http://127.0.0.1:1",
            ApiKey::new("k").expect("key"),
            None,
        )
        .expect("dispatcher");

        let cfg = catalog(
            r"
tools:
  - name: a
    method: GET
    path: /a
    params:
      - { name: id, in: query }
      - { name: id, in: body }
",
        );
        let err = ToolSource::new(&cfg, dispatcher.clone()).unwrap_err();
        assert!(err.to_string().contains("Duplicate parameter 'id'"));

        let cfg = catalog("tools: [ { name: a, method: 'NOT A METHOD', path: /a } ]");
        let err = ToolSource::new(&cfg, dispatcher.clone()).unwrap_err();
        assert!(err.to_string().contains("Invalid HTTP method"));

        let cfg = catalog("tools: [ { name: a, method: GET, path: a } ]");
        assert!(ToolSource::new(&cfg, dispatcher).is_err());
    }

    #[test]
    fn list_tools_advertises_schema_without_internal_keywords() {
        let source = source("http://127.0.0.1:1");
        let tools = source.list_tools();
        assert_eq!(tools.len(), 20);

        let create = tools
            .iter()
            .find(|t| t.name == "create-template")
            .expect("create-template");
        let text = serde_json::to_string(&*create.input_schema).expect("schema");
        assert!(!text.contains("x-trim"));

        let delete = tools
            .iter()
            .find(|t| t.name == "delete-gpu-instance")
            .expect("delete-gpu-instance");
        let annotations = delete.annotations.as_ref().expect("annotations");
        assert_eq!(annotations.destructive_hint, Some(true));

        let list = tools
            .iter()
            .find(|t| t.name == "list-gpu-instances")
            .expect("list-gpu-instances");
        let annotations = list.annotations.as_ref().expect("annotations");
        assert_eq!(annotations.read_only_hint, Some(true));
    }

    #[test]
    fn query_is_built_in_declaration_order_and_skips_empty_values() {
        let source = source("http://127.0.0.1:1");
        let tool = source
            .inner
            .tools
            .iter()
            .find(|t| t.name == "list-gpu-instances")
            .expect("tool");

        let parts = build_request_parts(
            tool,
            &json!({ "pageSize": 2, "status": "running", "name": "", "productName": "RTX 4090" }),
        );
        assert_eq!(
            parts.path,
            "/gpu/instances?status=running&pageSize=2&productName=RTX%204090"
        );
        assert!(parts.body.is_none());
    }

    #[test]
    fn query_keeps_zero_and_false_and_joins_arrays() {
        let cfg = catalog(
            r"
tools:
  - name: q
    method: GET
    path: /q
    params:
      - { name: n, in: query, schema: { type: number } }
      - { name: b, in: query, schema: { type: boolean } }
      - { name: ids, in: query, schema: { type: array, items: { type: string } } }
      - { name: empty, in: query, schema: { type: array } }
",
        );
        let tools = generate_tools(&cfg).expect("tools");
        let parts = build_request_parts(
            &tools[0],
            &json!({ "n": 0, "b": false, "ids": ["a", "b c"], "empty": [] }),
        );
        assert_eq!(parts.path, "/q?n=0&b=false&ids=a%2Cb%20c");
    }

    #[test]
    fn body_params_form_json_object() {
        let source = source("http://127.0.0.1:1");
        let tool = source
            .inner
            .tools
            .iter()
            .find(|t| t.name == "start-gpu-instance")
            .expect("tool");
        let parts = build_request_parts(tool, &json!({ "instanceId": "abc" }));
        assert_eq!(parts.path, "/gpu/instance/start");
        assert_eq!(parts.body, Some(json!({ "instanceId": "abc" })));
    }

    #[tokio::test]
    async fn list_gpu_instances_sends_query_and_strips_passwords() {
        let upstream = MockUpstream::start(MockResponse::json(
            200,
            json!({
                "instances": [
                    { "id": "1", "name": "instance1", "sshPassword": "secret123" },
                    { "id": "2", "name": "instance2", "sshPassword": "secret456" }
                ]
            }),
        ))
        .await
        .expect("mock upstream");

        let source = source(upstream.base_url());
        let result = source
            .call_tool(
                "list-gpu-instances",
                json!({ "status": "running", "pageSize": 2 }),
            )
            .await
            .expect("call succeeds");

        assert_ne!(result.is_error, Some(true));
        let payload = result_json(&result);
        assert_eq!(
            payload,
            json!({
                "instances": [
                    { "id": "1", "name": "instance1" },
                    { "id": "2", "name": "instance2" }
                ]
            })
        );

        let requests = upstream.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].method, "GET");
        assert_eq!(requests[0].path, "/gpu/instances");
        assert_eq!(
            requests[0].query.as_deref(),
            Some("status=running&pageSize=2&pageNumber=1")
        );
        assert_eq!(requests[0].header("authorization"), Some("Bearer test-key"));
        assert!(requests[0].body.is_empty());

        upstream.shutdown().await.expect("shutdown");
    }

    #[tokio::test]
    async fn get_gpu_instance_strips_password() {
        let upstream = MockUpstream::start(MockResponse::json(
            200,
            json!({
                "id": "i-1",
                "name": "instance1",
                "status": "running",
                "sshPassword": "secret123"
            }),
        ))
        .await
        .expect("mock upstream");
        let source = source(upstream.base_url());

        let result = source
            .call_tool("get-gpu-instance", json!({ "instanceId": "i-1" }))
            .await
            .expect("call succeeds");

        let payload = result_json(&result);
        assert!(payload.get("sshPassword").is_none());
        assert_eq!(
            payload,
            json!({ "id": "i-1", "name": "instance1", "status": "running" })
        );
        assert_eq!(upstream.requests()[0].query.as_deref(), Some("instanceId=i-1"));

        upstream.shutdown().await.expect("shutdown");
    }

    #[tokio::test]
    async fn invalid_arguments_never_reach_upstream() {
        let upstream = MockUpstream::start(MockResponse::json(200, json!({})))
            .await
            .expect("mock upstream");
        let source = source(upstream.base_url());

        let err = source
            .call_tool("get-gpu-instance", json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolsError::Validation { .. }));

        let err = source
            .call_tool("list-gpu-instances", json!({ "status": "sleeping" }))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolsError::Validation { .. }));

        let err = source.call_tool("no-such-tool", json!({})).await.unwrap_err();
        assert!(matches!(err, ToolsError::UnknownTool(_)));

        assert!(upstream.requests().is_empty());
        upstream.shutdown().await.expect("shutdown");
    }

    #[tokio::test]
    async fn create_template_fills_nested_defaults_and_trims() {
        let upstream =
            MockUpstream::start(MockResponse::json(200, json!({ "templateId": "t-1" })))
                .await
                .expect("mock upstream");
        let source = source(upstream.base_url());

        let result = source
            .call_tool(
                "create-template",
                json!({
                    "template": {
                        "name": "  my-template ",
                        "image": " nginx:latest ",
                        "rootfsSize": 20,
                        "ports": [ { "type": "http", "ports": [80] } ]
                    }
                }),
            )
            .await
            .expect("call succeeds");
        assert_eq!(result_json(&result), json!({ "templateId": "t-1" }));

        let requests = upstream.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].method, "POST");
        assert_eq!(requests[0].path, "/template/create");
        let body: Value = serde_json::from_str(&requests[0].body).expect("json body");
        let template = &body["template"];
        assert_eq!(template["name"], json!("my-template"));
        assert_eq!(template["image"], json!("nginx:latest"));
        assert_eq!(template["type"], json!("instance"));
        assert_eq!(template["channel"], json!("private"));

        upstream.shutdown().await.expect("shutdown");
    }

    #[tokio::test]
    async fn unknown_nested_fields_are_rejected() {
        let upstream = MockUpstream::start(MockResponse::json(200, json!({})))
            .await
            .expect("mock upstream");
        let source = source(upstream.base_url());

        let err = source
            .call_tool(
                "create-template",
                json!({
                    "template": {
                        "name": "my-template",
                        "image": "nginx:latest",
                        "rootfsSize": 20,
                        "ports": [ { "type": "http", "ports": [80], "protocol": "h2" } ],
                        "owner": "someone-else"
                    }
                }),
            )
            .await
            .unwrap_err();
        let ToolsError::Validation { violations, .. } = err else {
            panic!("expected validation error");
        };
        let paths: Vec<&str> = violations
            .as_array()
            .into_iter()
            .flatten()
            .filter_map(|v| v["instancePath"].as_str())
            .collect();
        assert!(paths.contains(&"/template"), "{violations}");
        assert!(paths.contains(&"/template/ports/0"), "{violations}");

        assert!(upstream.requests().is_empty());
        upstream.shutdown().await.expect("shutdown");
    }

    #[tokio::test]
    async fn non_json_success_renders_status_marker() {
        let upstream = MockUpstream::start(MockResponse::text(200, ""))
            .await
            .expect("mock upstream");
        let source = source(upstream.base_url());

        let result = source
            .call_tool("stop-gpu-instance", json!({ "instanceId": "abc" }))
            .await
            .expect("call succeeds");
        assert_eq!(result_json(&result), json!({ "success": true, "status": 200 }));

        let requests = upstream.requests();
        assert_eq!(requests[0].body, r#"{"instanceId":"abc"}"#);
        upstream.shutdown().await.expect("shutdown");
    }

    #[tokio::test]
    async fn remote_error_is_returned() {
        let upstream = MockUpstream::start(MockResponse::text(404, "instance not found"))
            .await
            .expect("mock upstream");
        let source = source(upstream.base_url());

        let err = source
            .call_tool("get-gpu-instance", json!({ "instanceId": "missing" }))
            .await
            .unwrap_err();
        assert!(err.is_execution_error());
        assert_eq!(
            err.to_string(),
            "Novita AI API Error: 404 - instance not found"
        );
        upstream.shutdown().await.expect("shutdown");
    }
}
