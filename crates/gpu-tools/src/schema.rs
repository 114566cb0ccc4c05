//! Input schemas: building, argument normalization and validation.
//!
//! Catalog schemas may carry internal `x-` keywords (currently `x-trim`). They drive
//! normalization and are stripped from the schema advertised to MCP clients.

use crate::config::ParamConfig;
use crate::error::{Result, ToolsError};
use serde_json::{Map, Value, json};

const TRIM_KEYWORD: &str = "x-trim";

/// Build the internal (unstripped) object schema for a tool's parameters.
pub(crate) fn build_input_schema(params: &[ParamConfig]) -> Value {
    let mut properties = Map::new();
    let mut required: Vec<Value> = Vec::new();

    for param in params {
        let mut prop_schema = param
            .schema
            .clone()
            .unwrap_or_else(|| json!({ "type": "string" }));
        if let Some(obj) = prop_schema.as_object_mut() {
            if let Some(description) = &param.description {
                obj.insert("description".to_string(), json!(description));
            }
            if let Some(default) = &param.default {
                obj.insert("default".to_string(), default.clone());
            }
        }
        properties.insert(param.name.clone(), prop_schema);

        if param.required && param.default.is_none() {
            required.push(json!(param.name));
        }
    }

    let mut schema = json!({
        "type": "object",
        "properties": properties,
    });
    if !required.is_empty() {
        schema["required"] = Value::Array(required);
    }
    schema
}

/// Copy of `schema` with every internal `x-` keyword removed.
pub(crate) fn advertised_schema(schema: &Value) -> Value {
    let mut out = schema.clone();
    strip_internal_keywords(&mut out);
    out
}

fn strip_internal_keywords(schema: &mut Value) {
    match schema {
        Value::Object(map) => {
            map.retain(|k, _| !k.starts_with("x-"));
            for v in map.values_mut() {
                strip_internal_keywords(v);
            }
        }
        Value::Array(arr) => {
            for v in arr {
                strip_internal_keywords(v);
            }
        }
        _ => {}
    }
}

/// Apply defaults and trimming to `value` according to `schema` (in place).
///
/// - declared properties that are missing or `null` receive their `default`, if any
/// - declared properties that are `null` without a default are removed (treated as absent)
/// - strings under a schema marked `x-trim: true` are trimmed
///
/// Recurses into object properties and array items.
pub(crate) fn normalize_in_place(schema: &Value, value: &mut Value) {
    match value {
        Value::Object(obj) => {
            let Some(props) = schema.get("properties").and_then(Value::as_object) else {
                return;
            };
            for (name, prop_schema) in props {
                let missing = obj.get(name).is_none_or(Value::is_null);
                if missing {
                    match prop_schema.get("default") {
                        Some(default) => {
                            obj.insert(name.clone(), default.clone());
                        }
                        None => {
                            obj.remove(name);
                        }
                    }
                }
                if let Some(v) = obj.get_mut(name) {
                    normalize_in_place(prop_schema, v);
                }
            }
        }
        Value::Array(items) => {
            let Some(item_schema) = schema.get("items") else {
                return;
            };
            for item in items {
                normalize_in_place(item_schema, item);
            }
        }
        Value::String(s) => {
            if schema.get(TRIM_KEYWORD).and_then(Value::as_bool) == Some(true) {
                let trimmed = s.trim();
                if trimmed.len() != s.len() {
                    *s = trimmed.to_string();
                }
            }
        }
        _ => {}
    }
}

/// Compiled validator for one tool's advertised input schema.
pub(crate) struct ArgumentValidator {
    schema: Value,
    validator: jsonschema::Validator,
}

impl ArgumentValidator {
    pub(crate) fn new(tool_name: &str, advertised: &Value) -> Result<Self> {
        let validator = jsonschema::validator_for(advertised).map_err(|e| {
            ToolsError::Config(format!("Invalid input schema for tool '{tool_name}': {e}"))
        })?;
        Ok(Self {
            schema: advertised.clone(),
            validator,
        })
    }

    /// Validate normalized arguments.
    ///
    /// Reports unknown parameters (with suggestions), missing required parameters and JSON Schema
    /// constraint violations together.
    pub(crate) fn validate(&self, args: &Value) -> Result<()> {
        let Some(args_obj) = args.as_object() else {
            return Err(ToolsError::Validation {
                message: "Invalid params: arguments must be a JSON object".to_string(),
                violations: json!([{
                    "type": "invalid-arguments",
                    "message": "arguments must be a JSON object",
                }]),
            });
        };

        let props = self
            .schema
            .get("properties")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();
        let required: Vec<&str> = self
            .schema
            .get("required")
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
            .filter_map(Value::as_str)
            .collect();

        let valid_params: Vec<&str> = props.keys().map(String::as_str).collect();
        let mut violations: Vec<Value> = Vec::new();

        for k in args_obj.keys() {
            if props.contains_key(k) {
                continue;
            }
            violations.push(json!({
                "type": "invalid-parameter",
                "parameter": k,
                "suggestions": find_similar_strings(k, &valid_params),
                "validParameters": valid_params,
            }));
        }

        for r in &required {
            if !args_obj.contains_key(*r) {
                violations.push(json!({
                    "type": "missing-required-parameter",
                    "parameter": r,
                }));
            }
        }

        for e in self.validator.iter_errors(args) {
            // Reported above with a nicer shape.
            if matches!(
                e.kind(),
                jsonschema::error::ValidationErrorKind::Required { .. }
            ) && e.instance_path().to_string().is_empty()
            {
                continue;
            }
            violations.push(json!({
                "type": "constraint-violation",
                "message": e.to_string(),
                "instancePath": e.instance_path().to_string(),
            }));
        }

        if violations.is_empty() {
            return Ok(());
        }

        Err(ToolsError::Validation {
            message: summarize(&violations),
            violations: Value::Array(violations),
        })
    }
}

fn summarize(violations: &[Value]) -> String {
    let first = &violations[0];
    let kind = first.get("type").and_then(Value::as_str).unwrap_or_default();
    let param = first.get("parameter").and_then(Value::as_str).unwrap_or("?");
    let detail = match kind {
        "invalid-parameter" => {
            let suggestion = first
                .get("suggestions")
                .and_then(Value::as_array)
                .and_then(|arr| arr.first())
                .and_then(Value::as_str);
            match suggestion {
                Some(s) => format!("unknown parameter '{param}' (did you mean '{s}'?)"),
                None => format!("unknown parameter '{param}'"),
            }
        }
        "missing-required-parameter" => format!("missing required parameter '{param}'"),
        _ => first
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("validation failed")
            .to_string(),
    };

    if violations.len() == 1 {
        format!("Invalid params: {detail}")
    } else {
        format!(
            "Invalid params: {detail} (and {} more error(s))",
            violations.len() - 1
        )
    }
}

fn find_similar_strings(unknown: &str, known: &[&str]) -> Vec<String> {
    let mut candidates: Vec<(f64, String)> = Vec::new();
    for k in known {
        let score = strsim::jaro(unknown, k);
        if score > 0.7 {
            candidates.push((score, (*k).to_string()));
        }
    }
    candidates.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
    candidates.into_iter().map(|(_, s)| s).collect()
}
