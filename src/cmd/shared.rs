/*!
shared.rs - helpers used by the client subcommands.

Focus:
  - fetch_tools: spawn the target, list its tools, shut it down
  - find_tool_case_insensitive
  - build_arguments_from_schema + primitive coercion
  - load_param_file (JSON / YAML, typed values kept)
  - output_error: uniform JSON / boxed error reporting
*/

use anyhow::{Context, Result, anyhow, bail};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::time::Instant;

use crate::cmd::format::{Role, StyleOptions, box_header, color, emoji};
use crate::mcp::client::{self, TargetSpec};

/* ---- Data Structures ---- */

/// Tools reported by a target, as raw JSON objects.
#[derive(Debug)]
pub struct ToolList {
    pub tools: Vec<Value>,
    /// Spawn + enumerate + shutdown, in milliseconds.
    pub elapsed_ms: u128,
}

impl ToolList {
    pub fn count(&self) -> usize {
        self.tools.len()
    }
}

/* ---- Fetch ---- */

/// Spawn `spec`, enumerate its tools and cancel the session.
pub async fn fetch_tools(spec: &TargetSpec) -> Result<ToolList> {
    let started = Instant::now();
    let service = client::connect(spec).await?;
    let listed = service
        .list_tools(Default::default())
        .await
        .context("Failed to list tools from MCP service");
    let _ = service.cancel().await;

    let value = serde_json::to_value(listed?).unwrap_or(Value::Null);
    Ok(ToolList {
        tools: extract_tool_array(&value),
        elapsed_ms: started.elapsed().as_millis(),
    })
}

/* ---- Tool Object Utilities ---- */

pub fn extract_tool_array(value: &Value) -> Vec<Value> {
    value
        .get("tools")
        .and_then(|v| v.as_array())
        .map(|arr| arr.to_vec())
        .unwrap_or_default()
}

pub fn find_tool_case_insensitive<'a>(tools: &'a [Value], name: &str) -> Option<&'a Value> {
    tools.iter().find(|t| {
        t.get("name")
            .and_then(|v| v.as_str())
            .is_some_and(|n| n.eq_ignore_ascii_case(name))
    })
}

/// `input_schema` or `inputSchema`, whichever the tool carries.
pub fn tool_schema(tool: &Value) -> Option<&Map<String, Value>> {
    tool.get("input_schema")
        .or_else(|| tool.get("inputSchema"))
        .and_then(|v| v.as_object())
}

/// Declared type of a schema property; `anyOf` takes its first branch.
fn property_type(prop: &Value) -> &str {
    prop.get("type")
        .and_then(|v| v.as_str())
        .or_else(|| {
            prop.get("anyOf")
                .and_then(|v| v.as_array())
                .and_then(|branches| branches.first())
                .and_then(|b| b.get("type"))
                .and_then(|v| v.as_str())
        })
        .unwrap_or("string")
}

/// `name:type` pairs for the tool's parameters, required ones marked with `*`.
pub fn param_summary(tool: &Value) -> Vec<String> {
    let Some(schema) = tool_schema(tool) else {
        return Vec::new();
    };
    let required = required_names(schema);
    schema
        .get("properties")
        .and_then(|v| v.as_object())
        .map(|props| {
            props
                .iter()
                .map(|(name, prop)| {
                    let mark = if required.contains(&name.as_str()) { "*" } else { "" };
                    format!("{name}{mark}:{}", property_type(prop))
                })
                .collect()
        })
        .unwrap_or_default()
}

fn required_names(schema: &Map<String, Value>) -> Vec<&str> {
    schema
        .get("required")
        .and_then(|v| v.as_array())
        .map(|arr| arr.iter().filter_map(|r| r.as_str()).collect())
        .unwrap_or_default()
}

/* ---- Argument Building ---- */

/// Build the JSON arguments object for `tool`.
///
/// `provided` holds raw `--param` strings, coerced by each property's declared
/// type. `from_file` holds typed values from a param file; they fill keys the
/// command line left out and are kept as-is, except plain strings which are
/// coerced like `--param` values. Keys unknown to the schema pass through.
/// A missing required parameter is an error.
pub fn build_arguments_from_schema(
    tool: &Value,
    provided: &HashMap<String, String>,
    from_file: &Map<String, Value>,
) -> Result<Map<String, Value>> {
    let schema = tool_schema(tool);
    let required = schema.map(required_names).unwrap_or_default();
    let mut remaining = provided.clone();
    let mut file_remaining = from_file.clone();
    let mut result = Map::new();

    if let Some(props) = schema
        .and_then(|s| s.get("properties"))
        .and_then(|v| v.as_object())
    {
        for (name, prop) in props {
            let file_value = file_remaining.remove(name);
            if let Some(raw) = remaining.remove(name) {
                result.insert(name.clone(), coerce_value(&raw, property_type(prop)));
            } else if let Some(value) = file_value {
                let value = match value {
                    Value::String(raw) => coerce_value(&raw, property_type(prop)),
                    typed => typed,
                };
                result.insert(name.clone(), value);
            } else if required.contains(&name.as_str()) {
                bail!("missing required parameter: {name}");
            }
        }
    }

    for (k, v) in file_remaining {
        if !remaining.contains_key(&k) {
            result.insert(k, v);
        }
    }
    for (k, v) in remaining {
        result.insert(k, Value::String(v));
    }
    Ok(result)
}

/// Coerce a raw string by a primitive JSON Schema type; unparsable values stay strings.
pub fn coerce_value(raw: &str, type_hint: &str) -> Value {
    let text = || Value::String(raw.to_string());
    match type_hint {
        "integer" => raw.parse::<i64>().map(Value::from).unwrap_or_else(|_| text()),
        "number" => raw
            .parse::<f64>()
            .ok()
            .and_then(serde_json::Number::from_f64)
            .map(Value::Number)
            .unwrap_or_else(text),
        "boolean" => match raw.to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" | "y" => Value::Bool(true),
            "false" | "0" | "no" | "n" => Value::Bool(false),
            _ => text(),
        },
        "array" => Value::Array(
            raw.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|s| Value::String(s.to_string()))
                .collect(),
        ),
        _ => text(),
    }
}

/// Parse repeated `KEY=VALUE` flags.
pub fn parse_params(params: &[String]) -> Result<HashMap<String, String>> {
    let mut provided = HashMap::new();
    for kv in params {
        let (k, v) = kv
            .split_once('=')
            .ok_or_else(|| anyhow!("invalid --param (expected KEY=VALUE): {kv}"))?;
        let key = k.trim();
        if key.is_empty() {
            bail!("invalid --param (empty key): {kv}");
        }
        provided.insert(key.to_string(), v.trim().to_string());
    }
    Ok(provided)
}

/// Read a JSON or YAML object file. Values keep their types.
pub fn load_param_file(path: &str) -> Result<Map<String, Value>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read param file: {path}"))?;
    let lower = path.to_ascii_lowercase();

    let value: Value = if lower.ends_with(".yaml") || lower.ends_with(".yml") {
        let yaml: serde_yaml::Value =
            serde_yaml::from_str(&raw).context("failed to parse YAML param file")?;
        serde_json::to_value(yaml).context("failed to convert YAML to JSON")?
    } else {
        serde_json::from_str(&raw).context("failed to parse JSON param file")?
    };

    match value {
        Value::Object(obj) => Ok(obj),
        _ => bail!("param file root must be an object"),
    }
}

/* ---- Output ---- */

pub fn print_json(value: &Value) {
    println!(
        "{}",
        serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
    );
}

/// Report `msg` as JSON or as a red box, then fail with it.
pub fn output_error<T>(json: bool, title: &str, msg: &str) -> Result<T> {
    if json {
        print_json(&serde_json::json!({ "status": "error", "error": msg }));
    } else {
        let style = StyleOptions::detect();
        let title = format!("{} {title}", emoji("error", &style));
        println!(
            "{}",
            box_header(title, Some(color(Role::Error, msg, &style)), &style)
        );
    }
    bail!(msg.to_string())
}
