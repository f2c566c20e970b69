/*!
params.rs - parameter schemas for catalogue operations.

Each operation declares a static list of [`ParamSpec`]s. They serve two
purposes:
  - rendering the JSON Schema advertised through `tools/list`
  - validating the caller's argument object into [`Arguments`] before any
    subprocess is spawned

Unknown keys are ignored. `null` counts as absent.
*/

use std::collections::BTreeMap;

use serde_json::{Map, Value, json};
use thiserror::Error;

/// Accepted shape of one parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    /// Array of strings, passed through as extra argv tokens.
    Flags,
    /// String or number, rendered as text (cluster / job ids).
    Identifier,
    /// String restricted to a fixed whitelist.
    Choice(&'static [&'static str]),
    /// Integer >= 1.
    PositiveInteger,
}

#[derive(Debug, Clone, Copy)]
pub struct ParamSpec {
    pub name: &'static str,
    pub kind: ParamKind,
    pub required: bool,
    pub description: &'static str,
}

impl ParamSpec {
    fn schema(&self) -> Value {
        let mut schema = match self.kind {
            ParamKind::Flags => json!({"type": "array", "items": {"type": "string"}}),
            ParamKind::Identifier => json!({"anyOf": [{"type": "string"}, {"type": "number"}]}),
            ParamKind::Choice(allowed) => json!({"type": "string", "enum": allowed}),
            ParamKind::PositiveInteger => json!({"type": "integer", "minimum": 1}),
        };
        if let Value::Object(map) = &mut schema {
            map.insert("description".into(), Value::String(self.description.into()));
        }
        schema
    }

    fn coerce(&self, raw: &Value) -> Result<ParamValue, ValidationError> {
        let mismatch = |expected| ValidationError::Type {
            name: self.name,
            expected,
        };
        match self.kind {
            ParamKind::Flags => raw
                .as_array()
                .and_then(|items| {
                    items
                        .iter()
                        .map(|v| v.as_str().map(str::to_string))
                        .collect::<Option<Vec<_>>>()
                })
                .map(ParamValue::List)
                .ok_or_else(|| mismatch("an array of strings")),
            ParamKind::Identifier => match raw {
                Value::String(s) => Ok(ParamValue::Text(s.clone())),
                Value::Number(n) => Ok(ParamValue::Text(number_text(n))),
                _ => Err(mismatch("a string or number")),
            },
            ParamKind::Choice(allowed) => {
                let s = raw.as_str().ok_or_else(|| mismatch("a string"))?;
                if allowed.contains(&s) {
                    Ok(ParamValue::Text(s.to_string()))
                } else {
                    Err(ValidationError::NotAllowed {
                        name: self.name,
                        allowed,
                    })
                }
            }
            ParamKind::PositiveInteger => raw
                .as_u64()
                .or_else(|| {
                    // JSON clients may send 30.0
                    raw.as_f64()
                        .filter(|f| f.fract() == 0.0 && *f >= 1.0 && *f <= u32::MAX as f64)
                        .map(|f| f as u64)
                })
                .filter(|n| *n >= 1)
                .map(ParamValue::Integer)
                .ok_or_else(|| mismatch("a positive integer")),
        }
    }
}

/// Whole floats render without a fraction, so `6180.0` becomes `6180`.
fn number_text(n: &serde_json::Number) -> String {
    match n.as_f64() {
        Some(f) if !n.is_i64() && !n.is_u64() && f.fract() == 0.0 && f.abs() < 9.0e15 => {
            format!("{}", f as i64)
        }
        _ => n.to_string(),
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("missing required parameter: {0}")]
    Missing(&'static str),
    #[error("{name} must be {expected}")]
    Type {
        name: &'static str,
        expected: &'static str,
    },
    #[error("{name} must be one of: {}", .allowed.join(", "))]
    NotAllowed {
        name: &'static str,
        allowed: &'static [&'static str],
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamValue {
    Text(String),
    List(Vec<String>),
    Integer(u64),
}

/// Validated parameters handed to an operation's build rule.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Arguments(BTreeMap<&'static str, ParamValue>);

impl Arguments {
    pub fn text(&self, name: &str) -> Option<&str> {
        match self.0.get(name) {
            Some(ParamValue::Text(s)) => Some(s),
            _ => None,
        }
    }

    /// List value, or an empty slice when absent.
    pub fn list(&self, name: &str) -> &[String] {
        match self.0.get(name) {
            Some(ParamValue::List(items)) => items,
            _ => &[],
        }
    }

    pub fn integer(&self, name: &str) -> Option<u64> {
        match self.0.get(name) {
            Some(ParamValue::Integer(n)) => Some(*n),
            _ => None,
        }
    }
}

/// Validate `raw` against `specs`.
pub fn validate(
    specs: &[ParamSpec],
    raw: Option<&Map<String, Value>>,
) -> Result<Arguments, ValidationError> {
    let mut out = BTreeMap::new();
    for spec in specs {
        match raw.and_then(|m| m.get(spec.name)).filter(|v| !v.is_null()) {
            Some(value) => {
                out.insert(spec.name, spec.coerce(value)?);
            }
            None if spec.required => return Err(ValidationError::Missing(spec.name)),
            None => {}
        }
    }
    Ok(Arguments(out))
}

/// JSON Schema object describing `specs`.
pub fn input_schema(specs: &[ParamSpec]) -> Map<String, Value> {
    let properties: Map<String, Value> = specs
        .iter()
        .map(|s| (s.name.to_string(), s.schema()))
        .collect();
    let required: Vec<&str> = specs.iter().filter(|s| s.required).map(|s| s.name).collect();

    let mut schema = Map::new();
    schema.insert("type".into(), json!("object"));
    schema.insert("properties".into(), Value::Object(properties));
    if !required.is_empty() {
        schema.insert("required".into(), json!(required));
    }
    schema
}
