//! Parameter schemas for tools
//!
//! A [`ParameterSchema`] is an ordered list of named, typed parameters. It is
//! rendered to JSON Schema for descriptions and used to bind the raw arguments
//! a model produced into validated [`Arguments`].

use crate::{Arguments, Result};
use reagent_core::Error;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

/// JSON type of a tool parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    String,
    Number,
    Integer,
    Boolean,
    Array,
    Object,
}

impl ParamType {
    /// JSON Schema name of the type
    pub fn as_str(&self) -> &'static str {
        match self {
            ParamType::String => "string",
            ParamType::Number => "number",
            ParamType::Integer => "integer",
            ParamType::Boolean => "boolean",
            ParamType::Array => "array",
            ParamType::Object => "object",
        }
    }

    /// Check whether a JSON value has this type
    pub fn matches(&self, value: &Value) -> bool {
        match self {
            ParamType::String => value.is_string(),
            ParamType::Number => value.is_number(),
            ParamType::Integer => value.is_i64() || value.is_u64(),
            ParamType::Boolean => value.is_boolean(),
            ParamType::Array => value.is_array(),
            ParamType::Object => value.is_object(),
        }
    }
}

impl std::fmt::Display for ParamType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One declared parameter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ParamType,
    pub required: bool,
    pub description: String,
}

/// Ordered parameter list of a tool
///
/// # Example
///
/// ```
/// use reagent_tools::{ParamType, ParameterSchema};
///
/// let schema = ParameterSchema::new()
///     .required("url", ParamType::String, "Page to read")
///     .optional("query", ParamType::String, "Question about the page");
///
/// assert_eq!(schema.len(), 2);
/// assert_eq!(schema.to_json_schema()["required"][0], "url");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterSchema {
    params: Vec<ParamSpec>,
}

impl ParameterSchema {
    /// Create an empty schema (a tool without parameters)
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a required parameter
    pub fn required(self, name: impl Into<String>, kind: ParamType, description: impl Into<String>) -> Self {
        self.param(name, kind, true, description)
    }

    /// Declare an optional parameter
    pub fn optional(self, name: impl Into<String>, kind: ParamType, description: impl Into<String>) -> Self {
        self.param(name, kind, false, description)
    }

    fn param(
        mut self,
        name: impl Into<String>,
        kind: ParamType,
        required: bool,
        description: impl Into<String>,
    ) -> Self {
        self.params.push(ParamSpec {
            name: name.into(),
            kind,
            required,
            description: description.into(),
        });
        self
    }

    /// Declared parameters in order
    pub fn params(&self) -> &[ParamSpec] {
        &self.params
    }

    /// Look up a parameter by name
    pub fn get(&self, name: &str) -> Option<&ParamSpec> {
        self.params.iter().find(|p| p.name == name)
    }

    /// Number of declared parameters
    pub fn len(&self) -> usize {
        self.params.len()
    }

    /// Check if the tool takes no parameters
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Render as a JSON Schema object
    pub fn to_json_schema(&self) -> Value {
        let properties: Map<String, Value> = self
            .params
            .iter()
            .map(|p| {
                (
                    p.name.clone(),
                    json!({
                        "type": p.kind.as_str(),
                        "description": p.description,
                    }),
                )
            })
            .collect();

        let required: Vec<&str> = self
            .params
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name.as_str())
            .collect();

        json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }

    /// Render as a compact signature, e.g. `url: string, query?: string`
    pub fn signature(&self) -> String {
        self.params
            .iter()
            .map(|p| {
                let marker = if p.required { "" } else { "?" };
                format!("{}{marker}: {}", p.name, p.kind)
            })
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Bind raw arguments to the declared parameters
    ///
    /// - a JSON object binds by name; unknown keys are rejected
    /// - `null` binds as "no arguments"
    /// - any other value binds positionally when exactly one parameter is
    ///   declared; a bare number or boolean given to a lone string parameter
    ///   binds as its JSON text
    ///
    /// Missing required parameters and type mismatches fail with
    /// [`Error::InvalidArguments`]. An explicit `null` for an optional
    /// parameter is treated as absent.
    pub fn bind(&self, tool: &str, raw: Value) -> Result<Arguments> {
        let invalid = |reason: String| Error::InvalidArguments {
            tool: tool.to_string(),
            reason,
        };

        let mut values = match raw {
            Value::Null => Map::new(),
            Value::Object(map) => map,
            other => match self.params.as_slice() {
                [only] => {
                    let value = match other {
                        Value::Number(_) | Value::Bool(_) if only.kind == ParamType::String => {
                            Value::String(other.to_string())
                        }
                        other => other,
                    };
                    let mut map = Map::new();
                    map.insert(only.name.clone(), value);
                    map
                }
                [] => return Err(invalid("tool takes no arguments".to_string())),
                _ => {
                    return Err(invalid(format!(
                        "expected a JSON object with named arguments ({})",
                        self.signature()
                    )));
                }
            },
        };

        if let Some(unknown) = values.keys().find(|key| self.get(key).is_none()) {
            return Err(invalid(format!("unknown argument '{unknown}'")));
        }

        values.retain(|_, value| !value.is_null());

        for param in &self.params {
            match values.get(&param.name) {
                Some(value) if !param.kind.matches(value) => {
                    return Err(invalid(format!(
                        "argument '{}' must be of type {}",
                        param.name, param.kind
                    )));
                }
                None if param.required => {
                    return Err(invalid(format!("missing required argument '{}'", param.name)));
                }
                _ => {}
            }
        }

        Ok(Arguments::new(values))
    }
}
