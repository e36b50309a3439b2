//! Tool definition types

use crate::ParameterSchema;
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Failure reported by a tool handler
///
/// Handler failures never abort a run: the registry turns them into an
/// observation prefixed with the error marker.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ToolFailure {
    /// The handler could not complete the operation
    #[error("{0}")]
    Failed(String),

    /// Arguments passed schema validation but were semantically invalid
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The handler did not finish in time
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    /// An HTTP request made by the handler failed
    #[error("HTTP request failed: {0}")]
    Http(String),
}

impl ToolFailure {
    /// Convenience constructor for [`ToolFailure::Failed`]
    pub fn msg(message: impl Into<String>) -> Self {
        ToolFailure::Failed(message.into())
    }
}

impl From<reqwest::Error> for ToolFailure {
    fn from(err: reqwest::Error) -> Self {
        ToolFailure::Http(err.to_string())
    }
}

/// Validated arguments handed to a tool handler
///
/// Only parameters declared in the tool's schema are present, and each has
/// the declared type.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Arguments {
    values: Map<String, Value>,
}

impl Arguments {
    pub(crate) fn new(values: Map<String, Value>) -> Self {
        Self { values }
    }

    /// Raw value of an argument
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// Required string argument
    pub fn str(&self, name: &str) -> Result<&str, ToolFailure> {
        self.opt_str(name)
            .ok_or_else(|| ToolFailure::InvalidInput(format!("missing string argument '{name}'")))
    }

    /// Optional string argument
    pub fn opt_str(&self, name: &str) -> Option<&str> {
        self.values.get(name).and_then(Value::as_str)
    }

    /// Optional numeric argument
    pub fn opt_f64(&self, name: &str) -> Option<f64> {
        self.values.get(name).and_then(Value::as_f64)
    }

    /// Check if no argument was supplied
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Arguments as a JSON object
    pub fn to_value(&self) -> Value {
        Value::Object(self.values.clone())
    }
}

/// Trait for the executable part of a tool
///
/// # Example
///
/// ```
/// use async_trait::async_trait;
/// use reagent_tools::{Arguments, ToolFailure, ToolHandler};
///
/// struct Shout;
///
/// #[async_trait]
/// impl ToolHandler for Shout {
///     async fn call(&self, args: &Arguments) -> Result<String, ToolFailure> {
///         Ok(args.str("text")?.to_uppercase())
///     }
/// }
/// ```
#[async_trait]
pub trait ToolHandler: Send + Sync {
    /// Execute the tool with validated arguments
    async fn call(&self, args: &Arguments) -> Result<String, ToolFailure>;
}

/// Adapter turning an async closure into a [`ToolHandler`]
pub struct FnHandler<F>(F);

impl<F> FnHandler<F> {
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

#[async_trait]
impl<F, Fut> ToolHandler for FnHandler<F>
where
    F: Fn(Arguments) -> Fut + Send + Sync,
    Fut: Future<Output = Result<String, ToolFailure>> + Send,
{
    async fn call(&self, args: &Arguments) -> Result<String, ToolFailure> {
        (self.0)(args.clone()).await
    }
}

/// Declarative tool definition
///
/// Registered once into a [`ToolRegistry`](crate::ToolRegistry) and never
/// modified afterwards.
#[derive(Clone)]
pub struct ToolSpec {
    name: String,
    description: String,
    schema: ParameterSchema,
    handler: Arc<dyn ToolHandler>,
}

impl ToolSpec {
    /// Create a tool from a handler implementation
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        schema: ParameterSchema,
        handler: impl ToolHandler + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            schema,
            handler: Arc::new(handler),
        }
    }

    /// Create a tool from an async closure
    ///
    /// ```
    /// use reagent_tools::{ParamType, ParameterSchema, ToolSpec};
    ///
    /// let tool = ToolSpec::from_fn(
    ///     "shout",
    ///     "Upper-case the text",
    ///     ParameterSchema::new().required("text", ParamType::String, "Text"),
    ///     |args| async move { Ok(args.str("text")?.to_uppercase()) },
    /// );
    /// assert_eq!(tool.name(), "shout");
    /// ```
    pub fn from_fn<F, Fut>(
        name: impl Into<String>,
        description: impl Into<String>,
        schema: ParameterSchema,
        f: F,
    ) -> Self
    where
        F: Fn(Arguments) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<String, ToolFailure>> + Send + 'static,
    {
        Self::new(name, description, schema, FnHandler::new(f))
    }

    /// Tool name, unique within a registry
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Human-readable description shown to the model
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Declared parameters
    pub fn schema(&self) -> &ParameterSchema {
        &self.schema
    }

    /// Executable handler
    pub fn handler(&self) -> &Arc<dyn ToolHandler> {
        &self.handler
    }
}

impl std::fmt::Debug for ToolSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolSpec")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("schema", &self.schema)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ParamType;
    use serde_json::json;

    #[tokio::test]
    async fn test_fn_handler() {
        let tool = ToolSpec::from_fn(
            "shout",
            "Upper-case the text",
            ParameterSchema::new().required("text", ParamType::String, "Text"),
            |args| async move { Ok(args.str("text")?.to_uppercase()) },
        );

        let args = tool.schema().bind("shout", json!("hi")).unwrap();
        assert_eq!(tool.handler().call(&args).await.unwrap(), "HI");
    }

    #[test]
    fn test_argument_accessors() {
        let mut map = Map::new();
        map.insert("city".into(), json!("Paris"));
        map.insert("offset".into(), json!(2));
        let args = Arguments::new(map);

        assert_eq!(args.str("city").unwrap(), "Paris");
        assert_eq!(args.opt_f64("offset"), Some(2.0));
        assert!(args.opt_str("missing").is_none());
        assert!(matches!(args.str("missing"), Err(ToolFailure::InvalidInput(_))));
        assert_eq!(args.to_value(), json!({"city": "Paris", "offset": 2}));
    }

    #[test]
    fn test_failure_display() {
        assert_eq!(ToolFailure::msg("boom").to_string(), "boom");
        assert_eq!(
            ToolFailure::Timeout(Duration::from_millis(50)).to_string(),
            "timed out after 50ms"
        );
    }
}
