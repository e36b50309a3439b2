//! Tool registry for managing available tools
//!
//! The registry is filled once at startup and then shared read-only through
//! `Arc`, so lookups need no locking. Entries keep registration order, which
//! is also the order of the catalogue shown to the model.

use crate::{Result, ToolFailure, ToolSpec};
use futures::FutureExt;
use reagent_core::Error;
use serde::Serialize;
use serde_json::Value;
use std::any::Any;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Prefix of every observation produced by a failed handler
pub const ERROR_MARKER: &str = "ERROR:";

/// Outcome of one tool invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolOutput {
    /// Observation text (prefixed with [`ERROR_MARKER`] on failure)
    pub text: String,
    /// Whether the handler failed
    pub is_error: bool,
    /// Wall-clock time spent in the handler
    pub duration: Duration,
}

impl ToolOutput {
    fn success(text: String, duration: Duration) -> Self {
        Self {
            text,
            is_error: false,
            duration,
        }
    }

    fn failure(failure: &ToolFailure, duration: Duration) -> Self {
        Self {
            text: format!("{ERROR_MARKER} {failure}"),
            is_error: true,
            duration,
        }
    }

    /// Duration in whole milliseconds
    pub fn duration_ms(&self) -> u64 {
        u64::try_from(self.duration.as_millis()).unwrap_or(u64::MAX)
    }
}

/// Serializable description of a registered tool
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolDescription {
    pub name: String,
    pub description: String,
    /// JSON Schema of the parameters
    pub parameters: Value,
}

/// Registry of tools
#[derive(Debug, Clone, Default)]
pub struct ToolRegistry {
    tools: Vec<Arc<ToolSpec>>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    /// Create a new tool registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool
    ///
    /// Fails with [`Error::DuplicateTool`] if the name is taken, leaving the
    /// registry unchanged. Names must be usable in an action tag
    /// (`[A-Za-z_][A-Za-z0-9_-]*`).
    pub fn register(&mut self, spec: ToolSpec) -> Result<()> {
        if !is_valid_name(spec.name()) {
            return Err(Error::Configuration(format!(
                "Invalid tool name '{}'",
                spec.name()
            )));
        }
        if self.index.contains_key(spec.name()) {
            return Err(Error::DuplicateTool(spec.name().to_string()));
        }

        debug!(tool = spec.name(), "Registering tool");
        self.index.insert(spec.name().to_string(), self.tools.len());
        self.tools.push(Arc::new(spec));
        Ok(())
    }

    /// Builder-style [`register`](Self::register)
    pub fn with_tool(mut self, spec: ToolSpec) -> Result<Self> {
        self.register(spec)?;
        Ok(self)
    }

    /// Get a tool by name
    ///
    /// Repeated lookups return the same shared entry.
    pub fn resolve(&self, name: &str) -> Result<Arc<ToolSpec>> {
        self.index
            .get(name)
            .map(|&i| Arc::clone(&self.tools[i]))
            .ok_or_else(|| Error::UnknownTool(name.to_string()))
    }

    /// Describe every tool in registration order
    pub fn describe_all(&self) -> Vec<ToolDescription> {
        self.tools
            .iter()
            .map(|t| ToolDescription {
                name: t.name().to_string(),
                description: t.description().to_string(),
                parameters: t.schema().to_json_schema(),
            })
            .collect()
    }

    /// Render the text catalogue embedded in system prompts
    pub fn render_catalogue(&self) -> String {
        if self.tools.is_empty() {
            return "(no tools available)".to_string();
        }
        self.tools
            .iter()
            .map(|t| format!("- {}({}): {}", t.name(), t.schema().signature(), t.description()))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Build a registry restricted to the given tools
    ///
    /// The entries are shared with `self`. Unknown names fail with
    /// [`Error::UnknownTool`].
    pub fn subset<S: AsRef<str>>(&self, names: &[S]) -> Result<Self> {
        let mut subset = Self::new();
        for name in names {
            let spec = self.resolve(name.as_ref())?;
            if subset.index.contains_key(spec.name()) {
                continue;
            }
            subset.index.insert(spec.name().to_string(), subset.tools.len());
            subset.tools.push(spec);
        }
        Ok(subset)
    }

    /// Bind arguments and invoke a tool
    ///
    /// Unknown tools and invalid arguments are returned as errors. A failing
    /// or panicking handler is not an error: it yields an output with
    /// `is_error` set.
    pub async fn invoke(&self, name: &str, raw_arguments: Value) -> Result<ToolOutput> {
        self.invoke_inner(name, raw_arguments, None).await
    }

    /// Like [`invoke`](Self::invoke), reporting a handler that exceeds
    /// `timeout` as a handler failure
    pub async fn invoke_with_timeout(
        &self,
        name: &str,
        raw_arguments: Value,
        timeout: Duration,
    ) -> Result<ToolOutput> {
        self.invoke_inner(name, raw_arguments, Some(timeout)).await
    }

    async fn invoke_inner(
        &self,
        name: &str,
        raw_arguments: Value,
        timeout: Option<Duration>,
    ) -> Result<ToolOutput> {
        let spec = self.resolve(name)?;
        let args = spec.schema().bind(name, raw_arguments)?;

        // A panicking handler is reported like any other handler failure
        let call = AssertUnwindSafe(spec.handler().call(&args))
            .catch_unwind()
            .map(|caught| caught.unwrap_or_else(|payload| Err(panic_failure(&*payload))));

        let start = Instant::now();
        let outcome = match timeout {
            Some(limit) => tokio::time::timeout(limit, call)
                .await
                .unwrap_or(Err(ToolFailure::Timeout(limit))),
            None => call.await,
        };
        let elapsed = start.elapsed();

        let output = match outcome {
            Ok(text) => ToolOutput::success(text, elapsed),
            Err(failure) => {
                warn!(tool = name, error = %failure, "Tool handler failed");
                ToolOutput::failure(&failure, elapsed)
            }
        };

        debug!(
            tool = name,
            is_error = output.is_error,
            duration_ms = output.duration_ms(),
            "Tool invoked"
        );
        Ok(output)
    }

    /// Registered tool names in order
    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name()).collect()
    }

    /// Iterate over registered tools in order
    pub fn iter(&self) -> impl Iterator<Item = &Arc<ToolSpec>> {
        self.tools.iter()
    }

    /// Get the number of registered tools
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Check if the registry is empty
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

fn panic_failure(payload: &(dyn Any + Send)) -> ToolFailure {
    let message = payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown cause".to_string());
    ToolFailure::Failed(format!("handler panicked: {message}"))
}

fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Arguments, ParamType, ParameterSchema, ToolHandler};
    use async_trait::async_trait;
    use mockall::mock;
    use reagent_core::ErrorKind;
    use serde_json::json;
    use tokio_test::{assert_err, assert_ok};

    mock! {
        Handler {}

        #[async_trait]
        impl ToolHandler for Handler {
            async fn call(&self, args: &Arguments) -> std::result::Result<String, ToolFailure>;
        }
    }

    fn text_schema() -> ParameterSchema {
        ParameterSchema::new().required("text", ParamType::String, "Input text")
    }

    fn echo_tool(name: &str) -> ToolSpec {
        ToolSpec::from_fn(name, "Echo the text", text_schema(), |args| async move {
            Ok(args.str("text")?.to_string())
        })
    }

    #[test]
    fn test_resolve_returns_same_entry() {
        let mut registry = ToolRegistry::new();
        registry.register(echo_tool("echo")).unwrap();

        let first = registry.resolve("echo").unwrap();
        let second = registry.resolve("echo").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_duplicate_register_leaves_registry_unchanged() {
        let mut registry = ToolRegistry::new();
        registry.register(echo_tool("echo")).unwrap();
        let original = registry.resolve("echo").unwrap();

        let replacement = ToolSpec::from_fn("echo", "Other", ParameterSchema::new(), |_| async {
            Ok(String::new())
        });
        let err = registry.register(replacement).unwrap_err();

        assert_eq!(err, Error::DuplicateTool("echo".into()));
        assert_eq!(registry.len(), 1);
        assert!(Arc::ptr_eq(&original, &registry.resolve("echo").unwrap()));
        assert_eq!(registry.resolve("echo").unwrap().description(), "Echo the text");
    }

    #[test]
    fn test_invalid_name_rejected() {
        let mut registry = ToolRegistry::new();
        assert!(registry.register(echo_tool("bad name")).is_err());
        assert!(registry.register(echo_tool("9lives")).is_err());
        assert!(registry.register(echo_tool("web-fetch_2")).is_ok());
    }

    #[test]
    fn test_unknown_tool() {
        let registry = ToolRegistry::new();
        assert_eq!(
            registry.resolve("missing").unwrap_err().kind(),
            ErrorKind::UnknownTool
        );
    }

    #[test]
    fn test_describe_all_keeps_order() {
        let registry = ToolRegistry::new()
            .with_tool(echo_tool("zeta"))
            .unwrap()
            .with_tool(echo_tool("alpha"))
            .unwrap();

        let names: Vec<_> = registry.describe_all().into_iter().map(|d| d.name).collect();
        assert_eq!(names, ["zeta", "alpha"]);
        assert_eq!(registry.names(), ["zeta", "alpha"]);
        assert_eq!(
            registry.describe_all()[0].parameters["properties"]["text"]["type"],
            "string"
        );
    }

    #[test]
    fn test_render_catalogue() {
        let registry = ToolRegistry::new().with_tool(echo_tool("echo")).unwrap();
        assert_eq!(registry.render_catalogue(), "- echo(text: string): Echo the text");
        assert_eq!(ToolRegistry::new().render_catalogue(), "(no tools available)");
    }

    #[test]
    fn test_subset_shares_entries() {
        let registry = ToolRegistry::new()
            .with_tool(echo_tool("a"))
            .unwrap()
            .with_tool(echo_tool("b"))
            .unwrap()
            .with_tool(echo_tool("c"))
            .unwrap();

        let subset = registry.subset(&["c", "a", "c"]).unwrap();
        assert_eq!(subset.names(), ["c", "a"]);
        assert!(Arc::ptr_eq(
            &subset.resolve("a").unwrap(),
            &registry.resolve("a").unwrap()
        ));
        assert_eq!(
            registry.subset(&["a", "nope"]).unwrap_err(),
            Error::UnknownTool("nope".into())
        );
    }

    #[tokio::test]
    async fn test_invoke_success() {
        let registry = ToolRegistry::new().with_tool(echo_tool("echo")).unwrap();
        let output = registry.invoke("echo", json!({"text": "hello"})).await.unwrap();
        assert_eq!(output.text, "hello");
        assert!(!output.is_error);
    }

    #[tokio::test]
    async fn test_invoke_invalid_arguments_skips_handler() {
        let mut handler = MockHandler::new();
        handler.expect_call().never();

        let registry = ToolRegistry::new()
            .with_tool(ToolSpec::new("strict", "Strict", text_schema(), handler))
            .unwrap();

        let err = assert_err!(registry.invoke("strict", json!({"text": 5})).await);
        assert_eq!(err.kind(), ErrorKind::InvalidArguments);
        let err = assert_err!(registry.invoke("strict", json!({})).await);
        assert_eq!(err.kind(), ErrorKind::InvalidArguments);
    }

    #[tokio::test]
    async fn test_handler_failure_becomes_error_output() {
        let mut handler = MockHandler::new();
        handler
            .expect_call()
            .withf(|args: &Arguments| args.opt_str("text") == Some("bad"))
            .times(1)
            .returning(|_| Err(ToolFailure::msg("cannot process 'bad'")));

        let registry = ToolRegistry::new()
            .with_tool(ToolSpec::new("fragile", "Fails on bad", text_schema(), handler))
            .unwrap();

        let output = registry.invoke("fragile", json!("bad")).await.unwrap();
        assert!(output.is_error);
        assert_eq!(output.text, "ERROR: cannot process 'bad'");
    }

    #[tokio::test]
    async fn test_panicking_handler_becomes_error_output() {
        let boom = ToolSpec::from_fn("boom", "Panics", text_schema(), |args| async move {
            let empty: Vec<u8> = Vec::new();
            let index = args.str("text")?.len() + 2;
            Ok(empty[index].to_string())
        });
        let registry = ToolRegistry::new().with_tool(boom).unwrap();

        let output = assert_ok!(registry.invoke("boom", json!("x")).await);
        assert!(output.is_error);
        assert!(output.text.starts_with("ERROR: handler panicked: index out of bounds"));

        let output = assert_ok!(
            registry
                .invoke_with_timeout("boom", json!("x"), Duration::from_secs(1))
                .await
        );
        assert!(output.is_error);
    }

    #[tokio::test]
    async fn test_invoke_with_timeout() {
        let slow = ToolSpec::from_fn("slow", "Sleeps", ParameterSchema::new(), |_| async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok("late".to_string())
        });
        let registry = ToolRegistry::new().with_tool(slow).unwrap();

        let output = registry
            .invoke_with_timeout("slow", Value::Null, Duration::from_millis(20))
            .await
            .unwrap();
        assert!(output.is_error);
        assert!(output.text.starts_with(ERROR_MARKER));
        assert!(output.text.contains("timed out"));
    }
}
