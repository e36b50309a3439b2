//! Execution event hooks

use async_trait::async_trait;
use reagent_core::{Error, RunResult, ToolCallRecord};
use serde_json::Value;

/// Event handler for agent execution events
///
/// Implement this trait to receive callbacks while a [`ReactAgent`](crate::ReactAgent)
/// runs, e.g. to stream progress to a console. Every method defaults to a
/// no-op.
#[async_trait]
pub trait AgentEventHandler: Send + Sync {
    /// Called before each gateway call; `step` counts the tool steps taken so far
    async fn on_thinking(&self, _agent: &str, _step: usize) {}

    /// Called when a tool invocation starts
    async fn on_tool_start(&self, _agent: &str, _tool: &str, _arguments: &Value) {}

    /// Called when a tool invocation completes, successfully or not
    async fn on_tool_done(&self, _agent: &str, _record: &ToolCallRecord) {}

    /// Called when a run ends with an answer or hits the step limit
    async fn on_complete(&self, _result: &RunResult) {}

    /// Called when a run ends with a fatal error
    async fn on_error(&self, _agent: &str, _error: &Error) {}
}

/// No-op event handler for when events are not needed
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpEventHandler;

#[async_trait]
impl AgentEventHandler for NoOpEventHandler {}
