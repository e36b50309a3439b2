//! Progress output on stderr

use async_trait::async_trait;
use reagent_core::{Error, RunResult, ToolCallRecord};
use reagent_runtime::AgentEventHandler;
use serde_json::Value;

/// Prints one line per agent event to stderr
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleEvents;

#[async_trait]
impl AgentEventHandler for ConsoleEvents {
    async fn on_thinking(&self, agent: &str, step: usize) {
        eprintln!("[{agent}] thinking (step {step})");
    }

    async fn on_tool_start(&self, agent: &str, tool: &str, arguments: &Value) {
        eprintln!("[{agent}] -> {tool}({arguments})");
    }

    async fn on_tool_done(&self, agent: &str, record: &ToolCallRecord) {
        let mark = if record.success { "ok" } else { "failed" };
        eprintln!("[{agent}] <- {} {mark} in {}ms", record.tool, record.duration_ms);
    }

    async fn on_complete(&self, result: &RunResult) {
        eprintln!("[{}] {} after {} steps", result.agent, result.status, result.steps);
    }

    async fn on_error(&self, agent: &str, error: &Error) {
        eprintln!("[{agent}] error: {error}");
    }
}
