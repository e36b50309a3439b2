//! Structured results of an agent run

use crate::{Error, ErrorKind, Message};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Terminal status of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunStatus {
    /// The model produced a final answer
    Done,
    /// The step budget ran out before a final answer
    Incomplete,
    /// The run hit a fatal error
    Error,
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RunStatus::Done => "DONE",
            RunStatus::Incomplete => "INCOMPLETE",
            RunStatus::Error => "ERROR",
        };
        f.write_str(s)
    }
}

/// One tool invocation performed during a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallRecord {
    /// Tool name as requested by the model
    pub tool: String,
    /// Raw arguments as parsed from the model reply
    pub arguments: serde_json::Value,
    /// Whether the tool produced a regular result
    pub success: bool,
    /// Observation text appended to the conversation
    pub output: String,
    /// Failure description when `success` is false
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// When the invocation started
    pub started_at: DateTime<Utc>,
    /// Wall-clock duration in milliseconds
    pub duration_ms: u64,
}

/// Result of running one agent on one task
///
/// A failed run still carries the partial transcript for diagnosis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
    /// Name of the agent that produced the result
    pub agent: String,
    /// Terminal status
    pub status: RunStatus,
    /// Final answer (`Done`) or best-effort partial answer (`Incomplete`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,
    /// Fatal error (`Error` status only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<Error>,
    /// Full conversation of the run
    pub transcript: Vec<Message>,
    /// Number of tool steps taken
    pub steps: usize,
    /// Tool invocation history
    #[serde(default)]
    pub tool_calls: Vec<ToolCallRecord>,
}

impl RunResult {
    /// Successful run
    pub fn done(agent: impl Into<String>, answer: impl Into<String>, transcript: Vec<Message>) -> Self {
        Self {
            agent: agent.into(),
            status: RunStatus::Done,
            answer: Some(answer.into()),
            error: None,
            transcript,
            steps: 0,
            tool_calls: Vec::new(),
        }
    }

    /// Run stopped by the step budget, with an optional partial answer
    pub fn incomplete(
        agent: impl Into<String>,
        partial: Option<String>,
        transcript: Vec<Message>,
    ) -> Self {
        Self {
            agent: agent.into(),
            status: RunStatus::Incomplete,
            answer: partial,
            error: None,
            transcript,
            steps: 0,
            tool_calls: Vec::new(),
        }
    }

    /// Run aborted by a fatal error
    pub fn failed(agent: impl Into<String>, error: Error, transcript: Vec<Message>) -> Self {
        Self {
            agent: agent.into(),
            status: RunStatus::Error,
            answer: None,
            error: Some(error),
            transcript,
            steps: 0,
            tool_calls: Vec::new(),
        }
    }

    /// Set the number of steps taken
    pub fn with_steps(mut self, steps: usize) -> Self {
        self.steps = steps;
        self
    }

    /// Attach the tool call history
    pub fn with_tool_calls(mut self, tool_calls: Vec<ToolCallRecord>) -> Self {
        self.tool_calls = tool_calls;
        self
    }

    /// Check if the run finished with an answer
    pub fn is_done(&self) -> bool {
        self.status == RunStatus::Done
    }

    /// Kind of the fatal error, if any
    pub fn error_kind(&self) -> Option<ErrorKind> {
        self.error.as_ref().map(Error::kind)
    }

    /// Answer text, or an empty string
    pub fn answer_text(&self) -> &str {
        self.answer.as_deref().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_done() {
        let result = RunResult::done("solver", "4", vec![Message::user("2+2")]).with_steps(1);
        assert!(result.is_done());
        assert_eq!(result.answer_text(), "4");
        assert_eq!(result.steps, 1);
        assert!(result.error_kind().is_none());
    }

    #[test]
    fn test_failed_keeps_transcript() {
        let transcript = vec![Message::system("s"), Message::user("u")];
        let result = RunResult::failed(
            "solver",
            Error::MalformedResponse("twice".into()),
            transcript.clone(),
        );
        assert_eq!(result.status, RunStatus::Error);
        assert_eq!(result.error_kind(), Some(ErrorKind::MalformedResponse));
        assert_eq!(result.transcript, transcript);
        assert_eq!(result.answer_text(), "");
    }

    #[test]
    fn test_status_serialization() {
        let json = serde_json::to_string(&RunStatus::Incomplete).unwrap();
        assert_eq!(json, "\"INCOMPLETE\"");
        assert_eq!(RunStatus::Done.to_string(), "DONE");
    }
}
