//! Task input for agents
//!
//! A `Task` is the text an agent has to solve, an optional prior-context seed
//! (for example the answer of the previous pipeline stage) and free-form
//! metadata that callers can use for correlation.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Well-known metadata keys
pub mod keys {
    /// Identifier of the top-level run
    pub const RUN_ID: &str = "run_id";
    /// Role of the team member executing the task
    pub const ROLE: &str = "role";
    /// Zero-based stage index inside a pipeline
    pub const STAGE: &str = "stage";
}

/// A task handed to an agent
///
/// # Example
///
/// ```
/// use reagent_core::Task;
///
/// let task = Task::new("Summarise the report")
///     .with_prior_context("The report covers Q3 revenue.")
///     .with_run_id("run-42");
///
/// assert_eq!(task.text(), "Summarise the report");
/// assert_eq!(task.prior_context(), Some("The report covers Q3 revenue."));
/// assert_eq!(task.run_id(), Some("run-42"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Task {
    text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    prior_context: Option<String>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    metadata: HashMap<String, serde_json::Value>,
}

impl Task {
    /// Create a task from its text
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    /// Attach a prior-context seed
    pub fn with_prior_context(mut self, context: impl Into<String>) -> Self {
        self.prior_context = Some(context.into());
        self
    }

    /// Attach a run identifier
    pub fn with_run_id(mut self, run_id: impl Into<String>) -> Self {
        self.insert(keys::RUN_ID, serde_json::json!(run_id.into()));
        self
    }

    /// Attach an arbitrary metadata entry
    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.insert(key, value);
        self
    }

    /// Task text
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Prior-context seed, if any
    pub fn prior_context(&self) -> Option<&str> {
        self.prior_context.as_deref()
    }

    /// Run identifier, if any
    pub fn run_id(&self) -> Option<&str> {
        self.get(keys::RUN_ID).and_then(|v| v.as_str())
    }

    /// Insert a metadata entry
    pub fn insert(&mut self, key: impl Into<String>, value: serde_json::Value) {
        self.metadata.insert(key.into(), value);
    }

    /// Get a metadata entry
    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.metadata.get(key)
    }

    /// Derive the task for the next pipeline stage
    ///
    /// Keeps the text and metadata, replaces the prior context with the
    /// answer produced by the previous stage.
    pub fn next_stage(&self, previous_answer: impl Into<String>) -> Self {
        Self {
            text: self.text.clone(),
            prior_context: Some(previous_answer.into()),
            metadata: self.metadata.clone(),
        }
    }

    /// Render the text sent to the model as the user message
    pub fn render(&self) -> String {
        match &self.prior_context {
            Some(context) if !context.trim().is_empty() => {
                format!("Context from the previous step:\n{context}\n\nTask:\n{}", self.text)
            }
            _ => self.text.clone(),
        }
    }
}

impl From<&str> for Task {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}

impl From<String> for Task {
    fn from(text: String) -> Self {
        Self::new(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_without_context() {
        let task = Task::new("What is 2+2?");
        assert_eq!(task.render(), "What is 2+2?");
    }

    #[test]
    fn test_render_with_context() {
        let task = Task::new("Review it").with_prior_context("draft text");
        let rendered = task.render();
        assert!(rendered.starts_with("Context from the previous step:\ndraft text"));
        assert!(rendered.ends_with("Task:\nReview it"));
    }

    #[test]
    fn test_blank_context_is_ignored() {
        let task = Task::new("Review it").with_prior_context("   ");
        assert_eq!(task.render(), "Review it");
    }

    #[test]
    fn test_next_stage_keeps_metadata() {
        let task = Task::new("plan a trip")
            .with_run_id("r1")
            .with_metadata(keys::STAGE, serde_json::json!(0));
        let next = task.next_stage("day 1: museum");

        assert_eq!(next.text(), "plan a trip");
        assert_eq!(next.prior_context(), Some("day 1: museum"));
        assert_eq!(next.run_id(), Some("r1"));
        assert_eq!(next.get(keys::STAGE), Some(&serde_json::json!(0)));
    }

    #[test]
    fn test_from_str() {
        let task: Task = "hello".into();
        assert_eq!(task.text(), "hello");
        assert!(task.prior_context().is_none());
    }
}
