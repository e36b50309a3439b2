//! Error types for team coordination

use crate::StageOutput;
use reagent_core::{Error, ErrorKind, RunResult};
use serde::Serialize;
use thiserror::Error;

/// Errors returned by [`Team::run_task`](crate::Team::run_task)
#[derive(Error, Debug, Clone, Serialize)]
#[serde(tag = "type", content = "detail", rename_all = "snake_case")]
pub enum TeamError {
    /// No agent could be selected for the task
    #[error(transparent)]
    Routing(#[from] Error),

    /// A stage ended with a fatal error; remaining stages were not run
    #[error("Stage '{role}' failed: {error}")]
    StageFailed {
        /// Role of the failing stage
        role: String,
        /// Fatal error of the failing stage
        error: Error,
        /// Stages that finished before the failure, in order
        completed: Vec<StageOutput>,
        /// Full result of the failing stage, including its transcript
        failed: Box<RunResult>,
    },
}

impl TeamError {
    /// Kind of the underlying error
    pub fn kind(&self) -> ErrorKind {
        match self {
            TeamError::Routing(e) | TeamError::StageFailed { error: e, .. } => e.kind(),
        }
    }

    /// Stages completed before the failure
    pub fn completed(&self) -> &[StageOutput] {
        match self {
            TeamError::Routing(_) => &[],
            TeamError::StageFailed { completed, .. } => completed,
        }
    }
}
