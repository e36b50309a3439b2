//! Core Agent trait definition

use crate::{RunResult, Task};
use async_trait::async_trait;

/// Core trait that all agents must implement
///
/// Running an agent never returns a bare error: failures are reported through
/// [`RunResult::status`] together with the partial transcript.
#[async_trait]
pub trait Agent: Send + Sync {
    /// Run the agent on a task until it answers, runs out of steps or fails
    async fn run(&self, task: Task) -> RunResult;

    /// Get the agent's name
    fn name(&self) -> &str;

    /// Specialty keywords used by keyword routing
    fn keywords(&self) -> &[String] {
        &[]
    }
}
