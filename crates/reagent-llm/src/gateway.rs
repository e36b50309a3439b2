//! Gateway trait definition

use crate::{Completion, CompletionRequest, Result};
use async_trait::async_trait;

/// Boundary over a remote language model
///
/// A gateway is stateless: it receives the full ordered message history on
/// every call and returns exactly one completion. Implementations are built
/// explicitly and handed to each agent, so agents never share a global client.
#[async_trait]
pub trait Gateway: Send + Sync {
    /// Generate one completion for the request
    async fn complete(&self, request: CompletionRequest) -> Result<Completion>;

    /// Wait until the gateway may send its next request
    ///
    /// Callers await this before `complete` and outside any per-call
    /// deadline, so time spent waiting on a rate limit never counts as a
    /// timeout. The default never waits.
    async fn ready(&self) {}

    /// Get the gateway name (e.g., "openai", "scripted")
    fn name(&self) -> &str;
}
