//! Scripted gateway that replays canned replies
//!
//! Used for offline runs and as a deterministic model double: every call pops
//! the next step of the script and records the request it received.

use crate::{Completion, CompletionRequest, Gateway, GatewayError, Result};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::debug;

/// One scripted gateway step
#[derive(Debug)]
pub enum ScriptStep {
    /// Return this text as the completion
    Reply(String),
    /// Fail with this error
    Fail(GatewayError),
    /// Sleep before returning the text (used to exercise timeouts)
    Delayed(Duration, String),
}

/// Gateway returning pre-recorded replies in order
#[derive(Debug, Default)]
pub struct ScriptedGateway {
    steps: Mutex<VecDeque<ScriptStep>>,
    requests: Mutex<Vec<CompletionRequest>>,
    ready_delay: Duration,
}

impl ScriptedGateway {
    /// Create a gateway from a list of steps
    pub fn new(steps: impl IntoIterator<Item = ScriptStep>) -> Self {
        Self {
            steps: Mutex::new(steps.into_iter().collect()),
            requests: Mutex::new(Vec::new()),
            ready_delay: Duration::ZERO,
        }
    }

    /// Make every `ready` call wait this long, like a throttled provider
    pub fn with_ready_delay(mut self, delay: Duration) -> Self {
        self.ready_delay = delay;
        self
    }

    /// Create a gateway that replies with each text in order
    pub fn from_replies<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(replies.into_iter().map(|r| ScriptStep::Reply(r.into())))
    }

    /// Create a gateway that repeats the same reply `times` times
    pub fn repeating(reply: impl Into<String>, times: usize) -> Self {
        let reply = reply.into();
        Self::from_replies(std::iter::repeat_n(reply, times))
    }

    /// Append a step to the script
    pub async fn push(&self, step: ScriptStep) {
        self.steps.lock().await.push_back(step);
    }

    /// Number of steps not yet consumed
    pub async fn remaining(&self) -> usize {
        self.steps.lock().await.len()
    }

    /// Requests received so far, oldest first
    pub async fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().await.clone()
    }

    /// Number of calls received so far
    pub async fn call_count(&self) -> usize {
        self.requests.lock().await.len()
    }
}

#[async_trait]
impl Gateway for ScriptedGateway {
    async fn complete(&self, request: CompletionRequest) -> Result<Completion> {
        debug!(messages = request.messages.len(), "Scripted gateway call");
        self.requests.lock().await.push(request);

        let step = self.steps.lock().await.pop_front();
        match step {
            Some(ScriptStep::Reply(text)) => Ok(Completion::text(text)),
            Some(ScriptStep::Fail(error)) => Err(error),
            Some(ScriptStep::Delayed(delay, text)) => {
                tokio::time::sleep(delay).await;
                Ok(Completion::text(text))
            }
            None => Err(GatewayError::UnexpectedResponse(
                "Script exhausted".to_string(),
            )),
        }
    }

    async fn ready(&self) {
        if !self.ready_delay.is_zero() {
            tokio::time::sleep(self.ready_delay).await;
        }
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reagent_core::Message;

    fn request() -> CompletionRequest {
        CompletionRequest::builder("test-model")
            .add_message(Message::user("hi"))
            .build()
    }

    #[tokio::test]
    async fn test_replays_in_order() {
        let gateway = ScriptedGateway::from_replies(["first", "second"]);

        assert_eq!(gateway.complete(request()).await.unwrap().text, "first");
        assert_eq!(gateway.complete(request()).await.unwrap().text, "second");
        assert_eq!(gateway.call_count().await, 2);
        assert_eq!(gateway.remaining().await, 0);
    }

    #[tokio::test]
    async fn test_exhausted_script_fails_permanently() {
        let gateway = ScriptedGateway::default();
        let err = gateway.complete(request()).await.unwrap_err();
        assert!(matches!(err, GatewayError::UnexpectedResponse(_)));
        assert!(!err.is_transient());
    }

    #[tokio::test]
    async fn test_scripted_failure() {
        let gateway = ScriptedGateway::new([
            ScriptStep::Fail(GatewayError::Transport("reset".into())),
            ScriptStep::Reply("ok".into()),
        ]);

        assert!(gateway.complete(request()).await.is_err());
        assert_eq!(gateway.complete(request()).await.unwrap().text, "ok");
    }

    #[tokio::test]
    async fn test_ready_delay() {
        let gateway = ScriptedGateway::from_replies(["ok"]).with_ready_delay(Duration::from_millis(30));
        let start = std::time::Instant::now();
        gateway.ready().await;
        assert!(start.elapsed() >= Duration::from_millis(30));
        assert_eq!(gateway.call_count().await, 0);
    }

    #[tokio::test]
    async fn test_records_requests() {
        let gateway = ScriptedGateway::repeating("same", 3);
        gateway.complete(request()).await.unwrap();

        let requests = gateway.requests().await;
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].messages[0].text(), "hi");
        assert_eq!(gateway.remaining().await, 2);
    }
}
