//! ReAct agent executor
//!
//! The ReactAgent implements the reasoning loop:
//! 1. Thinking: call the gateway with a snapshot of the conversation
//! 2. Parse the reply into an action, a final answer or a parse failure
//! 3. Acting / Observing: run the requested tool, append its observation
//! 4. Stop on a final answer, once `max_steps` tools have run, or on a fatal
//!    error
//!
//! Every run returns a [`RunResult`] carrying the transcript, including
//! failed runs.
//!
//! An agent built with a [`Memory`] recalls the entries relevant to the task
//! into a system message before the first thought, and stores each final
//! answer. Memory failures are logged and never end a run.

use crate::{
    ActionRequest, AgentEventHandler, CORRECTIVE_NOTE, Conversation, NoOpEventHandler, RECALL_HEADER,
    Reply, ReplyParser, RetryPolicy, render_system_prompt,
};
use async_trait::async_trait;
use chrono::Utc;
use reagent_core::{Agent, Error, Memory, Message, Result, RunResult, Task, ToolCallRecord};
use serde_json::{Map, json};
use reagent_llm::{Completion, CompletionRequest, Gateway, GatewayError};
use reagent_tools::{ERROR_MARKER, ToolRegistry};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{Instrument, debug, info, info_span, warn};

/// Model used when none is configured
pub const DEFAULT_MODEL: &str = "Qwen/Qwen3-8B";

/// Parse failures in a row that end a run
const MAX_MALFORMED_STREAK: u32 = 2;

/// Configuration for one agent
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Agent name, also its role inside a team
    pub name: String,

    /// Instructions placed at the top of the system prompt
    pub instructions: String,

    /// Maximum number of tool steps per run (at least 1)
    pub max_steps: usize,

    /// Specialty keywords for keyword routing
    pub keywords: Vec<String>,

    /// Model to use
    pub model: String,

    /// Max tokens per completion
    pub max_tokens: usize,

    /// Temperature
    pub temperature: Option<f32>,

    /// Deadline for a single gateway call
    pub gateway_timeout: Duration,

    /// Deadline for a single tool call
    pub tool_timeout: Duration,

    /// Retry policy for gateway calls
    pub retry: RetryPolicy,

    /// Custom MiniJinja system prompt template
    pub system_template: Option<String>,

    /// Memories recalled into a new run when a memory store is attached
    pub recall_limit: usize,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            name: "assistant".to_string(),
            instructions: "You are a helpful assistant.".to_string(),
            max_steps: 5,
            keywords: Vec::new(),
            model: DEFAULT_MODEL.to_string(),
            max_tokens: 2048,
            temperature: None,
            gateway_timeout: Duration::from_secs(60),
            tool_timeout: Duration::from_secs(30),
            retry: RetryPolicy::default(),
            system_template: None,
            recall_limit: 3,
        }
    }
}

impl AgentConfig {
    /// Check the configuration values
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::Configuration("Agent name must not be empty".to_string()));
        }
        if self.max_steps == 0 {
            return Err(Error::Configuration(format!(
                "Agent '{}': max_steps must be at least 1",
                self.name
            )));
        }
        if self.gateway_timeout.is_zero() || self.tool_timeout.is_zero() {
            return Err(Error::Configuration(format!(
                "Agent '{}': timeouts must be positive",
                self.name
            )));
        }
        if self.retry.max_attempts == 0 {
            return Err(Error::Configuration(format!(
                "Agent '{}': retry needs at least one attempt",
                self.name
            )));
        }
        Ok(())
    }
}

enum State {
    Thinking,
    Acting { reply: String, action: ActionRequest },
    Observing(ToolCallRecord),
    Answering { reply: String, answer: String },
}

/// Agent running the ReAct loop over a gateway and a tool set
///
/// The gateway and the tool registry are shared read-only; each run owns a
/// fresh [`Conversation`], so one agent can serve concurrent runs.
pub struct ReactAgent {
    config: AgentConfig,
    gateway: Arc<dyn Gateway>,
    tools: Arc<ToolRegistry>,
    parser: ReplyParser,
    system_prompt: String,
    event_handler: Arc<dyn AgentEventHandler>,
    memory: Option<Arc<dyn Memory>>,
}

impl ReactAgent {
    /// Create a builder
    pub fn builder() -> ReactAgentBuilder {
        ReactAgentBuilder::new()
    }

    /// Agent configuration
    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// Tools available to this agent
    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    /// Rendered system prompt
    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    /// Set the event handler for receiving execution events
    pub fn with_event_handler(mut self, handler: Arc<dyn AgentEventHandler>) -> Self {
        self.event_handler = handler;
        self
    }

    /// Run the loop on a task
    pub async fn run_task(&self, task: Task) -> RunResult {
        let span = info_span!(
            "agent_run",
            agent = %self.config.name,
            run_id = task.run_id().unwrap_or_default()
        );
        self.run_loop(task).instrument(span).await
    }

    async fn run_loop(&self, task: Task) -> RunResult {
        let name = self.config.name.as_str();
        let mut conversation = Conversation::new();
        conversation.append(Message::system(self.system_prompt.as_str()));
        if let Some(recalled) = self.recall(&task).await {
            conversation.append(Message::system(recalled));
        }
        conversation.append(Message::user(task.render()));

        let mut steps = 0;
        let mut tool_calls: Vec<ToolCallRecord> = Vec::new();
        let mut malformed_streak = 0;
        let mut state = State::Thinking;

        info!(
            max_steps = self.config.max_steps,
            tool_count = self.tools.len(),
            "Agent run started"
        );

        loop {
            state = match state {
                State::Thinking => {
                    self.event_handler.on_thinking(name, steps).await;
                    debug!(step = steps, messages = conversation.len(), "Thinking");

                    let completion = match self.think(&conversation).await {
                        Ok(completion) => completion,
                        Err(e) => {
                            let error = Error::GatewayTransport(e.to_string());
                            return self.fail(error, conversation, steps, tool_calls).await;
                        }
                    };

                    match self.parser.parse(&completion.text) {
                        Reply::Action(action) => {
                            malformed_streak = 0;
                            State::Acting {
                                reply: completion.text,
                                action,
                            }
                        }
                        Reply::Answer { answer, thought } => {
                            if let Some(thought) = thought {
                                debug!(thought = %thought, "Model reasoning");
                            }
                            State::Answering {
                                reply: completion.text,
                                answer,
                            }
                        }
                        Reply::Malformed(reason) => {
                            malformed_streak += 1;
                            warn!(
                                step = steps,
                                streak = malformed_streak,
                                reason = %reason,
                                "Malformed model reply"
                            );
                            if malformed_streak >= MAX_MALFORMED_STREAK {
                                let error = Error::MalformedResponse(reason);
                                return self.fail(error, conversation, steps, tool_calls).await;
                            }
                            conversation.append(Message::system(CORRECTIVE_NOTE));
                            State::Thinking
                        }
                    }
                }

                State::Acting { reply, action } => {
                    if let Some(thought) = &action.thought {
                        debug!(thought = %thought, "Model reasoning");
                    }
                    conversation.append(Message::assistant(reply));
                    State::Observing(self.act(action).await)
                }

                State::Observing(record) => {
                    conversation.append(Message::observation(record.output.as_str()));
                    tool_calls.push(record);
                    steps += 1;

                    if steps >= self.config.max_steps {
                        warn!(steps, "Step limit reached without a final answer");
                        let partial = conversation.last_observation().map(|m| m.text().to_string());
                        let result = RunResult::incomplete(name, partial, conversation.into_messages())
                            .with_steps(steps)
                            .with_tool_calls(tool_calls);
                        self.event_handler.on_complete(&result).await;
                        return result;
                    }
                    State::Thinking
                }

                State::Answering { reply, answer } => {
                    conversation.append(Message::assistant(reply));
                    info!(steps, answer_length = answer.len(), "Agent completed with final answer");
                    self.remember(&task, &answer).await;

                    let result = RunResult::done(name, answer, conversation.into_messages())
                        .with_steps(steps)
                        .with_tool_calls(tool_calls);
                    self.event_handler.on_complete(&result).await;
                    return result;
                }
            };
        }
    }

    /// Memories relevant to the task, rendered as one system message
    async fn recall(&self, task: &Task) -> Option<String> {
        let memory = self.memory.as_ref()?;
        if self.config.recall_limit == 0 {
            return None;
        }

        match memory.retrieve(task.text(), self.config.recall_limit).await {
            Ok(items) if items.is_empty() => None,
            Ok(items) => {
                debug!(count = items.len(), backend = memory.name(), "Recalled memories");
                let lines: Vec<String> = items.iter().map(|item| format!("- {}", item.content)).collect();
                Some(format!("{RECALL_HEADER}\n{}", lines.join("\n")))
            }
            Err(e) => {
                warn!(error = %e, "Memory recall failed");
                None
            }
        }
    }

    /// Store the task and its final answer
    async fn remember(&self, task: &Task, answer: &str) {
        let Some(memory) = &self.memory else {
            return;
        };

        let mut metadata = Map::new();
        metadata.insert("agent".to_string(), json!(self.config.name));
        if let Some(run_id) = task.run_id() {
            metadata.insert("run_id".to_string(), json!(run_id));
        }
        let content = format!("Task: {}\nAnswer: {answer}", task.text());
        match memory.add(&content, metadata).await {
            Ok(item) => debug!(id = %item.id, "Stored final answer in memory"),
            Err(e) => warn!(error = %e, "Failed to store final answer in memory"),
        }
    }

    /// One gateway call under the per-call timeout and the retry policy
    async fn think(&self, conversation: &Conversation) -> std::result::Result<Completion, GatewayError> {
        let snapshot = conversation.snapshot();
        let timeout = self.config.gateway_timeout;

        self.config
            .retry
            .execute("gateway.complete", || {
                let mut builder = CompletionRequest::builder(self.config.model.as_str())
                    .messages(snapshot.to_vec())
                    .max_tokens(self.config.max_tokens);
                if let Some(temperature) = self.config.temperature {
                    builder = builder.temperature(temperature);
                }
                let request = builder.build();

                async move {
                    // rate-limit waits stay outside the deadline
                    self.gateway.ready().await;
                    tokio::time::timeout(timeout, self.gateway.complete(request))
                        .await
                        .unwrap_or(Err(GatewayError::Timeout(timeout)))
                }
            })
            .await
    }

    /// Invoke the requested tool and record the outcome
    ///
    /// Never fails: dispatch errors caused by the model (unknown tool, bad
    /// arguments) become error observations so the model can correct itself.
    async fn act(&self, action: ActionRequest) -> ToolCallRecord {
        let agent = self.config.name.as_str();
        info!(tool = %action.tool, arguments = %action.arguments, "Executing tool");
        self.event_handler
            .on_tool_start(agent, &action.tool, &action.arguments)
            .await;

        let started_at = Utc::now();
        let start = Instant::now();
        let outcome = self
            .tools
            .invoke_with_timeout(&action.tool, action.arguments.clone(), self.config.tool_timeout)
            .await;
        let duration_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);

        let (output, error) = match outcome {
            Ok(output) if output.is_error => {
                let error = Error::ToolExecution {
                    tool: action.tool.clone(),
                    reason: output.text.trim_start_matches(ERROR_MARKER).trim().to_string(),
                };
                warn!(error = %error, "Tool returned an error");
                (output.text, Some(error.to_string()))
            }
            Ok(output) => (output.text, None),
            Err(err) => {
                warn!(tool = %action.tool, error = %err, "Tool dispatch failed");
                (self.dispatch_error_observation(&err), Some(err.to_string()))
            }
        };

        let record = ToolCallRecord {
            tool: action.tool,
            arguments: action.arguments,
            success: error.is_none(),
            output,
            error,
            started_at,
            duration_ms,
        };

        info!(
            tool = %record.tool,
            success = record.success,
            duration_ms,
            "Tool execution finished"
        );
        self.event_handler.on_tool_done(agent, &record).await;
        record
    }

    fn dispatch_error_observation(&self, err: &Error) -> String {
        match err {
            Error::UnknownTool(_) if self.tools.is_empty() => {
                format!("{ERROR_MARKER} {err}. No tools are available")
            }
            Error::UnknownTool(_) => format!(
                "{ERROR_MARKER} {err}. Available tools: {}",
                self.tools.names().join(", ")
            ),
            _ => format!("{ERROR_MARKER} {err}"),
        }
    }

    async fn fail(
        &self,
        error: Error,
        conversation: Conversation,
        steps: usize,
        tool_calls: Vec<ToolCallRecord>,
    ) -> RunResult {
        tracing::error!(error = %error, kind = ?error.kind(), steps, "Agent run failed");
        self.event_handler.on_error(&self.config.name, &error).await;
        RunResult::failed(self.config.name.as_str(), error, conversation.into_messages())
            .with_steps(steps)
            .with_tool_calls(tool_calls)
    }
}

#[async_trait]
impl Agent for ReactAgent {
    async fn run(&self, task: Task) -> RunResult {
        self.run_task(task).await
    }

    fn name(&self) -> &str {
        &self.config.name
    }

    fn keywords(&self) -> &[String] {
        &self.config.keywords
    }
}

impl std::fmt::Debug for ReactAgent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReactAgent")
            .field("config", &self.config)
            .field("gateway", &self.gateway.name())
            .field("tools", &self.tools.names())
            .field("memory", &self.memory.as_ref().map(|m| m.name()))
            .finish_non_exhaustive()
    }
}

/// Builder for ReactAgent
pub struct ReactAgentBuilder {
    gateway: Option<Arc<dyn Gateway>>,
    tools: Arc<ToolRegistry>,
    config: AgentConfig,
    event_handler: Option<Arc<dyn AgentEventHandler>>,
    memory: Option<Arc<dyn Memory>>,
}

impl ReactAgentBuilder {
    /// Create a new builder
    pub fn new() -> Self {
        Self {
            gateway: None,
            tools: Arc::new(ToolRegistry::new()),
            config: AgentConfig::default(),
            event_handler: None,
            memory: None,
        }
    }

    /// Set the language-model gateway
    pub fn gateway(mut self, gateway: Arc<dyn Gateway>) -> Self {
        self.gateway = Some(gateway);
        self
    }

    /// Set the tools available to the agent
    pub fn tools(mut self, tools: Arc<ToolRegistry>) -> Self {
        self.tools = tools;
        self
    }

    /// Set the full configuration
    pub fn config(mut self, config: AgentConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the agent name
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.config.name = name.into();
        self
    }

    /// Set the instructions
    pub fn instructions(mut self, instructions: impl Into<String>) -> Self {
        self.config.instructions = instructions.into();
        self
    }

    /// Set the step budget
    pub fn max_steps(mut self, max: usize) -> Self {
        self.config.max_steps = max;
        self
    }

    /// Add a routing keyword
    pub fn keyword(mut self, keyword: impl Into<String>) -> Self {
        self.config.keywords.push(keyword.into());
        self
    }

    /// Add several routing keywords
    pub fn keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.keywords.extend(keywords.into_iter().map(Into::into));
        self
    }

    /// Set the model
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    /// Set max tokens
    pub fn max_tokens(mut self, max_tokens: usize) -> Self {
        self.config.max_tokens = max_tokens;
        self
    }

    /// Set temperature
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.config.temperature = Some(temperature);
        self
    }

    /// Set the per-call gateway deadline
    pub fn gateway_timeout(mut self, timeout: Duration) -> Self {
        self.config.gateway_timeout = timeout;
        self
    }

    /// Set the per-call tool deadline
    pub fn tool_timeout(mut self, timeout: Duration) -> Self {
        self.config.tool_timeout = timeout;
        self
    }

    /// Set the gateway retry policy
    pub fn retry(mut self, retry: RetryPolicy) -> Self {
        self.config.retry = retry;
        self
    }

    /// Use a custom system prompt template
    pub fn system_template(mut self, template: impl Into<String>) -> Self {
        self.config.system_template = Some(template.into());
        self
    }

    /// Set the event handler
    pub fn event_handler(mut self, handler: Arc<dyn AgentEventHandler>) -> Self {
        self.event_handler = Some(handler);
        self
    }

    /// Attach a long-term memory store
    pub fn memory(mut self, memory: Arc<dyn Memory>) -> Self {
        self.memory = Some(memory);
        self
    }

    /// Set how many memories are recalled into a new run
    pub fn recall_limit(mut self, limit: usize) -> Self {
        self.config.recall_limit = limit;
        self
    }

    /// Build the agent
    ///
    /// Fails when no gateway is set, the configuration is invalid or the
    /// system prompt template does not render.
    pub fn build(self) -> Result<ReactAgent> {
        let gateway = self
            .gateway
            .ok_or_else(|| Error::InitializationFailed("Gateway not set".to_string()))?;
        self.config.validate()?;

        let parser = ReplyParser::new()
            .map_err(|e| Error::InitializationFailed(format!("Reply grammar: {e}")))?;
        let system_prompt = render_system_prompt(
            self.config.system_template.as_deref(),
            &self.config.instructions,
            &self.tools,
        )
        .map_err(|e| Error::Configuration(format!("System prompt template: {e}")))?;

        debug!(
            agent = %self.config.name,
            tools = ?self.tools.names(),
            "Agent built"
        );

        Ok(ReactAgent {
            config: self.config,
            gateway,
            tools: self.tools,
            parser,
            system_prompt,
            event_handler: self
                .event_handler
                .unwrap_or_else(|| Arc::new(NoOpEventHandler)),
            memory: self.memory,
        })
    }
}

impl Default for ReactAgentBuilder {
    fn default() -> Self {
        Self::new()
    }
}
