//! OpenAI-compatible gateway implementation
//!
//! Talks to any server exposing the `/chat/completions` endpoint (OpenAI,
//! vLLM, LM Studio, SiliconFlow, Ollama's compatibility layer, ...).
//!
//! # Example
//!
//! ```no_run
//! use reagent_core::Message;
//! use reagent_llm::providers::{OpenAIConfig, OpenAIGateway};
//! use reagent_llm::{CompletionRequest, Gateway};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = OpenAIConfig::new("sk-...")
//!         .with_api_base("http://localhost:1234/v1")
//!         .with_requests_per_minute(30);
//!     let gateway = OpenAIGateway::with_config(config)?;
//!
//!     let request = CompletionRequest::builder("Qwen/Qwen3-8B")
//!         .add_message(Message::user("1+1=?"))
//!         .build();
//!
//!     let completion = gateway.complete(request).await?;
//!     println!("{}", completion.text);
//!     Ok(())
//! }
//! ```

use crate::{Completion, CompletionRequest, Gateway, GatewayError, Result, TokenUsage};
use async_trait::async_trait;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use reagent_core::{Message, Role};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::num::NonZeroU32;
use std::time::Duration;
use tracing::{debug, instrument};

const DEFAULT_OPENAI_API_BASE: &str = "https://api.openai.com/v1";
const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Prefix used when an observation is sent to a chat API that has no
/// dedicated role for it
pub const OBSERVATION_PREFIX: &str = "Observation: ";

/// Configuration for the OpenAI-compatible gateway
#[derive(Debug, Clone)]
pub struct OpenAIConfig {
    /// API key for authentication
    pub api_key: String,

    /// Base URL of the API (default: "https://api.openai.com/v1")
    pub api_base: String,

    /// Request timeout in seconds (default: 120)
    pub timeout_secs: u64,

    /// Client-side rate limit; `None` disables limiting
    pub requests_per_minute: Option<u32>,
}

impl OpenAIConfig {
    /// Create a new config with the given API key and default settings
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            ..Self::default()
        }
    }

    /// Create config from environment variables
    ///
    /// Reads the key from `API_KEY` (falling back to `OPENAI_API_KEY`) and the
    /// base URL from `BASE_URL` (falling back to `OPENAI_API_BASE`).
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("API_KEY")
            .or_else(|_| std::env::var("OPENAI_API_KEY"))
            .map_err(|_| {
                GatewayError::Configuration(
                    "API_KEY environment variable not set".to_string(),
                )
            })?;

        let api_base = std::env::var("BASE_URL")
            .or_else(|_| std::env::var("OPENAI_API_BASE"))
            .unwrap_or_else(|_| DEFAULT_OPENAI_API_BASE.to_string());

        Ok(Self {
            api_key,
            api_base,
            ..Self::default()
        })
    }

    /// Set custom API base URL
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    /// Set request timeout in seconds
    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    /// Limit outgoing requests per minute
    pub fn with_requests_per_minute(mut self, rpm: u32) -> Self {
        self.requests_per_minute = Some(rpm);
        self
    }
}

impl Default for OpenAIConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_base: DEFAULT_OPENAI_API_BASE.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            requests_per_minute: None,
        }
    }
}

/// Gateway for OpenAI-compatible chat completion APIs
pub struct OpenAIGateway {
    client: Client,
    config: OpenAIConfig,
    limiter: Option<DefaultDirectRateLimiter>,
}

impl OpenAIGateway {
    /// Create a new gateway with custom configuration
    pub fn with_config(config: OpenAIConfig) -> Result<Self> {
        if config.api_base.trim().is_empty() {
            return Err(GatewayError::Configuration(
                "API base URL must not be empty".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        let limiter = config
            .requests_per_minute
            .and_then(NonZeroU32::new)
            .map(|rpm| RateLimiter::direct(Quota::per_minute(rpm)));

        Ok(Self {
            client,
            config,
            limiter,
        })
    }

    /// Create a new gateway with API key and default settings
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Self::with_config(OpenAIConfig::new(api_key))
    }

    /// Create a gateway from environment variables
    pub fn from_env() -> Result<Self> {
        Self::with_config(OpenAIConfig::from_env()?)
    }

    /// Get the current configuration
    pub fn config(&self) -> &OpenAIConfig {
        &self.config
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.config.api_base.trim_end_matches('/'))
    }
}

#[async_trait]
impl Gateway for OpenAIGateway {
    #[instrument(skip(self, request), fields(model = %request.model, api_base = %self.config.api_base))]
    async fn complete(&self, request: CompletionRequest) -> Result<Completion> {
        let body = ChatRequest {
            model: request.model.clone(),
            messages: request.messages.iter().map(convert_message).collect(),
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            stop: request.stop_sequences,
        };

        debug!(messages = body.messages.len(), "Sending chat completion request");

        let response = self
            .client
            .post(self.endpoint())
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await?;

            return Err(match status.as_u16() {
                401 | 403 => GatewayError::AuthenticationFailed,
                429 => GatewayError::RateLimited(error_text),
                400 => GatewayError::InvalidRequest(error_text),
                404 => GatewayError::ModelNotFound(request.model),
                code if code >= 500 => GatewayError::Server {
                    status: code,
                    body: error_text,
                },
                _ => GatewayError::InvalidRequest(format!("HTTP {status}: {error_text}")),
            });
        }

        let chat: ChatResponse = response.json().await.map_err(|e| {
            GatewayError::UnexpectedResponse(format!("Failed to parse response: {e}"))
        })?;

        let choice = chat.choices.into_iter().next().ok_or_else(|| {
            GatewayError::UnexpectedResponse("No choices in response".to_string())
        })?;

        let usage = chat.usage.map(|u| TokenUsage {
            input_tokens: u.prompt_tokens,
            output_tokens: u.completion_tokens,
        });

        debug!(
            finish_reason = ?choice.finish_reason,
            input_tokens = ?usage.map(|u| u.input_tokens),
            output_tokens = ?usage.map(|u| u.output_tokens),
            "Received chat completion"
        );

        Ok(Completion {
            text: choice.message.content.unwrap_or_default(),
            finish_reason: choice.finish_reason,
            usage,
        })
    }

    /// Wait for a rate-limit permit; `complete` itself never waits
    async fn ready(&self) {
        if let Some(limiter) = &self.limiter {
            limiter.until_ready().await;
        }
    }

    fn name(&self) -> &'static str {
        "openai"
    }
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stop: Option<Vec<String>>,
}

#[derive(Debug, Serialize, PartialEq)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    prompt_tokens: usize,
    completion_tokens: usize,
}

/// Map a conversation message onto the chat API roles
///
/// Chat APIs only know system/user/assistant, so observations are sent as
/// user messages with a recognisable prefix.
fn convert_message(msg: &Message) -> ChatMessage {
    match msg.role {
        Role::System => ChatMessage {
            role: "system",
            content: msg.content.clone(),
        },
        Role::User => ChatMessage {
            role: "user",
            content: msg.content.clone(),
        },
        Role::Assistant => ChatMessage {
            role: "assistant",
            content: msg.content.clone(),
        },
        Role::Observation => ChatMessage {
            role: "user",
            content: format!("{OBSERVATION_PREFIX}{}", msg.content),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gateway_creation() {
        let gateway = OpenAIGateway::new("test-key").unwrap();
        assert_eq!(gateway.name(), "openai");
        assert_eq!(gateway.config().api_key, "test-key");
        assert_eq!(gateway.config().api_base, "https://api.openai.com/v1");
        assert!(gateway.limiter.is_none());
    }

    #[test]
    fn test_custom_config() {
        let config = OpenAIConfig::new("test-key")
            .with_api_base("http://localhost:1234/v1/")
            .with_timeout(30)
            .with_requests_per_minute(10);

        let gateway = OpenAIGateway::with_config(config).unwrap();
        assert_eq!(gateway.config().timeout_secs, 30);
        assert!(gateway.limiter.is_some());
        assert_eq!(gateway.endpoint(), "http://localhost:1234/v1/chat/completions");
    }

    #[test]
    fn test_zero_rpm_disables_limiter() {
        let config = OpenAIConfig::new("k").with_requests_per_minute(0);
        let gateway = OpenAIGateway::with_config(config).unwrap();
        assert!(gateway.limiter.is_none());
    }

    #[tokio::test]
    async fn test_ready_waits_for_permit() {
        let gateway = OpenAIGateway::with_config(OpenAIConfig::new("k").with_requests_per_minute(1)).unwrap();
        let wait = Duration::from_millis(50);

        assert!(tokio::time::timeout(wait, gateway.ready()).await.is_ok());
        // the single permit per minute is spent
        assert!(tokio::time::timeout(wait, gateway.ready()).await.is_err());
    }

    #[tokio::test]
    async fn test_unlimited_gateway_is_always_ready() {
        let gateway = OpenAIGateway::new("k").unwrap();
        for _ in 0..3 {
            assert!(tokio::time::timeout(Duration::from_millis(50), gateway.ready()).await.is_ok());
        }
    }

    #[test]
    fn test_empty_api_base_rejected() {
        let result = OpenAIGateway::with_config(OpenAIConfig::new("k").with_api_base(" "));
        assert!(matches!(result, Err(GatewayError::Configuration(_))));
    }

    #[test]
    fn test_message_conversion() {
        assert_eq!(
            convert_message(&Message::system("rules")),
            ChatMessage {
                role: "system",
                content: "rules".into()
            }
        );
        assert_eq!(convert_message(&Message::assistant("hi")).role, "assistant");

        let obs = convert_message(&Message::observation("42"));
        assert_eq!(obs.role, "user");
        assert_eq!(obs.content, "Observation: 42");
    }

    #[test]
    fn test_response_parsing() {
        let json = r#"{
            "choices": [{"message": {"role": "assistant", "content": "<final_answer>2</final_answer>"}, "finish_reason": "stop"}],
            "usage": {"prompt_tokens": 12, "completion_tokens": 5}
        }"#;
        let response: ChatResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.choices.len(), 1);
        assert_eq!(
            response.choices[0].message.content.as_deref(),
            Some("<final_answer>2</final_answer>")
        );
        assert_eq!(response.usage.unwrap().completion_tokens, 5);
    }

    #[test]
    fn test_response_without_usage() {
        let json = r#"{"choices": [{"message": {"content": null}, "finish_reason": null}]}"#;
        let response: ChatResponse = serde_json::from_str(json).unwrap();
        assert!(response.usage.is_none());
        assert!(response.choices[0].message.content.is_none());
    }
}
