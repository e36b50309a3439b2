//! Settings file loading
//!
//! Settings are a JSON document describing the gateway, runtime defaults and
//! the team to run. String values may reference environment variables with
//! `${VAR}` or `$VAR`; `API_KEY`, `BASE_URL` and `MODEL_NAME` override the
//! gateway section when set.
//!
//! # Example
//!
//! ```json
//! {
//!   "gateway": {"apiBase": "https://api.siliconflow.cn/v1", "apiKey": "${API_KEY}"},
//!   "runtime": {"maxSteps": 5, "memory": true, "recallLimit": 3},
//!   "team": {
//!     "name": "travel",
//!     "routing": {"type": "fixed_order"},
//!     "agents": [
//!       {"name": "planner", "instructions": "Plan the trip.", "tools": {"allow": ["get_weather"]}},
//!       {"name": "reviewer", "instructions": "Check the plan.", "tools": {"allow": "*", "deny": ["fetch_web_content"]}}
//!     ]
//!   }
//! }
//! ```

use crate::error::{ConfigError, Result};
use reagent_team::RoutingPolicy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

/// Environment variable overriding the gateway API key
pub const ENV_API_KEY: &str = "API_KEY";
/// Environment variable overriding the gateway base URL
pub const ENV_BASE_URL: &str = "BASE_URL";
/// Environment variable overriding the model name
pub const ENV_MODEL_NAME: &str = "MODEL_NAME";

/// Root settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    /// Language-model gateway
    #[serde(default)]
    pub gateway: GatewaySettings,

    /// Defaults applied to every agent
    #[serde(default)]
    pub runtime: RuntimeSettings,

    /// Team to run
    #[serde(default)]
    pub team: TeamSettings,
}

/// Gateway settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewaySettings {
    /// Base URL of the OpenAI-compatible API
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_base: Option<String>,

    /// API key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Model name
    #[serde(default = "default_model")]
    pub model: String,

    /// HTTP timeout in seconds
    #[serde(default = "default_http_timeout")]
    pub timeout_secs: u64,

    /// Client-side rate limit
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requests_per_minute: Option<u32>,

    /// Max tokens per completion
    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,

    /// Sampling temperature
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self {
            api_base: None,
            api_key: None,
            model: default_model(),
            timeout_secs: default_http_timeout(),
            requests_per_minute: None,
            max_tokens: default_max_tokens(),
            temperature: None,
        }
    }
}

/// Runtime defaults for every agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeSettings {
    /// Tool steps per run
    #[serde(default = "default_max_steps")]
    pub max_steps: usize,

    /// Deadline for one gateway call, in seconds
    #[serde(default = "default_gateway_timeout")]
    pub gateway_timeout_secs: u64,

    /// Deadline for one tool call, in seconds
    #[serde(default = "default_tool_timeout")]
    pub tool_timeout_secs: u64,

    /// Gateway attempts, including the first one
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Share one memory store between the agents and offer the memory tool
    #[serde(default)]
    pub memory: bool,

    /// Memories recalled into each run when memory is on
    #[serde(default = "default_recall_limit")]
    pub recall_limit: usize,
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self {
            max_steps: default_max_steps(),
            gateway_timeout_secs: default_gateway_timeout(),
            tool_timeout_secs: default_tool_timeout(),
            max_attempts: default_max_attempts(),
            memory: false,
            recall_limit: default_recall_limit(),
        }
    }
}

impl RuntimeSettings {
    /// Gateway deadline as a duration
    pub fn gateway_timeout(&self) -> Duration {
        Duration::from_secs(self.gateway_timeout_secs)
    }

    /// Tool deadline as a duration
    pub fn tool_timeout(&self) -> Duration {
        Duration::from_secs(self.tool_timeout_secs)
    }
}

/// Team settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamSettings {
    /// Team name
    #[serde(default = "default_team_name")]
    pub name: String,

    /// Routing policy
    #[serde(default)]
    pub routing: RoutingPolicy,

    /// Agents in declaration order
    #[serde(default)]
    pub agents: Vec<AgentSettings>,
}

impl Default for TeamSettings {
    fn default() -> Self {
        Self {
            name: default_team_name(),
            routing: RoutingPolicy::default(),
            agents: Vec::new(),
        }
    }
}

/// One agent of the team
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentSettings {
    /// Agent name, also its role
    pub name: String,

    /// Instructions placed in the system prompt
    #[serde(default)]
    pub instructions: String,

    /// Routing keywords
    #[serde(default)]
    pub keywords: Vec<String>,

    /// Step budget overriding the runtime default
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_steps: Option<usize>,

    /// Model overriding the gateway default
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    /// Which built-in tools the agent gets
    #[serde(default)]
    pub tools: ToolFilter,
}

/// Tool allow/deny filter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolFilter {
    /// Allowed tools ("*" for all, or a list of names)
    #[serde(default = "default_allow_all")]
    pub allow: ToolPattern,

    /// Denied tools (overrides the allow list)
    #[serde(default)]
    pub deny: Vec<String>,
}

impl Default for ToolFilter {
    fn default() -> Self {
        Self {
            allow: default_allow_all(),
            deny: Vec::new(),
        }
    }
}

impl ToolFilter {
    /// Check if a tool passes the filter; the deny list wins
    pub fn includes(&self, tool: &str) -> bool {
        if self.deny.iter().any(|d| d == tool) {
            return false;
        }
        match &self.allow {
            ToolPattern::All(pattern) => pattern == "*",
            ToolPattern::List(allowed) => allowed.iter().any(|a| a == tool),
        }
    }

    /// Names from `available` that pass the filter, in the given order
    pub fn select<'a>(&self, available: impl IntoIterator<Item = &'a str>) -> Vec<&'a str> {
        available.into_iter().filter(|t| self.includes(t)).collect()
    }
}

/// Tool pattern: `"*"` or a list of names
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ToolPattern {
    /// Wildcard
    All(String),
    /// Explicit names
    List(Vec<String>),
}

fn default_model() -> String {
    "Qwen/Qwen3-8B".to_string()
}

fn default_http_timeout() -> u64 {
    120
}

fn default_max_tokens() -> usize {
    2048
}

fn default_max_steps() -> usize {
    5
}

fn default_gateway_timeout() -> u64 {
    60
}

fn default_tool_timeout() -> u64 {
    30
}

fn default_max_attempts() -> u32 {
    3
}

fn default_recall_limit() -> usize {
    3
}

fn default_team_name() -> String {
    "team".to_string()
}

fn default_allow_all() -> ToolPattern {
    ToolPattern::All("*".to_string())
}

impl Settings {
    /// Load settings from a file
    ///
    /// Environment references are expanded and the `API_KEY`, `BASE_URL`
    /// and `MODEL_NAME` overrides applied before validation.
    ///
    /// ```no_run
    /// # use reagent_utils::Settings;
    /// let settings = Settings::from_file("reagent.json")?;
    /// # Ok::<(), reagent_utils::ConfigError>(())
    /// ```
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&content)
    }

    /// Parse settings from a JSON string, reading the process environment
    pub fn from_json(json: &str) -> Result<Self> {
        Self::from_json_with(json, |name| std::env::var(name).ok())
    }

    /// Parse settings from a JSON string with a custom variable lookup
    pub fn from_json_with(json: &str, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut settings: Settings = serde_json::from_str(json)?;
        settings.resolve_env_vars(&lookup)?;
        settings.apply_env_overrides(&lookup);
        settings.validate()?;
        Ok(settings)
    }

    /// Expand variable references in the string-valued settings
    fn resolve_env_vars(&mut self, lookup: &impl Fn(&str) -> Option<String>) -> Result<()> {
        let gateway = &mut self.gateway;
        for value in [&mut gateway.api_base, &mut gateway.api_key].into_iter().flatten() {
            *value = resolve_env_with(value, lookup)?;
        }
        gateway.model = resolve_env_with(&gateway.model, lookup)?;

        for agent in &mut self.team.agents {
            if let Some(model) = agent.model.as_mut() {
                *model = resolve_env_with(model, lookup)?;
            }
        }
        Ok(())
    }

    /// Apply `API_KEY`, `BASE_URL` and `MODEL_NAME` from the environment
    fn apply_env_overrides(&mut self, lookup: &impl Fn(&str) -> Option<String>) {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(key) = non_empty(ENV_API_KEY) {
            self.gateway.api_key = Some(key);
        }
        if let Some(base) = non_empty(ENV_BASE_URL) {
            self.gateway.api_base = Some(base);
        }
        if let Some(model) = non_empty(ENV_MODEL_NAME) {
            self.gateway.model = model;
        }
    }

    /// Check the settings are usable
    pub fn validate(&self) -> Result<()> {
        if self.runtime.max_steps == 0 {
            return Err(ConfigError::Invalid("runtime.maxSteps must be at least 1".into()));
        }
        if self.runtime.max_attempts == 0 {
            return Err(ConfigError::Invalid("runtime.maxAttempts must be at least 1".into()));
        }

        let mut seen = HashSet::new();
        for agent in &self.team.agents {
            if agent.name.trim().is_empty() {
                return Err(ConfigError::Invalid("agent name must not be empty".into()));
            }
            if !seen.insert(agent.name.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "agent '{}' is declared twice",
                    agent.name
                )));
            }
            if agent.max_steps == Some(0) {
                return Err(ConfigError::Invalid(format!(
                    "agent '{}': maxSteps must be at least 1",
                    agent.name
                )));
            }
        }
        Ok(())
    }

    /// Serialize the settings as pretty JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Resolve environment variable references in a string
///
/// Supports `${VAR}` and `$VAR` syntax; an unset variable is an error.
pub fn resolve_env_string(s: &str) -> Result<String> {
    resolve_env_with(s, &|name: &str| std::env::var(name).ok())
}

fn resolve_env_with(s: &str, lookup: &impl Fn(&str) -> Option<String>) -> Result<String> {
    let pattern = Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}|\$([A-Za-z_][A-Za-z0-9_]*)")
        .map_err(|e| ConfigError::InvalidPattern(e.to_string()))?;

    let mut result = String::with_capacity(s.len());
    let mut last = 0;
    for caps in pattern.captures_iter(s) {
        let Some(whole) = caps.get(0) else { continue };
        let Some(name) = caps.get(1).or_else(|| caps.get(2)) else {
            continue;
        };
        let value = lookup(name.as_str())
            .ok_or_else(|| ConfigError::EnvVarNotFound(name.as_str().to_string()))?;
        result.push_str(&s[last..whole.start()]);
        result.push_str(&value);
        last = whole.end();
    }
    result.push_str(&s[last..]);
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name: &str| vars.get(name).cloned()
    }

    const SAMPLE: &str = r#"{
        "gateway": {"apiBase": "https://api.example.com/v1", "apiKey": "${SECRET}", "requestsPerMinute": 30},
        "runtime": {"maxSteps": 3},
        "team": {
            "name": "travel",
            "routing": {"type": "dispatch_by_keyword", "require_unique": true},
            "agents": [
                {"name": "weather", "keywords": ["weather"], "tools": {"allow": ["get_weather"]}},
                {"name": "math", "instructions": "Compute.", "maxSteps": 2, "tools": {"deny": ["fetch_web_content"]}}
            ]
        }
    }"#;

    #[test]
    fn test_memory_settings() {
        let json = r#"{"runtime": {"memory": true, "recallLimit": 5}}"#;
        let settings = Settings::from_json_with(json, |_| None).unwrap();
        assert!(settings.runtime.memory);
        assert_eq!(settings.runtime.recall_limit, 5);
        assert_eq!(settings.runtime.max_steps, RuntimeSettings::default().max_steps);
    }

    #[test]
    fn test_parse_settings() {
        let settings = Settings::from_json_with(SAMPLE, env(&[("SECRET", "sk-1")])).unwrap();

        assert_eq!(settings.gateway.api_key.as_deref(), Some("sk-1"));
        assert_eq!(settings.gateway.requests_per_minute, Some(30));
        assert_eq!(settings.gateway.model, "Qwen/Qwen3-8B");
        assert_eq!(settings.runtime.max_steps, 3);
        assert_eq!(settings.runtime.tool_timeout(), Duration::from_secs(30));
        assert!(!settings.runtime.memory);
        assert_eq!(settings.runtime.recall_limit, 3);
        assert_eq!(
            settings.team.routing,
            RoutingPolicy::DispatchByKeyword { require_unique: true }
        );
        assert_eq!(settings.team.agents.len(), 2);
        assert_eq!(settings.team.agents[1].max_steps, Some(2));
        assert_eq!(settings.team.agents[1].tools.allow, ToolPattern::All("*".into()));
    }

    #[test]
    fn test_missing_variable() {
        let err = Settings::from_json_with(SAMPLE, env(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::EnvVarNotFound(ref v) if v == "SECRET"));
    }

    #[test]
    fn test_env_overrides() {
        let settings = Settings::from_json_with(
            SAMPLE,
            env(&[
                ("SECRET", "sk-1"),
                ("API_KEY", "sk-2"),
                ("BASE_URL", "http://localhost:1234/v1"),
                ("MODEL_NAME", "local-model"),
            ]),
        )
        .unwrap();

        assert_eq!(settings.gateway.api_key.as_deref(), Some("sk-2"));
        assert_eq!(settings.gateway.api_base.as_deref(), Some("http://localhost:1234/v1"));
        assert_eq!(settings.gateway.model, "local-model");
    }

    #[test]
    fn test_defaults_for_empty_document() {
        let settings = Settings::from_json_with("{}", env(&[])).unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.team.routing, RoutingPolicy::FixedOrder);
    }

    #[test]
    fn test_validation() {
        let dup = r#"{"team": {"agents": [{"name": "a"}, {"name": "a"}]}}"#;
        assert!(matches!(
            Settings::from_json_with(dup, env(&[])),
            Err(ConfigError::Invalid(_))
        ));

        let zero = r#"{"runtime": {"maxSteps": 0}}"#;
        assert!(matches!(
            Settings::from_json_with(zero, env(&[])),
            Err(ConfigError::Invalid(_))
        ));

        assert!(matches!(
            Settings::from_json_with("{not json", env(&[])),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_env_var_resolution() {
        let lookup = env(&[("A", "1"), ("B", "two")]);
        assert_eq!(resolve_env_with("${A}", &lookup).unwrap(), "1");
        assert_eq!(resolve_env_with("x_${A}_y", &lookup).unwrap(), "x_1_y");
        assert_eq!(resolve_env_with("$B/$A", &lookup).unwrap(), "two/1");
        assert_eq!(resolve_env_with("no refs", &lookup).unwrap(), "no refs");
        assert!(resolve_env_with("$MISSING", &lookup).is_err());
    }

    #[test]
    fn test_tool_filtering() {
        let filter = ToolFilter {
            allow: ToolPattern::List(vec!["echo".into(), "calculate".into()]),
            deny: vec!["calculate".into()],
        };
        assert!(filter.includes("echo"));
        assert!(!filter.includes("calculate"));
        assert!(!filter.includes("get_weather"));

        let wildcard = ToolFilter {
            deny: vec!["fetch_web_content".into()],
            ..ToolFilter::default()
        };
        assert_eq!(
            wildcard.select(["echo", "fetch_web_content", "get_weather"]),
            ["echo", "get_weather"]
        );
    }
}
