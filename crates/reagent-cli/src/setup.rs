//! Building gateways, agents and the team from settings

use anyhow::{Context, Result, bail};
use reagent_core::{Agent, InMemoryStore, Memory};
use reagent_llm::{Gateway, ScriptedGateway};
use reagent_llm::providers::{OpenAIConfig, OpenAIGateway};
use reagent_runtime::{AgentConfig, AgentEventHandler, ReactAgent, RetryPolicy};
use reagent_team::Team;
use reagent_tools::{ToolRegistry, builtin_registry, register_memory_tool};
use reagent_utils::{AgentSettings, GatewaySettings, Settings};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// Canned model replies for offline runs
///
/// Either one list shared by every agent, consumed in call order, or one
/// list per agent name.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Script {
    Shared(Vec<String>),
    PerAgent(HashMap<String, Vec<String>>),
}

impl Script {
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read script {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse script {}", path.display()))
    }
}

/// Where agents get their gateway from
pub enum GatewaySource {
    Live(Arc<dyn Gateway>),
    Shared(Arc<dyn Gateway>),
    PerAgent(HashMap<String, Arc<dyn Gateway>>),
}

impl GatewaySource {
    /// Replay a script
    pub fn scripted(script: Script) -> Self {
        match script {
            Script::Shared(replies) => Self::Shared(Arc::new(ScriptedGateway::from_replies(replies))),
            Script::PerAgent(map) => Self::PerAgent(
                map.into_iter()
                    .map(|(name, replies)| {
                        let gateway: Arc<dyn Gateway> = Arc::new(ScriptedGateway::from_replies(replies));
                        (name, gateway)
                    })
                    .collect(),
            ),
        }
    }

    /// Connect to the configured OpenAI-compatible API
    pub fn live(settings: &GatewaySettings) -> Result<Self> {
        let Some(api_key) = settings.api_key.as_deref().filter(|k| !k.is_empty()) else {
            bail!("No API key configured; set API_KEY or gateway.apiKey, or pass --script");
        };

        let mut config = OpenAIConfig::new(api_key).with_timeout(settings.timeout_secs);
        if let Some(base) = &settings.api_base {
            config = config.with_api_base(base);
        }
        if let Some(rpm) = settings.requests_per_minute {
            config = config.with_requests_per_minute(rpm);
        }
        let gateway = OpenAIGateway::with_config(config).context("Failed to create gateway")?;
        Ok(Self::Live(Arc::new(gateway)))
    }

    fn for_agent(&self, name: &str) -> Result<Arc<dyn Gateway>> {
        match self {
            Self::Live(gateway) | Self::Shared(gateway) => Ok(Arc::clone(gateway)),
            Self::PerAgent(map) => map
                .get(name)
                .cloned()
                .with_context(|| format!("Script has no replies for agent '{name}'")),
        }
    }
}

/// Built-in tools, plus the memory tool and its store when memory is on
pub fn tool_registry(settings: &Settings) -> Result<(ToolRegistry, Option<Arc<dyn Memory>>)> {
    let mut tools = builtin_registry().context("Failed to register built-in tools")?;
    if !settings.runtime.memory {
        return Ok((tools, None));
    }

    let memory: Arc<dyn Memory> = Arc::new(InMemoryStore::new());
    register_memory_tool(&mut tools, Arc::clone(&memory)).context("Failed to register the memory tool")?;
    debug!(backend = memory.name(), "Memory enabled");
    Ok((tools, Some(memory)))
}

/// Agent configuration from runtime defaults and per-agent overrides
pub fn agent_config(settings: &Settings, agent: &AgentSettings) -> AgentConfig {
    let defaults = AgentConfig::default();
    let instructions = if agent.instructions.trim().is_empty() {
        defaults.instructions.clone()
    } else {
        agent.instructions.clone()
    };

    AgentConfig {
        name: agent.name.clone(),
        instructions,
        max_steps: agent.max_steps.unwrap_or(settings.runtime.max_steps),
        keywords: agent.keywords.clone(),
        model: agent.model.clone().unwrap_or_else(|| settings.gateway.model.clone()),
        max_tokens: settings.gateway.max_tokens,
        temperature: settings.gateway.temperature,
        gateway_timeout: settings.runtime.gateway_timeout(),
        tool_timeout: settings.runtime.tool_timeout(),
        retry: RetryPolicy {
            max_attempts: settings.runtime.max_attempts,
            ..RetryPolicy::default()
        },
        recall_limit: settings.runtime.recall_limit,
        ..defaults
    }
}

/// Build the configured team
pub fn build_team(
    settings: &Settings,
    tools: &ToolRegistry,
    gateways: &GatewaySource,
    memory: Option<&Arc<dyn Memory>>,
    events: Arc<dyn AgentEventHandler>,
) -> Result<Team> {
    if settings.team.agents.is_empty() {
        bail!("Settings declare no agents");
    }

    let mut builder = Team::builder(settings.team.name.as_str()).routing(settings.team.routing);
    for agent_settings in &settings.team.agents {
        let allowed = agent_settings.tools.select(tools.names());
        let agent_tools = tools
            .subset(&allowed)
            .with_context(|| format!("Tools for agent '{}'", agent_settings.name))?;
        debug!(agent = %agent_settings.name, tools = ?allowed, "Tools selected");

        let mut agent = ReactAgent::builder()
            .config(agent_config(settings, agent_settings))
            .gateway(gateways.for_agent(&agent_settings.name)?)
            .tools(Arc::new(agent_tools))
            .event_handler(Arc::clone(&events));
        if let Some(memory) = memory {
            agent = agent.memory(Arc::clone(memory));
        }
        let agent = agent
            .build()
            .with_context(|| format!("Failed to build agent '{}'", agent_settings.name))?;

        let agent: Arc<dyn Agent> = Arc::new(agent);
        builder = builder.add_agent(agent);
    }

    let team = builder.build().context("Failed to build team")?;
    info!(team = %team.name(), routing = %team.routing(), roles = ?team.roles(), "Team ready");
    Ok(team)
}
