//! Subcommand implementations

use crate::console::ConsoleEvents;
use crate::setup::{GatewaySource, Script, build_team, tool_registry};
use anyhow::{Context, Result, bail};
use chrono::Utc;
use comfy_table::{ContentArrangement, Table, presets::UTF8_FULL};
use reagent_core::{RunStatus, Task};
use reagent_team::{TeamError, TeamResult};
use reagent_tools::{ToolOutput, ToolRegistry, builtin_registry};
use reagent_utils::Settings;
use serde_json::Value;
use std::io::Read;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::info;

pub struct RunOptions<'a> {
    pub config: &'a Path,
    pub task: Option<String>,
    pub context: Option<String>,
    pub script: Option<&'a Path>,
    pub json: bool,
}

pub async fn run(options: RunOptions<'_>) -> Result<ExitCode> {
    let settings = Settings::from_file(options.config)
        .with_context(|| format!("Failed to load settings from {}", options.config.display()))?;

    let gateways = match options.script {
        Some(path) => GatewaySource::scripted(Script::from_file(path)?),
        None => GatewaySource::live(&settings.gateway)?,
    };

    let (tools, memory) = tool_registry(&settings)?;
    let team = build_team(&settings, &tools, &gateways, memory.as_ref(), Arc::new(ConsoleEvents))?;

    let text = match options.task {
        Some(text) => text,
        None => read_stdin()?,
    };
    if text.trim().is_empty() {
        bail!("Task text is empty");
    }

    let mut task = Task::new(text).with_run_id(format!("run-{}", Utc::now().format("%Y%m%d%H%M%S%3f")));
    if let Some(context) = options.context {
        task = task.with_prior_context(context);
    }
    info!(run_id = task.run_id().unwrap_or_default(), "Starting run");

    let outcome = team.run_task(task).await;
    if options.json {
        print_json(&outcome)?;
    } else {
        print_human(&outcome);
    }

    Ok(match outcome {
        Ok(result) if result.status == RunStatus::Done => ExitCode::SUCCESS,
        Ok(_) => ExitCode::from(2),
        Err(_) => ExitCode::FAILURE,
    })
}

fn read_stdin() -> Result<String> {
    let mut text = String::new();
    std::io::stdin()
        .read_to_string(&mut text)
        .context("Failed to read task from stdin")?;
    Ok(text)
}

fn print_json(outcome: &std::result::Result<TeamResult, TeamError>) -> Result<()> {
    let json = match outcome {
        Ok(result) => serde_json::to_string_pretty(result),
        Err(error) => serde_json::to_string_pretty(&serde_json::json!({ "error": error })),
    }
    .context("Failed to serialize result")?;
    println!("{json}");
    Ok(())
}

fn print_human(outcome: &std::result::Result<TeamResult, TeamError>) {
    match outcome {
        Ok(result) => {
            for stage in &result.stages {
                eprintln!(
                    "stage {}: {} ({} steps, {} tool calls)",
                    stage.role,
                    stage.result.status,
                    stage.result.steps,
                    stage.result.tool_calls.len()
                );
            }
            if result.status == RunStatus::Incomplete {
                eprintln!("Step limit reached; showing the partial answer.");
            }
            println!("{}", result.answer_text());
        }
        Err(error) => {
            eprintln!("Run failed: {error}");
            for stage in error.completed() {
                eprintln!("completed stage {}: {}", stage.role, stage.result.answer_text());
            }
        }
    }
}

/// Render the tool catalogue as a table
pub fn tool_table(tools: &ToolRegistry) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["Tool", "Parameters", "Description"]);
    for tool in tools.iter() {
        table.add_row(vec![
            tool.name().to_string(),
            tool.schema().signature(),
            tool.description().to_string(),
        ]);
    }
    table
}

pub fn tools() -> Result<ExitCode> {
    let tools = builtin_registry().context("Failed to register built-in tools")?;
    println!("{}", tool_table(&tools));
    Ok(ExitCode::SUCCESS)
}

/// Parse invoke arguments; text that is not JSON is passed as a string
pub fn parse_invoke_args(raw: Option<&str>) -> Value {
    match raw.map(str::trim) {
        None | Some("") => Value::Null,
        Some(text) => serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string())),
    }
}

async fn invoke_builtin(name: &str, args: Option<&str>) -> Result<ToolOutput> {
    let tools = builtin_registry().context("Failed to register built-in tools")?;
    tools
        .invoke(name, parse_invoke_args(args))
        .await
        .with_context(|| format!("Failed to invoke '{name}'"))
}

pub async fn invoke(name: &str, args: Option<&str>) -> Result<ExitCode> {
    let output = invoke_builtin(name, args).await?;
    info!(tool = name, duration_ms = output.duration_ms(), "Tool finished");
    println!("{}", output.text);
    Ok(if output.is_error { ExitCode::FAILURE } else { ExitCode::SUCCESS })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_invoke_args() {
        assert_eq!(parse_invoke_args(None), Value::Null);
        assert_eq!(parse_invoke_args(Some("  ")), Value::Null);
        assert_eq!(parse_invoke_args(Some(r#"{"text": "hi"}"#)), json!({"text": "hi"}));
        assert_eq!(parse_invoke_args(Some("1 + 1")), json!("1 + 1"));
    }

    #[test]
    fn test_tool_table_lists_builtins() {
        let tools = builtin_registry().unwrap();
        let mut table = tool_table(&tools);
        table.set_content_arrangement(ContentArrangement::Disabled);
        let rendered = table.to_string();
        for name in ["calculate", "echo", "current_time", "fetch_web_content", "get_weather"] {
            assert!(rendered.contains(name), "missing {name}");
        }
    }

    #[tokio::test]
    async fn test_invoke_unknown_tool() {
        let err = invoke_builtin("search", None).await.unwrap_err();
        assert!(err.to_string().contains("search"));
    }

    #[tokio::test]
    async fn test_invoke_calculate() {
        let output = invoke_builtin("calculate", Some("\"2 * 21\"")).await.unwrap();
        assert!(!output.is_error);
        assert_eq!(output.text, "42");
    }
}
