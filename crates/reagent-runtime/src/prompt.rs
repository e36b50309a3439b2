//! System prompt rendering
//!
//! The system prompt is a MiniJinja template receiving `instructions`,
//! `catalogue` (one line per tool) and `tools` (the serialised tool
//! descriptions) as variables.

use minijinja::{Environment, context};
use reagent_tools::ToolRegistry;

/// Default system prompt template
pub const DEFAULT_SYSTEM_TEMPLATE: &str = r"{{ instructions }}

Solve the task step by step. On every turn reply with a short thought followed by exactly one action or the final answer:

<thought>your reasoning</thought>
<action>TOOL_NAME(ARGUMENTS)</action>

or

<thought>your reasoning</thought>
<final_answer>the answer</final_answer>

ARGUMENTS is a JSON object with named parameters, or a single value for tools that take one parameter. After each action you will receive an observation with the tool result. Only use the tools listed below.

Available tools:
{{ catalogue }}";

/// Heading of the system message listing recalled memories
pub const RECALL_HEADER: &str = "Relevant memories from earlier tasks:";

/// Note appended after a reply the parser could not recognise
pub const CORRECTIVE_NOTE: &str = "Your previous reply did not follow the expected format. \
Respond using the expected tags: either <action>TOOL_NAME(ARGUMENTS)</action> \
or <final_answer>ANSWER</final_answer>.";

/// Render a system prompt for an agent
///
/// Uses [`DEFAULT_SYSTEM_TEMPLATE`] unless `template` is given.
pub fn render_system_prompt(
    template: Option<&str>,
    instructions: &str,
    tools: &ToolRegistry,
) -> Result<String, minijinja::Error> {
    let env = Environment::new();
    env.render_str(
        template.unwrap_or(DEFAULT_SYSTEM_TEMPLATE),
        context! {
            instructions => instructions.trim(),
            catalogue => tools.render_catalogue(),
            tools => tools.describe_all(),
        },
    )
}
