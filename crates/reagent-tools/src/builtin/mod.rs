//! Built-in tools
//!
//! - `calculate`: arithmetic with + - * / and parentheses
//! - `echo`: returns its argument
//! - `current_time`: RFC 3339 timestamp
//! - `fetch_web_content`: reads a page through a text reader service
//! - `get_weather`: one-line weather report
//!
//! The `memory` tool needs a store and is registered separately with
//! [`register_memory_tool`].

pub mod calculate;
pub mod clock;
mod echo;
pub mod http;
pub mod memory;

use crate::{Result, ToolRegistry};
use reagent_core::{Error, Memory};
use std::sync::Arc;
use std::time::Duration;

const HTTP_TIMEOUT_SECS: u64 = 30;

/// Register every built-in tool
///
/// `fetch_web_content` authenticates with `JINA_API_KEY` when it is set.
pub fn register_builtin_tools(registry: &mut ToolRegistry) -> Result<()> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
        .build()
        .map_err(|e| Error::InitializationFailed(format!("HTTP client: {e}")))?;
    let reader_key = std::env::var("JINA_API_KEY").ok().filter(|k| !k.is_empty());

    for spec in [
        calculate::tool(),
        echo::tool(),
        clock::tool(),
        http::fetch_web_content(client.clone(), reader_key),
        http::get_weather(client),
    ] {
        registry.register(spec)?;
    }
    Ok(())
}

/// Register the `memory` tool over a shared store
pub fn register_memory_tool(registry: &mut ToolRegistry, memory: Arc<dyn Memory>) -> Result<()> {
    registry.register(memory::tool(memory))
}

/// Registry holding only the built-in tools
pub fn builtin_registry() -> Result<ToolRegistry> {
    let mut registry = ToolRegistry::new();
    register_builtin_tools(&mut registry)?;
    Ok(registry)
}
