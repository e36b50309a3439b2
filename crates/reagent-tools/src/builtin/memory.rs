//! Tool giving the model direct access to a memory store

use crate::{Arguments, ParamType, ParameterSchema, ToolFailure, ToolHandler, ToolSpec};
use async_trait::async_trait;
use reagent_core::{Error, Memory, MemoryItem};
use serde_json::{Map, Value, json};
use std::sync::Arc;
use tracing::debug;

/// Entries returned by `search` when no limit is given
const DEFAULT_SEARCH_LIMIT: usize = 5;

const ACTIONS: &str = "add, search, list, update, remove, clear, stats";

struct MemoryTool {
    memory: Arc<dyn Memory>,
}

fn failure(err: Error) -> ToolFailure {
    match err {
        Error::UnknownMemory(_) => ToolFailure::InvalidInput(err.to_string()),
        other => ToolFailure::Failed(other.to_string()),
    }
}

fn render(items: &[MemoryItem]) -> String {
    items
        .iter()
        .map(|item| format!("- [{}] {}", item.id, item.content))
        .collect::<Vec<_>>()
        .join("\n")
}

impl MemoryTool {
    async fn search(&self, args: &Arguments) -> Result<String, ToolFailure> {
        let query = args.opt_str("query").or_else(|| args.opt_str("content")).unwrap_or_default();
        let limit = args
            .get("limit")
            .and_then(Value::as_u64)
            .and_then(|n| usize::try_from(n).ok())
            .unwrap_or(DEFAULT_SEARCH_LIMIT);

        let found = self.memory.retrieve(query, limit).await.map_err(failure)?;
        if found.is_empty() {
            return Ok(format!("No memories match '{query}'"));
        }
        Ok(render(&found))
    }
}

#[async_trait]
impl ToolHandler for MemoryTool {
    async fn call(&self, args: &Arguments) -> Result<String, ToolFailure> {
        let action = args.str("action")?.trim().to_lowercase();
        debug!(action = %action, backend = self.memory.name(), "Memory tool call");

        match action.as_str() {
            "add" => {
                let mut metadata = Map::new();
                metadata.insert("source".to_string(), json!("tool"));
                let item = self.memory.add(args.str("content")?, metadata).await.map_err(failure)?;
                Ok(format!("Stored memory {}", item.id))
            }
            "search" => self.search(args).await,
            "list" => {
                let items = self.memory.list().await.map_err(failure)?;
                if items.is_empty() {
                    return Ok("No memories stored".to_string());
                }
                Ok(render(&items))
            }
            "update" => {
                let item = self
                    .memory
                    .update(args.str("memory_id")?, args.str("content")?)
                    .await
                    .map_err(failure)?;
                Ok(format!("Updated memory {}", item.id))
            }
            "remove" => {
                let id = args.str("memory_id")?;
                self.memory.remove(id).await.map_err(failure)?;
                Ok(format!("Removed memory {id}"))
            }
            "clear" => {
                let removed = self.memory.clear().await.map_err(failure)?;
                Ok(format!("Removed {removed} memories"))
            }
            "stats" => {
                let stats = self.memory.stats().await.map_err(failure)?;
                Ok(format!("{} memories ({})", stats.count, stats.backend))
            }
            other => Err(ToolFailure::InvalidInput(format!(
                "unknown action '{other}'; expected one of {ACTIONS}"
            ))),
        }
    }
}

/// `memory` tool over a shared store
pub fn tool(memory: Arc<dyn Memory>) -> ToolSpec {
    ToolSpec::new(
        "memory",
        "Store and recall long-term facts across tasks",
        ParameterSchema::new()
            .required("action", ParamType::String, "One of: add, search, list, update, remove, clear, stats")
            .optional("content", ParamType::String, "Text to store (add, update)")
            .optional("query", ParamType::String, "What to look for (search)")
            .optional("memory_id", ParamType::String, "Target memory (update, remove)")
            .optional("limit", ParamType::Integer, "Maximum search results"),
        MemoryTool { memory },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ToolRegistry;
    use reagent_core::InMemoryStore;

    fn registry() -> (ToolRegistry, Arc<InMemoryStore>) {
        let store = Arc::new(InMemoryStore::new());
        let registry = ToolRegistry::new().with_tool(tool(store.clone())).unwrap();
        (registry, store)
    }

    async fn call(registry: &ToolRegistry, args: Value) -> String {
        registry.invoke("memory", args).await.unwrap().text
    }

    #[tokio::test]
    async fn test_add_then_search() {
        let (registry, store) = registry();

        let text = call(&registry, json!({"action": "add", "content": "Alice likes green tea"})).await;
        assert_eq!(text, "Stored memory mem-1");
        call(&registry, json!({"action": "add", "content": "Bob drinks coffee"})).await;

        let text = call(&registry, json!({"action": "search", "query": "tea", "limit": 1})).await;
        assert_eq!(text, "- [mem-1] Alice likes green tea");

        let text = call(&registry, json!({"action": "search", "query": "juice"})).await;
        assert_eq!(text, "No memories match 'juice'");

        let stored = store.list().await.unwrap();
        assert_eq!(stored[0].metadata["source"], "tool");
    }

    #[tokio::test]
    async fn test_update_remove_clear() {
        let (registry, _store) = registry();
        call(&registry, json!({"action": "add", "content": "first"})).await;
        call(&registry, json!({"action": "add", "content": "second"})).await;

        let text = call(&registry, json!({"action": "update", "memory_id": "mem-1", "content": "changed"})).await;
        assert_eq!(text, "Updated memory mem-1");
        assert_eq!(
            call(&registry, json!({"action": "list"})).await,
            "- [mem-1] changed\n- [mem-2] second"
        );

        assert_eq!(
            call(&registry, json!({"action": "remove", "memory_id": "mem-2"})).await,
            "Removed memory mem-2"
        );
        assert_eq!(call(&registry, json!({"action": "stats"})).await, "1 memories (in_memory)");
        assert_eq!(call(&registry, json!({"action": "clear"})).await, "Removed 1 memories");
        assert_eq!(call(&registry, json!({"action": "list"})).await, "No memories stored");
    }

    #[tokio::test]
    async fn test_failures_become_error_output() {
        let (registry, _store) = registry();

        let output = registry
            .invoke("memory", json!({"action": "remove", "memory_id": "mem-7"}))
            .await
            .unwrap();
        assert!(output.is_error);
        assert_eq!(output.text, "ERROR: invalid input: Unknown memory: mem-7");

        let output = registry.invoke("memory", json!({"action": "add"})).await.unwrap();
        assert!(output.is_error);
        assert!(output.text.contains("missing string argument 'content'"));

        let output = registry.invoke("memory", json!({"action": "forget"})).await.unwrap();
        assert!(output.is_error);
        assert!(output.text.contains("unknown action 'forget'"));
    }
}
