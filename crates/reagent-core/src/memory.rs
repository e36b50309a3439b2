//! Long-term memory boundary
//!
//! A [`Memory`] keeps short facts across runs. Agents recall the entries most
//! relevant to a new task and store what they concluded; the model can also
//! manage entries directly through the memory tool. [`InMemoryStore`] is the
//! process-local implementation.

use crate::{Error, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;
use tokio::sync::RwLock;

/// One stored memory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryItem {
    /// Store-assigned identifier
    pub id: String,
    /// Remembered text
    pub content: String,
    /// Free-form annotations such as the agent or run that stored it
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub metadata: Map<String, Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Summary of a memory store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryStats {
    /// Number of stored memories
    pub count: usize,
    /// Store implementation name
    pub backend: String,
}

/// Storage for long-term memories
///
/// Implementations are shared between agents behind an `Arc` and must be
/// safe to call concurrently.
#[async_trait]
pub trait Memory: Send + Sync {
    /// Store a new memory; empty content is rejected with [`Error::Memory`]
    async fn add(&self, content: &str, metadata: Map<String, Value>) -> Result<MemoryItem>;

    /// Memories relevant to `query`, most relevant first, at most `limit`
    async fn retrieve(&self, query: &str, limit: usize) -> Result<Vec<MemoryItem>>;

    /// Replace the content of a memory
    async fn update(&self, id: &str, content: &str) -> Result<MemoryItem>;

    /// Delete a memory; unknown ids fail with [`Error::UnknownMemory`]
    async fn remove(&self, id: &str) -> Result<()>;

    /// Every memory, oldest first
    async fn list(&self) -> Result<Vec<MemoryItem>>;

    /// Delete every memory, returning how many were removed
    async fn clear(&self) -> Result<usize>;

    async fn stats(&self) -> Result<MemoryStats>;

    /// Store name (e.g., "in_memory")
    fn name(&self) -> &str;
}

#[derive(Debug, Default)]
struct StoreState {
    items: Vec<MemoryItem>,
    next_id: u64,
}

/// Process-local memory store
///
/// Retrieval ranks entries by word overlap with the query, so it needs no
/// embedding model.
///
/// # Example
///
/// ```
/// use reagent_core::{InMemoryStore, Memory};
///
/// # tokio_test::block_on(async {
/// let store = InMemoryStore::new();
/// store.add("The user prefers window seats", Default::default()).await?;
///
/// let found = store.retrieve("seats on the plane", 3).await?;
/// assert_eq!(found[0].content, "The user prefers window seats");
/// # Ok::<(), reagent_core::Error>(())
/// # }).unwrap();
/// ```
#[derive(Debug, Default)]
pub struct InMemoryStore {
    state: RwLock<StoreState>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn words(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Share of query words present in the content; a verbatim match scores 1
#[allow(clippy::cast_precision_loss)]
fn relevance(query: &str, query_words: &HashSet<String>, content: &str) -> f64 {
    if content.to_lowercase().contains(query) {
        return 1.0;
    }
    if query_words.is_empty() {
        return 0.0;
    }
    let content_words = words(content);
    let hits = query_words.intersection(&content_words).count();
    hits as f64 / query_words.len() as f64
}

fn non_empty(content: &str) -> Result<&str> {
    let content = content.trim();
    if content.is_empty() {
        return Err(Error::Memory("memory content must not be empty".to_string()));
    }
    Ok(content)
}

#[async_trait]
impl Memory for InMemoryStore {
    async fn add(&self, content: &str, metadata: Map<String, Value>) -> Result<MemoryItem> {
        let content = non_empty(content)?;
        let mut state = self.state.write().await;
        state.next_id += 1;
        let now = Utc::now();
        let item = MemoryItem {
            id: format!("mem-{}", state.next_id),
            content: content.to_string(),
            metadata,
            created_at: now,
            updated_at: now,
        };
        state.items.push(item.clone());
        Ok(item)
    }

    async fn retrieve(&self, query: &str, limit: usize) -> Result<Vec<MemoryItem>> {
        let state = self.state.read().await;
        let query = query.trim().to_lowercase();

        // Without a query the newest entries are the most relevant
        if query.is_empty() {
            return Ok(state.items.iter().rev().take(limit).cloned().collect());
        }

        let query_words = words(&query);
        let mut scored: Vec<(f64, &MemoryItem)> = state
            .items
            .iter()
            .map(|item| (relevance(&query, &query_words, &item.content), item))
            .filter(|(score, _)| *score > 0.0)
            .collect();
        scored.sort_by(|a, b| {
            b.0.total_cmp(&a.0)
                .then_with(|| b.1.updated_at.cmp(&a.1.updated_at))
        });
        Ok(scored.into_iter().take(limit).map(|(_, item)| item.clone()).collect())
    }

    async fn update(&self, id: &str, content: &str) -> Result<MemoryItem> {
        let content = non_empty(content)?;
        let mut state = self.state.write().await;
        let item = state
            .items
            .iter_mut()
            .find(|item| item.id == id)
            .ok_or_else(|| Error::UnknownMemory(id.to_string()))?;
        item.content = content.to_string();
        item.updated_at = Utc::now();
        Ok(item.clone())
    }

    async fn remove(&self, id: &str) -> Result<()> {
        let mut state = self.state.write().await;
        let before = state.items.len();
        state.items.retain(|item| item.id != id);
        if state.items.len() == before {
            return Err(Error::UnknownMemory(id.to_string()));
        }
        Ok(())
    }

    async fn list(&self) -> Result<Vec<MemoryItem>> {
        Ok(self.state.read().await.items.clone())
    }

    async fn clear(&self) -> Result<usize> {
        let mut state = self.state.write().await;
        let removed = state.items.len();
        state.items.clear();
        Ok(removed)
    }

    async fn stats(&self) -> Result<MemoryStats> {
        Ok(MemoryStats {
            count: self.state.read().await.items.len(),
            backend: self.name().to_string(),
        })
    }

    fn name(&self) -> &'static str {
        "in_memory"
    }
}
