//! ReAct reasoning loop for reagent
//!
//! This crate couples a [`Gateway`](reagent_llm::Gateway) with a
//! [`ToolRegistry`](reagent_tools::ToolRegistry) in a think → act → observe
//! cycle:
//!
//! - [`Conversation`]: append-only message log owned by one run
//! - [`ReplyParser`]: turns model text into an action, an answer or a parse failure
//! - [`RetryPolicy`]: bounded exponential backoff for transient gateway failures
//! - [`ReactAgent`]: the loop itself, usable anywhere an [`Agent`](reagent_core::Agent) is;
//!   with a [`Memory`](reagent_core::Memory) it recalls earlier answers and stores new ones

pub mod conversation;
pub mod events;
pub mod executor;
pub mod parser;
pub mod prompt;
pub mod retry;

pub use conversation::Conversation;
pub use events::{AgentEventHandler, NoOpEventHandler};
pub use executor::{AgentConfig, DEFAULT_MODEL, ReactAgent, ReactAgentBuilder};
pub use parser::{ActionRequest, Reply, ReplyParser};
pub use prompt::{CORRECTIVE_NOTE, DEFAULT_SYSTEM_TEMPLATE, RECALL_HEADER, render_system_prompt};
pub use retry::RetryPolicy;
