//! Core abstractions for reagent
//!
//! This crate defines the vocabulary shared by every reagent crate: the
//! [`Agent`] trait, conversation [`Message`]s, [`Task`] input, structured
//! [`RunResult`]s, the [`Memory`] boundary and the [`Error`] taxonomy.

pub mod agent;
pub mod error;
pub mod memory;
pub mod message;
pub mod result;
pub mod task;

pub use agent::Agent;
pub use error::{Error, ErrorKind, Result};
pub use memory::{InMemoryStore, Memory, MemoryItem, MemoryStats};
pub use message::{Message, Role};
pub use result::{RunResult, RunStatus, ToolCallRecord};
pub use task::Task;
