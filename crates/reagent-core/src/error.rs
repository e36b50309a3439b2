//! Error types for reagent
//!
//! One taxonomy is shared by every crate in the workspace so that a run result
//! can carry the exact failure kind across crate boundaries.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for reagent-core
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for registry, reasoning loop and coordinator operations
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum Error {
    /// A tool with the same name is already registered
    #[error("Tool already registered: {0}")]
    DuplicateTool(String),

    /// No tool with this name is registered
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    /// Arguments do not satisfy the tool's parameter schema
    #[error("Invalid arguments for tool '{tool}': {reason}")]
    InvalidArguments {
        /// Tool name
        tool: String,
        /// What was wrong with the arguments
        reason: String,
    },

    /// The language-model gateway failed after all retries
    #[error("Gateway transport error: {0}")]
    GatewayTransport(String),

    /// The model kept replying in a shape the parser does not recognise
    #[error("Malformed model response: {0}")]
    MalformedResponse(String),

    /// A tool handler failed or panicked
    ///
    /// Inside the reasoning loop the failure is shown to the model as an
    /// observation and this error's text is kept in `ToolCallRecord::error`.
    /// It never fails a run.
    #[error("Tool '{tool}' failed: {reason}")]
    ToolExecution {
        /// Tool name
        tool: String,
        /// Handler failure message
        reason: String,
    },

    /// No team member declared a keyword matching the task
    #[error("No agent matches task: {0}")]
    NoMatchingAgent(String),

    /// Several team members match and the routing policy requires one
    #[error("Ambiguous routing, candidates: {}", candidates.join(", "))]
    AmbiguousRouting {
        /// Roles of every matching agent, in declaration order
        candidates: Vec<String>,
    },

    /// No stored memory has this id
    #[error("Unknown memory: {0}")]
    UnknownMemory(String),

    /// A memory store rejected or failed an operation
    #[error("Memory error: {0}")]
    Memory(String),

    /// Invalid configuration value
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Builder or agent initialization failed
    #[error("Initialization failed: {0}")]
    InitializationFailed(String),
}

/// Discriminant of [`Error`], convenient for matching and reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    DuplicateTool,
    UnknownTool,
    InvalidArguments,
    GatewayTransport,
    MalformedResponse,
    ToolExecution,
    NoMatchingAgent,
    AmbiguousRouting,
    UnknownMemory,
    Memory,
    Configuration,
    InitializationFailed,
}

impl Error {
    /// Get the kind of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::DuplicateTool(_) => ErrorKind::DuplicateTool,
            Self::UnknownTool(_) => ErrorKind::UnknownTool,
            Self::InvalidArguments { .. } => ErrorKind::InvalidArguments,
            Self::GatewayTransport(_) => ErrorKind::GatewayTransport,
            Self::MalformedResponse(_) => ErrorKind::MalformedResponse,
            Self::ToolExecution { .. } => ErrorKind::ToolExecution,
            Self::NoMatchingAgent(_) => ErrorKind::NoMatchingAgent,
            Self::AmbiguousRouting { .. } => ErrorKind::AmbiguousRouting,
            Self::UnknownMemory(_) => ErrorKind::UnknownMemory,
            Self::Memory(_) => ErrorKind::Memory,
            Self::Configuration(_) => ErrorKind::Configuration,
            Self::InitializationFailed(_) => ErrorKind::InitializationFailed,
        }
    }

    /// Whether the error is resolved inside the reasoning loop
    ///
    /// Recoverable errors become observations the model can react to.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::ToolExecution { .. } | Self::UnknownTool(_) | Self::InvalidArguments { .. }
        )
    }
}
