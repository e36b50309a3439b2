//! Language-model gateway for reagent
//!
//! This crate is the only network boundary the reasoning loop depends on. It
//! includes:
//!
//! - Completion request/response types
//! - The [`Gateway`] trait
//! - A scripted gateway for offline runs and tests
//! - Concrete gateway implementations (behind feature flags)

pub mod completion;
pub mod error;
pub mod gateway;
pub mod scripted;

// Re-export main types
pub use completion::{Completion, CompletionRequest, CompletionRequestBuilder, TokenUsage};
pub use error::{GatewayError, Result};
pub use gateway::Gateway;
pub use reagent_core::{Message, Role};
pub use scripted::{ScriptStep, ScriptedGateway};

// Gateway implementations (feature-gated)
#[cfg(feature = "openai")]
pub mod providers;
