//! Concrete gateway implementations
//!
//! This module contains implementations of the Gateway trait for remote
//! language-model services.

#[cfg(feature = "openai")]
pub mod openai;

#[cfg(feature = "openai")]
pub use openai::{OpenAIConfig, OpenAIGateway};
