//! Shared utilities for reagent
//!
//! This crate provides functionality used by the reagent binaries: tracing
//! setup and loading of the JSON settings file.

pub mod config;
pub mod error;
pub mod logging;

pub use config::{
    AgentSettings, GatewaySettings, RuntimeSettings, Settings, TeamSettings, ToolFilter,
    ToolPattern, resolve_env_string,
};
pub use error::{ConfigError, Result};
pub use logging::{LogFormat, init_tracing};
