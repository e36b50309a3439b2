//! Tool registry and execution framework for reagent
//!
//! Tools are declared explicitly as a [`ToolSpec`]: a name, a description, an
//! ordered [`ParameterSchema`] and an async [`ToolHandler`]. The
//! [`ToolRegistry`] validates raw model arguments against the schema before
//! the handler ever runs, and turns handler failures into observation text.

pub mod builtin;
pub mod registry;
pub mod schema;
pub mod tool;

pub use builtin::{builtin_registry, register_builtin_tools, register_memory_tool};
pub use registry::{ERROR_MARKER, ToolDescription, ToolOutput, ToolRegistry};
pub use schema::{ParamSpec, ParamType, ParameterSchema};
pub use tool::{Arguments, FnHandler, ToolFailure, ToolHandler, ToolSpec};

/// Result type alias for registry operations
pub type Result<T> = reagent_core::Result<T>;
