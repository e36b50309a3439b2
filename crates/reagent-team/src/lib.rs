//! Multi-agent coordination for reagent
//!
//! A [`Team`] routes one task across several agents:
//!
//! - [`RoutingPolicy::FixedOrder`]: a pipeline, each stage seeded with the
//!   previous stage's answer
//! - [`RoutingPolicy::DispatchByKeyword`]: exactly one agent chosen by its
//!   specialty keywords
//! - [`RoutingPolicy::FanOut`]: every agent runs concurrently on the same task
//!
//! Agents never share conversations; only answer text crosses between them.

pub mod error;
pub mod routing;
pub mod team;
pub mod team_agent;

pub use error::TeamError;
pub use routing::RoutingPolicy;
pub use team::{StageOutput, Team, TeamBuilder, TeamResult};
pub use team_agent::TeamAgent;
