//! Routing policies

use serde::{Deserialize, Serialize};

/// How a team distributes a task over its agents
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RoutingPolicy {
    /// Run every agent in declaration order, feeding each the previous answer
    #[default]
    FixedOrder,

    /// Run the single agent whose keywords appear in the task
    ///
    /// Matching is a case-insensitive substring test. When several agents
    /// match, `require_unique` turns the tie into an error; otherwise the
    /// first declared agent wins.
    DispatchByKeyword {
        #[serde(default)]
        require_unique: bool,
    },

    /// Run every agent concurrently on the same task
    FanOut,
}

impl std::fmt::Display for RoutingPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RoutingPolicy::FixedOrder => f.write_str("fixed_order"),
            RoutingPolicy::DispatchByKeyword { require_unique: true } => {
                f.write_str("dispatch_by_keyword(unique)")
            }
            RoutingPolicy::DispatchByKeyword { require_unique: false } => {
                f.write_str("dispatch_by_keyword")
            }
            RoutingPolicy::FanOut => f.write_str("fan_out"),
        }
    }
}

/// Check whether any keyword occurs in the text, ignoring case
pub fn keywords_match(keywords: &[String], text: &str) -> bool {
    let text = text.to_lowercase();
    keywords
        .iter()
        .map(|k| k.trim())
        .filter(|k| !k.is_empty())
        .any(|k| text.contains(&k.to_lowercase()))
}
