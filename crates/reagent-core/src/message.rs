//! Message types exchanged between the reasoning loop and the model
//!
//! Messages are plain role/text pairs. Tool calls travel as tagged text inside
//! assistant messages and their results come back as observation messages.

use serde::{Deserialize, Serialize};

/// Message role in a conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Instructions and corrective notes
    System,
    /// Task input
    User,
    /// Model output
    Assistant,
    /// Result of a tool invocation
    Observation,
}

impl Role {
    /// Lowercase role name
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Observation => "observation",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A message in the conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Message role
    pub role: Role,

    /// Message text
    pub content: String,
}

impl Message {
    /// Create a message with an explicit role
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    /// Create a system message
    pub fn system(text: impl Into<String>) -> Self {
        Self::new(Role::System, text)
    }

    /// Create a user message
    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Role::User, text)
    }

    /// Create an assistant message
    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(Role::Assistant, text)
    }

    /// Create a tool observation message
    pub fn observation(text: impl Into<String>) -> Self {
        Self::new(Role::Observation, text)
    }

    /// Get the message text
    pub fn text(&self) -> &str {
        &self.content
    }

    /// Check if this is a tool observation
    pub fn is_observation(&self) -> bool {
        self.role == Role::Observation
    }
}
