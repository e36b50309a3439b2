//! Parser for tagged model replies
//!
//! A reply is recognised in one of two forms:
//!
//! ```text
//! <thought>optional reasoning</thought>
//! <action>TOOL_NAME(ARGUMENTS)</action>
//! ```
//!
//! ```text
//! <thought>optional reasoning</thought>
//! <final_answer>ANSWER</final_answer>
//! ```
//!
//! When both tags appear the answer wins. Anything else is
//! [`Reply::Malformed`].

use regex::Regex;
use serde_json::Value;
use tracing::warn;

/// A tool call requested by the model
#[derive(Debug, Clone, PartialEq)]
pub struct ActionRequest {
    /// Tool name
    pub tool: String,
    /// Raw arguments (`Null` when none were given)
    pub arguments: Value,
    /// Accompanying reasoning, if any
    pub thought: Option<String>,
}

/// Parsed model reply
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// The model wants to call a tool
    Action(ActionRequest),
    /// The model produced its final answer
    Answer {
        answer: String,
        thought: Option<String>,
    },
    /// Neither form was recognised; carries the reason
    Malformed(String),
}

/// Compiled reply grammar
#[derive(Debug, Clone)]
pub struct ReplyParser {
    thought: Regex,
    action: Regex,
    answer: Regex,
    call: Regex,
}

impl ReplyParser {
    /// Compile the reply grammar
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            thought: Regex::new(r"(?s)<thought>(.*?)</thought>")?,
            action: Regex::new(r"(?s)<action>(.*?)(?:</action>|\z)")?,
            answer: Regex::new(r"(?s)<final_answer>(.*?)(?:</final_answer>|\z)")?,
            call: Regex::new(r"(?s)\A\s*([A-Za-z_][A-Za-z0-9_-]*)\s*(?:\((.*)\))?\s*\z")?,
        })
    }

    /// Parse one completion
    pub fn parse(&self, text: &str) -> Reply {
        let thought = self
            .thought
            .captures(text)
            .map(|c| c[1].trim().to_string())
            .filter(|t| !t.is_empty());

        if let Some(caps) = self.answer.captures(text) {
            let answer = caps[1].trim();
            if answer.is_empty() {
                return Reply::Malformed("empty final answer".to_string());
            }
            return Reply::Answer {
                answer: answer.to_string(),
                thought,
            };
        }

        let mut actions = self.action.captures_iter(text);
        let Some(first) = actions.next() else {
            return Reply::Malformed("no <action> or <final_answer> tag found".to_string());
        };
        let extra = actions.count();
        if extra > 0 {
            warn!(ignored = extra, "Reply contains several actions, only the first is used");
        }

        let body = first[1].trim();
        let Some(call) = self.call.captures(body) else {
            return Reply::Malformed(format!("invalid action syntax '{body}'"));
        };

        Reply::Action(ActionRequest {
            tool: call[1].to_string(),
            arguments: parse_arguments(call.get(2).map_or("", |m| m.as_str())),
            thought,
        })
    }
}

/// Interpret the text between the call parentheses
///
/// Empty text means no arguments; valid JSON is taken as is; anything else is
/// passed as a single string (with one pair of surrounding quotes removed).
fn parse_arguments(raw: &str) -> Value {
    let raw = raw.trim();
    if raw.is_empty() {
        return Value::Null;
    }
    if let Ok(value) = serde_json::from_str(raw) {
        return value;
    }
    let unquoted = raw
        .strip_prefix('\'')
        .and_then(|s| s.strip_suffix('\''))
        .unwrap_or(raw);
    Value::String(unquoted.to_string())
}
