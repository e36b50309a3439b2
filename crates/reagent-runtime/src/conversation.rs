//! Append-only conversation log

use reagent_core::Message;
use std::sync::Arc;

/// Ordered message log of one agent run
///
/// Insertion order is causal order. Messages are never removed or edited; a
/// new task starts a fresh conversation.
#[derive(Debug, Clone, Default)]
pub struct Conversation {
    messages: Vec<Message>,
}

impl Conversation {
    /// Create an empty conversation
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message
    pub fn append(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Immutable copy of the current log
    pub fn snapshot(&self) -> Arc<[Message]> {
        Arc::from(self.messages.as_slice())
    }

    /// Borrow the messages
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Most recent message
    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Most recent tool observation
    pub fn last_observation(&self) -> Option<&Message> {
        self.messages.iter().rev().find(|m| m.is_observation())
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Consume the conversation into its transcript
    pub fn into_messages(self) -> Vec<Message> {
        self.messages
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reagent_core::Role;

    #[test]
    fn test_append_keeps_order() {
        let mut conversation = Conversation::new();
        conversation.append(Message::system("rules"));
        conversation.append(Message::user("task"));

        assert_eq!(conversation.len(), 2);
        assert_eq!(conversation.messages()[0].role, Role::System);
        assert_eq!(conversation.last().map(Message::text), Some("task"));
    }

    #[test]
    fn test_snapshot_is_detached() {
        let mut conversation = Conversation::new();
        conversation.append(Message::user("one"));
        let snapshot = conversation.snapshot();

        conversation.append(Message::assistant("two"));
        assert_eq!(snapshot.len(), 1);
        assert_eq!(conversation.len(), 2);
    }

    #[test]
    fn test_last_observation() {
        let mut conversation = Conversation::new();
        assert!(conversation.last_observation().is_none());

        conversation.append(Message::observation("first"));
        conversation.append(Message::assistant("thinking"));
        conversation.append(Message::observation("second"));
        conversation.append(Message::system("note"));

        assert_eq!(conversation.last_observation().map(Message::text), Some("second"));
        assert_eq!(conversation.into_messages().len(), 4);
    }
}
