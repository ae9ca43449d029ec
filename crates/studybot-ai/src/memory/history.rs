//! Conversation history - system prompt plus a sliding window of turns
//!
//! The history sent with every chat request is bounded so the payload (and the
//! engine's context) does not grow without limit. The first entry is always
//! the task-context system prompt; only the most recent user/assistant
//! messages are retained after it.
//!
//! # Example
//!
//! ```
//! use studybot_ai::memory::ConversationHistory;
//!
//! let mut history = ConversationHistory::with_max_turns("You are StudyBot", 2);
//! history.push_user("Hello");
//! history.push_assistant("Hi there!");
//! history.push_user("What is due today?");
//!
//! assert_eq!(history.len(), 3);
//! assert_eq!(history.messages()[0].content, "You are StudyBot");
//! assert_eq!(history.messages()[1].content, "Hi there!");
//! ```

use crate::llm::{Message, Role};

/// Default number of user/assistant messages kept after the system prompt
pub const DEFAULT_MAX_TURNS: usize = 20;

/// Ordered chat history that always starts with exactly one system message
#[derive(Debug, Clone)]
pub struct ConversationHistory {
    /// Messages in conversation order; index 0 is the system prompt
    messages: Vec<Message>,
    /// Maximum number of non-system messages to retain
    max_turns: usize,
}

impl ConversationHistory {
    /// Create a history seeded with `system_prompt` and the default window
    pub fn new(system_prompt: impl Into<String>) -> Self {
        Self::with_max_turns(system_prompt, DEFAULT_MAX_TURNS)
    }

    /// Create a history with a custom window size
    pub fn with_max_turns(system_prompt: impl Into<String>, max_turns: usize) -> Self {
        let mut messages = Vec::with_capacity(max_turns + 2);
        messages.push(Message::system(system_prompt));
        Self {
            messages,
            max_turns,
        }
    }

    /// Append a user message, evicting the oldest turns past the window
    pub fn push_user(&mut self, content: impl Into<String>) {
        self.push(Message::user(content));
    }

    /// Append an assistant message, evicting the oldest turns past the window
    pub fn push_assistant(&mut self, content: impl Into<String>) {
        self.push(Message::assistant(content));
    }

    /// Replace the system prompt and drop every turn.
    pub fn reset(&mut self, system_prompt: impl Into<String>) {
        self.messages.clear();
        self.messages.push(Message::system(system_prompt));
    }

    /// All messages, system prompt first
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    #[cfg(test)]
    pub fn system_prompt(&self) -> &str {
        &self.messages[0].content
    }

    /// Most recent message (the system prompt when no turn exists yet)
    #[cfg(test)]
    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Total number of messages including the system prompt
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Number of user/assistant messages retained
    #[cfg(test)]
    pub fn turn_count(&self) -> usize {
        self.messages.len() - 1
    }

    pub fn max_turns(&self) -> usize {
        self.max_turns
    }

    fn push(&mut self, msg: Message) {
        debug_assert!(msg.role != Role::System);
        self.messages.push(msg);

        let limit = self.max_turns + 1;
        if self.messages.len() > limit {
            let excess = self.messages.len() - limit;
            self.messages.drain(1..1 + excess);
        }
    }
}
