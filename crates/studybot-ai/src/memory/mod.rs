//! Memory system for StudyBot conversations
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │  ConversationHistory                                  │
//! │  [0] system prompt (task context, never evicted)      │
//! │  [1..=20] most recent user/assistant messages         │
//! │  ↓ overflow → discard oldest turn (no summary)        │
//! └──────────────────────────────────────────────────────┘
//! ```

mod history;

pub use history::{ConversationHistory, DEFAULT_MAX_TURNS};
