//! StudyBot AI - the model-facing half of the StudyBot chat pipeline
//!
//! This crate provides:
//! - Chat message types shared by the gateway and the client
//! - An Ollama generation engine client (streaming and one-shot)
//! - An incremental NDJSON decoder for the engine's streamed output
//! - Bounded conversation history (system prompt + sliding window)
//! - Reasoning-span stripping for `<think>` blocks
//! - The task-context system prompt built from a user's study tasks

pub mod error;
mod http_client;
pub mod llm;
pub mod memory;
pub mod profile;
pub mod prompt;
pub mod text_utils;

// Re-export commonly used types
pub use error::{AiError, Result};
pub use http_client::build_http_client;
pub use llm::{
    ChatCompletion, ChunkStream, Message, NdjsonDecoder, OllamaClient, Role, SamplingOptions,
    StreamChunk, decode_stream,
};
pub use memory::{ConversationHistory, DEFAULT_MAX_TURNS};
pub use profile::{Priority, Task, Theme, UserProfile};
pub use prompt::{build_system_prompt, welcome_message};
pub use text_utils::{strip_reasoning, visible_reasoning_free};
