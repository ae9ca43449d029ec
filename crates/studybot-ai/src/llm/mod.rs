//! LLM module - chat types, the Ollama engine client and its stream decoder

mod client;
mod decoder;
mod ollama;

pub use client::{Message, Role};
pub use decoder::{ChunkStream, NdjsonDecoder, StreamChunk, decode_stream};
pub use ollama::{
    ChatCompletion, DEFAULT_ENGINE_TIMEOUT, DEFAULT_ENGINE_URL, DEFAULT_MODEL, OllamaClient,
    SamplingOptions,
};
