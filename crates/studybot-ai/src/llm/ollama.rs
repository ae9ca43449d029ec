//! Ollama generation engine client

use std::time::Duration;

use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};

use crate::error::{AiError, Result};
use crate::http_client::build_http_client;
use crate::llm::client::Message;
use crate::llm::decoder::{ChunkStream, EngineChatLine, decode_stream};
use crate::text_utils::floor_char_boundary;

pub const DEFAULT_ENGINE_URL: &str = "http://localhost:11434";
pub const DEFAULT_MODEL: &str = "qwen3:8b";
/// Whole-request ceiling; there is no per-token timeout.
pub const DEFAULT_ENGINE_TIMEOUT: Duration = Duration::from_secs(600);

/// Sampling parameters sent with every chat request
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SamplingOptions {
    pub temperature: f32,
    /// Maximum number of tokens to generate
    pub num_predict: u32,
    /// Context window size
    pub num_ctx: u32,
}

impl Default for SamplingOptions {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            num_predict: 1024,
            num_ctx: 4096,
        }
    }
}

/// Result of a non-streaming chat request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatCompletion {
    pub content: String,
    pub model: Option<String>,
    pub total_duration: Option<u64>,
}

#[derive(Serialize)]
struct OllamaChatRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    stream: bool,
    options: &'a SamplingOptions,
}

#[derive(Deserialize)]
struct OllamaTags {
    #[serde(default)]
    models: Vec<OllamaModelTag>,
}

#[derive(Deserialize)]
struct OllamaModelTag {
    name: String,
}

/// Ollama client
#[derive(Debug, Clone)]
pub struct OllamaClient {
    client: Client,
    base_url: String,
    model: String,
    options: SamplingOptions,
}

impl OllamaClient {
    /// Create a new client for the engine at `base_url`
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Ok(Self {
            client: build_http_client(&base_url, Some(timeout))?,
            base_url,
            model: DEFAULT_MODEL.to_string(),
            options: SamplingOptions::default(),
        })
    }

    /// Set the model to use
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set the sampling options
    pub fn with_options(mut self, options: SamplingOptions) -> Self {
        self.options = options;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn options(&self) -> &SamplingOptions {
        &self.options
    }

    /// Request a complete answer in one response.
    pub async fn chat(&self, messages: &[Message]) -> Result<ChatCompletion> {
        let response = self.send_chat(messages, false).await?;
        let bytes = response.bytes().await?;
        let line: EngineChatLine = serde_json::from_slice(&bytes)
            .map_err(|err| AiError::InvalidFormat(format!("engine response: {}", err)))?;

        Ok(ChatCompletion {
            content: line.message.map(|m| m.content).unwrap_or_default(),
            model: line.model,
            total_duration: line.total_duration,
        })
    }

    /// Request incremental output.
    ///
    /// Resolves once the engine has accepted the request; the returned
    /// stream then yields decoded chunks until the engine reports `done`.
    pub async fn chat_stream(&self, messages: &[Message]) -> Result<ChunkStream> {
        let response = self.send_chat(messages, true).await?;
        Ok(decode_stream(response.bytes_stream()))
    }

    /// Names of the models installed in the engine.
    pub async fn list_models(&self) -> Result<Vec<String>> {
        let response = self
            .client
            .get(format!("{}/api/tags", self.base_url))
            .send()
            .await
            .map_err(|err| AiError::from_request(err, &self.base_url))?;

        if !response.status().is_success() {
            return Err(response_to_error(response).await);
        }

        let tags: OllamaTags = response.json().await?;
        Ok(tags.models.into_iter().map(|m| m.name).collect())
    }

    async fn send_chat(&self, messages: &[Message], stream: bool) -> Result<Response> {
        let body = OllamaChatRequest {
            model: &self.model,
            messages,
            stream,
            options: &self.options,
        };

        let response = self
            .client
            .post(format!("{}/api/chat", self.base_url))
            .json(&body)
            .send()
            .await
            .map_err(|err| AiError::from_request(err, &self.base_url))?;

        if !response.status().is_success() {
            return Err(response_to_error(response).await);
        }

        Ok(response)
    }
}

async fn response_to_error(response: Response) -> AiError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();

    // Truncate error body to prevent leaking large responses.
    const MAX_ERROR_BODY: usize = 512;
    let message = if body.len() > MAX_ERROR_BODY {
        let end = floor_char_boundary(&body, MAX_ERROR_BODY);
        format!("{}... [truncated]", &body[..end])
    } else {
        body
    };

    AiError::EngineHttp { status, message }
}
