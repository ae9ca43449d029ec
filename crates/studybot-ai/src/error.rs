//! Error types for the AI module

use thiserror::Error;

/// AI module error types
#[derive(Error, Debug)]
pub enum AiError {
    /// The engine refused the connection (not running or wrong port).
    #[error("Generation engine is not running at {url}. Please start it with: ollama serve")]
    EngineOffline { url: String },

    #[error("Engine error {status}: {message}")]
    EngineHttp { status: u16, message: String },

    #[error("Invalid response format: {0}")]
    InvalidFormat(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AiError {
    /// Classify a transport failure, separating refused connections from the rest.
    pub(crate) fn from_request(err: reqwest::Error, url: &str) -> Self {
        if err.is_connect() {
            AiError::EngineOffline {
                url: url.to_string(),
            }
        } else {
            AiError::Http(err)
        }
    }

    pub fn is_engine_offline(&self) -> bool {
        matches!(self, AiError::EngineOffline { .. })
    }
}

/// Result type alias for AI operations
pub type Result<T> = std::result::Result<T, AiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_offline_message_names_url() {
        let err = AiError::EngineOffline {
            url: "http://localhost:11434".to_string(),
        };
        assert!(err.is_engine_offline());
        assert!(err.to_string().contains("http://localhost:11434"));
        assert!(err.to_string().contains("ollama serve"));
    }

    #[test]
    fn test_engine_http_is_not_offline() {
        let err = AiError::EngineHttp {
            status: 500,
            message: "model not found".to_string(),
        };
        assert!(!err.is_engine_offline());
        assert_eq!(err.to_string(), "Engine error 500: model not found");
    }
}
