//! CLI configuration file support
//!
//! Loads configuration from ~/.config/studybot/config.toml

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::chat::RetryPolicy;

pub const DEFAULT_SERVER_URL: &str = "http://localhost:3000";

/// CLI configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CliConfig {
    /// Gateway base URL
    pub server_url: Option<String>,
    /// Path to the profile JSON (`{displayName, theme, tasks}`)
    pub profile: Option<PathBuf>,
    /// Delay between polls while the gateway is busy
    pub retry_interval_ms: Option<u64>,
    pub max_attempts: Option<u32>,
}

impl CliConfig {
    /// Load configuration from default path
    pub fn load() -> Self {
        Self::load_from_path(Self::default_path())
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: Option<PathBuf>) -> Self {
        let Some(path) = path else {
            return Self::default();
        };

        if !path.exists() {
            return Self::default();
        }

        match std::fs::read_to_string(&path) {
            Ok(content) => toml::from_str(&content).unwrap_or_else(|err| {
                tracing::warn!(path = %path.display(), error = %err, "Ignoring invalid config file");
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }

    /// Get the default configuration file path
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("studybot").join("config.toml"))
    }

    /// Merge with command-line values, which win over the file.
    pub fn resolve(&self, server_url: Option<String>, profile: Option<PathBuf>) -> Settings {
        let defaults = RetryPolicy::default();
        let retry = RetryPolicy {
            interval: self
                .retry_interval_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.interval),
            max_attempts: self
                .max_attempts
                .filter(|n| *n > 0)
                .unwrap_or(defaults.max_attempts),
        };

        Settings {
            server_url: server_url
                .or_else(|| self.server_url.clone())
                .unwrap_or_else(|| DEFAULT_SERVER_URL.to_string()),
            profile: profile.or_else(|| self.profile.clone()),
            retry,
        }
    }
}

/// Effective settings for one invocation
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub server_url: String,
    pub profile: Option<PathBuf>,
    pub retry: RetryPolicy,
}
