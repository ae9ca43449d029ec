use serde::Deserialize;
use std::env;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use studybot_ai::SamplingOptions;
use studybot_ai::llm::{DEFAULT_ENGINE_TIMEOUT, DEFAULT_ENGINE_URL, DEFAULT_MODEL};

#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub engine: EngineConfig,
    /// Empty or containing "*" means any origin
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub url: String,
    pub model: String,
    pub options: SamplingOptions,
    pub timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            engine: EngineConfig::default(),
            cors_origins: Vec::new(),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            url: default_engine_url(),
            model: default_model(),
            options: SamplingOptions::default(),
            timeout: DEFAULT_ENGINE_TIMEOUT,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
struct FileConfig {
    #[serde(default)]
    server: ServerSection,
    #[serde(default)]
    engine: EngineSection,
    #[serde(default)]
    cors: CorsSection,
}

#[derive(Debug, Deserialize)]
struct ServerSection {
    #[serde(default = "default_host")]
    host: String,
    #[serde(default = "default_port")]
    port: u16,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct EngineSection {
    #[serde(default = "default_engine_url")]
    url: String,
    #[serde(default = "default_model")]
    model: String,
    #[serde(default)]
    temperature: Option<f32>,
    #[serde(default)]
    num_predict: Option<u32>,
    #[serde(default)]
    num_ctx: Option<u32>,
    #[serde(default)]
    timeout_secs: Option<u64>,
}

impl Default for EngineSection {
    fn default() -> Self {
        Self {
            url: default_engine_url(),
            model: default_model(),
            temperature: None,
            num_predict: None,
            num_ctx: None,
            timeout_secs: None,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
struct CorsSection {
    #[serde(default)]
    origins: Vec<String>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_engine_url() -> String {
    DEFAULT_ENGINE_URL.to_string()
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

impl ServerConfig {
    pub fn load() -> anyhow::Result<Self> {
        if let Some(file_config) = load_from_file()? {
            return Ok(Self::from(file_config));
        }

        Self::from_env(|name| env::var(name).ok())
    }

    /// Build from `STUDYBOT_*` variables; a set but unparsable value is an error.
    fn from_env(var: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let defaults = SamplingOptions::default();
        let host = var("STUDYBOT_SERVER_HOST").unwrap_or_else(default_host);
        let port = parse_var(&var, "STUDYBOT_SERVER_PORT")?.unwrap_or_else(default_port);
        let url = var("STUDYBOT_ENGINE_URL").unwrap_or_else(default_engine_url);
        let model = var("STUDYBOT_MODEL").unwrap_or_else(default_model);
        let options = SamplingOptions {
            temperature: parse_var(&var, "STUDYBOT_TEMPERATURE")?
                .unwrap_or(defaults.temperature),
            num_predict: parse_var(&var, "STUDYBOT_NUM_PREDICT")?
                .unwrap_or(defaults.num_predict),
            num_ctx: parse_var(&var, "STUDYBOT_NUM_CTX")?.unwrap_or(defaults.num_ctx),
        };
        let timeout = parse_var(&var, "STUDYBOT_ENGINE_TIMEOUT_SECS")?
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_ENGINE_TIMEOUT);
        let cors_origins = var("STUDYBOT_CORS_ORIGINS")
            .map(|value| parse_origin_list(&value))
            .unwrap_or_default();

        Ok(Self {
            host,
            port,
            engine: EngineConfig {
                url,
                model,
                options,
                timeout,
            },
            cors_origins,
        })
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl From<FileConfig> for ServerConfig {
    fn from(file: FileConfig) -> Self {
        let defaults = SamplingOptions::default();
        Self {
            host: file.server.host,
            port: file.server.port,
            engine: EngineConfig {
                url: file.engine.url,
                model: file.engine.model,
                options: SamplingOptions {
                    temperature: file.engine.temperature.unwrap_or(defaults.temperature),
                    num_predict: file.engine.num_predict.unwrap_or(defaults.num_predict),
                    num_ctx: file.engine.num_ctx.unwrap_or(defaults.num_ctx),
                },
                timeout: file
                    .engine
                    .timeout_secs
                    .map(Duration::from_secs)
                    .unwrap_or(DEFAULT_ENGINE_TIMEOUT),
            },
            cors_origins: file.cors.origins,
        }
    }
}

fn parse_var<T>(var: &impl Fn(&str) -> Option<String>, name: &str) -> anyhow::Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let Some(value) = var(name) else {
        return Ok(None);
    };
    value
        .trim()
        .parse()
        .map(Some)
        .map_err(|err| anyhow::anyhow!("Invalid {}={:?}: {}", name, value, err))
}

fn parse_origin_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(str::to_string)
        .collect()
}

fn load_from_file() -> anyhow::Result<Option<FileConfig>> {
    let config_path = env::var("STUDYBOT_SERVER_CONFIG").ok();
    let path = if let Some(path) = config_path {
        Some(path)
    } else if Path::new("server.toml").exists() {
        Some("server.toml".to_string())
    } else {
        None
    };

    let Some(path) = path else {
        return Ok(None);
    };

    read_file_config(Path::new(&path)).map(Some)
}

fn read_file_config(path: &Path) -> anyhow::Result<FileConfig> {
    let contents = fs::read_to_string(path)
        .map_err(|err| anyhow::anyhow!("Failed to read config {}: {}", path.display(), err))?;
    toml::from_str(&contents)
        .map_err(|err| anyhow::anyhow!("Failed to parse config {}: {}", path.display(), err))
}
