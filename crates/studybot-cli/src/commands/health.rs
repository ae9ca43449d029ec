use anyhow::{Context, Result, bail};
use colored::Colorize;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use studybot_ai::build_http_client;

use crate::cli::OutputFormat;
use crate::config::Settings;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthReport {
    pub server: String,
    pub ollama: String,
    #[serde(default)]
    pub models: Vec<String>,
    #[serde(default)]
    pub busy: bool,
}

impl HealthReport {
    pub fn engine_connected(&self) -> bool {
        self.ollama == "connected"
    }
}

pub async fn fetch(server_url: &str) -> Result<HealthReport> {
    let client = build_http_client(server_url, Some(Duration::from_secs(10)))?;
    let url = format!("{}/api/health", server_url.trim_end_matches('/'));

    let response = match client.get(&url).send().await {
        Ok(response) => response,
        Err(err) if err.is_connect() => {
            bail!("Cannot connect to AI server. The host is offline. ({})", url)
        }
        Err(err) => return Err(err).context("Health check failed"),
    };

    if !response.status().is_success() {
        bail!("Health check failed with status {}", response.status());
    }

    response
        .json()
        .await
        .context("Unexpected health response from server")
}

pub async fn run(settings: &Settings, format: OutputFormat) -> Result<()> {
    let report = fetch(&settings.server_url).await?;

    if format.is_json() {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("{} {}", "Server:".bold(), report.server.green());
    if report.engine_connected() {
        println!("{} {}", "Engine:".bold(), "connected".green());
    } else {
        println!("{} {}", "Engine:".bold(), "disconnected".red());
    }
    if report.models.is_empty() {
        println!("{} {}", "Models:".bold(), "none".dimmed());
    } else {
        println!("{} {}", "Models:".bold(), report.models.join(", "));
    }
    let busy = if report.busy {
        "busy, answering someone".yellow()
    } else {
        "idle".green()
    };
    println!("{} {}", "Status:".bold(), busy);

    Ok(())
}
