mod chat;
mod cli;
mod commands;
mod config;
mod error;

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};
use tracing_appender::non_blocking::WorkerGuard;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let _log_guard = init_logging();

    if let Err(err) = run(cli).await {
        error::handle_error(err);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let file_config = config::CliConfig::load();
    let settings = file_config.resolve(cli.server_url, cli.profile);
    tracing::info!(server_url = %settings.server_url, "StudyBot CLI starting");

    match cli.command {
        None | Some(Commands::Chat) => commands::chat::run(&settings).await,
        Some(Commands::Ask(args)) => commands::ask::run(&settings, &args, cli.format).await,
        Some(Commands::Health) => commands::health::run(&settings, cli.format).await,
    }
}

fn log_dir() -> Option<PathBuf> {
    dirs::data_dir().map(|dir| dir.join("studybot").join("logs"))
}

/// Logs go to a file so the chat output stays clean.
fn init_logging() -> Option<WorkerGuard> {
    let log_dir = log_dir()?;
    std::fs::create_dir_all(&log_dir).ok()?;

    let file_appender = tracing_appender::rolling::daily(log_dir, "studybot.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,studybot=debug".into()),
        )
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(false)
        .with_level(true)
        .init();

    Some(guard)
}
