use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Output format for CLI commands
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl OutputFormat {
    pub fn is_json(self) -> bool {
        matches!(self, OutputFormat::Json)
    }
}

#[derive(Parser, Debug)]
#[command(name = "studybot")]
#[command(version, about = "StudyBot - AI study planner in your terminal")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Gateway URL (defaults to http://localhost:3000)
    #[arg(long, global = true, env = "STUDYBOT_SERVER_URL")]
    pub server_url: Option<String>,

    /// Profile JSON with your tasks
    #[arg(long, global = true, env = "STUDYBOT_PROFILE")]
    pub profile: Option<PathBuf>,

    /// Output format
    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Interactive chat session (default)
    Chat,

    /// Ask a single question and print the reply
    Ask(AskArgs),

    /// Check the gateway and the generation engine
    Health,
}

#[derive(Args, Debug)]
pub struct AskArgs {
    /// Question to send
    #[arg(required = true, num_args = 1..)]
    pub message: Vec<String>,
}

impl AskArgs {
    pub fn text(&self) -> String {
        self.message.join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_subcommand_means_chat() {
        let cli = Cli::try_parse_from(["studybot"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.format, OutputFormat::Text);
    }

    #[test]
    fn test_ask_joins_words() {
        let cli = Cli::try_parse_from(["studybot", "ask", "what", "is", "due?"]).unwrap();
        let Some(Commands::Ask(args)) = cli.command else {
            panic!("expected ask");
        };
        assert_eq!(args.text(), "what is due?");
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "studybot",
            "health",
            "--format",
            "json",
            "--server-url",
            "http://box:3000",
        ])
        .unwrap();
        assert!(cli.format.is_json());
        assert_eq!(cli.server_url.as_deref(), Some("http://box:3000"));
    }
}
