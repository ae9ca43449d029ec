use colored::Colorize;

pub fn handle_error(err: anyhow::Error) -> ! {
    eprintln!("{} {:#}", "Error:".red().bold(), err);

    if let Some(suggestion) = suggestion_for(&err.to_string()) {
        eprintln!("\n{}", "Suggestion:".yellow().bold());
        for line in suggestion {
            eprintln!("  {}", line);
        }
    }

    std::process::exit(1);
}

fn suggestion_for(message: &str) -> Option<Vec<String>> {
    let msg = message.to_lowercase();

    if msg.contains("host is offline") || msg.contains("connection refused") {
        return Some(vec![
            "Start the gateway with:".to_string(),
            format!("{} studybot-server", "$".dimmed()),
            "or point the CLI at another one with --server-url.".to_string(),
        ]);
    }

    if msg.contains("engine is not running") {
        return Some(vec![
            "The gateway is up but the model engine is not. Start it with:".to_string(),
            format!("{} ollama serve", "$".dimmed()),
        ]);
    }

    if msg.contains("queue timeout") {
        return Some(vec![
            "StudyBot serves one person at a time. Try again in a few minutes.".to_string(),
        ]);
    }

    if msg.contains("profile") {
        return Some(vec![
            "Check the file passed with --profile or STUDYBOT_PROFILE.".to_string(),
        ]);
    }

    None
}
