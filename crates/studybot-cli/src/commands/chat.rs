use std::io::Write;

use anyhow::Result;
use colored::Colorize;
use studybot_ai::ConversationHistory;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

use super::Session;
use crate::chat::{ChatController, HttpTransport, InputGate, TerminalView};
use crate::config::Settings;

const PLAN_PROMPT: &str = "Make me a study plan for this week based on my pending tasks.";
const OVERDUE_PROMPT: &str = "Which of my tasks are overdue, and how should I catch up?";
const TIPS_PROMPT: &str = "Give me study tips for the subjects I am working on.";

/// One line of user input, classified.
#[derive(Debug, PartialEq, Eq)]
pub enum Input {
    Empty,
    Message(String),
    Reset,
    Help,
    Quit,
    Unknown(String),
}

pub fn parse_input(line: &str) -> Input {
    let line = line.trim();
    if line.is_empty() {
        return Input::Empty;
    }

    match line {
        "/plan" => Input::Message(PLAN_PROMPT.to_string()),
        "/overdue" => Input::Message(OVERDUE_PROMPT.to_string()),
        "/tips" => Input::Message(TIPS_PROMPT.to_string()),
        "/reset" => Input::Reset,
        "/help" => Input::Help,
        "/quit" | "/exit" => Input::Quit,
        cmd if cmd.starts_with('/') && !cmd.contains(' ') => Input::Unknown(cmd.to_string()),
        text => Input::Message(text.to_string()),
    }
}

pub async fn run(settings: &Settings) -> Result<()> {
    let session = Session::load(settings)?;
    let transport = HttpTransport::new(&settings.server_url)?;
    let history = ConversationHistory::new(session.system_prompt.clone());
    let mut controller =
        ChatController::new(transport, TerminalView::interactive(), history, settings.retry);

    if let Some(name) = &session.profile.display_name {
        println!("{}", format!("Welcome back, {}!", name).bold());
    }
    println!("{}\n", session.welcome);
    print_help();

    let gate = controller.gate();
    let mut lines = spawn_input_reader(gate.clone());
    prompt();

    while let Some(line) = lines.recv().await {
        match parse_input(&line) {
            Input::Empty => {}
            Input::Quit => break,
            Input::Help => print_help(),
            Input::Reset => {
                controller
                    .history_mut()
                    .reset(session.system_prompt.clone());
                println!("{}", "Conversation cleared.".dimmed());
            }
            Input::Unknown(cmd) => {
                println!("{} {}", "Unknown command:".yellow(), cmd);
            }
            Input::Message(text) => {
                // Failures are already shown by the view.
                if let Err(err) = controller.submit(&text).await {
                    tracing::debug!(error = %err, "Submission ended without a reply");
                }
            }
        }
        // The reader claimed the gate when it accepted this line.
        gate.unlock();
        prompt();
    }

    println!("{}", "Bye!".dimmed());
    Ok(())
}

/// What the reader did with one line.
#[derive(Debug, PartialEq, Eq)]
enum Accepted {
    Forwarded,
    Dropped,
    Closed,
}

/// Forward `line` only if the gate can be claimed for it. The gate stays
/// locked until the main loop has handled the line, so a second line read
/// before then (a paste, or typing during a reply) is dropped.
fn accept_line(gate: &InputGate, tx: &mpsc::UnboundedSender<String>, line: String) -> Accepted {
    if !gate.try_lock() {
        tracing::debug!("Dropping input while a reply is in flight");
        return Accepted::Dropped;
    }
    if tx.send(line).is_err() {
        gate.unlock();
        return Accepted::Closed;
    }
    Accepted::Forwarded
}

/// Read stdin on a separate task so typing while a reply streams does not
/// block it.
fn spawn_input_reader(gate: InputGate) -> mpsc::UnboundedReceiver<String> {
    let (tx, rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => match accept_line(&gate, &tx, line) {
                    Accepted::Forwarded => {}
                    Accepted::Dropped => {
                        eprintln!("{}", "Still answering, please wait...".dimmed());
                    }
                    Accepted::Closed => break,
                },
                Ok(None) => break,
                Err(err) => {
                    tracing::warn!(error = %err, "Failed to read input");
                    break;
                }
            }
        }
    });

    rx
}

fn prompt() {
    print!("{} ", "You:".green().bold());
    let _ = std::io::stdout().flush();
}

fn print_help() {
    println!("{}", "Commands:".bold());
    println!("  /plan     weekly study plan");
    println!("  /overdue  what is overdue and how to catch up");
    println!("  /tips     study tips for your subjects");
    println!("  /reset    start a new conversation");
    println!("  /quit     leave");
    println!();
}
