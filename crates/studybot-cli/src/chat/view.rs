use std::io::{self, Write};

use colored::Colorize;

use super::error::ChatError;
use super::renderer::Frame;

const BUSY_NOTICE: &str = "StudyBot is helping someone else. You are in the queue...";

/// Presentation side of a chat session.
pub trait ChatView: Send {
    fn show_busy_notice(&mut self);
    fn hide_busy_notice(&mut self);
    fn begin_stream(&mut self);
    fn update_stream(&mut self, frame: &Frame);
    fn finalize_stream(&mut self, frame: &Frame);
    /// Discard a partially rendered reply.
    fn teardown_stream(&mut self);
    fn show_error(&mut self, err: &ChatError);
}

/// Plain terminal output.
///
/// The renderer produces a full frame per delta; only the part not yet on
/// screen is printed. When a frame is not an extension of what was printed
/// (a reasoning span got removed, say) the reply is reprinted on a new line.
#[derive(Debug)]
pub struct TerminalView {
    printed: String,
    report_errors: bool,
}

impl TerminalView {
    /// Errors are printed inline and the session carries on.
    pub fn interactive() -> Self {
        Self {
            printed: String::new(),
            report_errors: true,
        }
    }

    /// Errors are left to the caller, which exits with them.
    pub fn one_shot() -> Self {
        Self {
            printed: String::new(),
            report_errors: false,
        }
    }

    fn print_frame(&mut self, frame: &Frame) {
        let mut out = io::stdout().lock();
        match frame.text.strip_prefix(self.printed.as_str()) {
            Some(suffix) => {
                let _ = write!(out, "{}", suffix);
            }
            None => {
                let _ = write!(out, "\n{} {}", "StudyBot:".cyan().bold(), frame.text);
            }
        }
        let _ = out.flush();
        self.printed = frame.text.clone();
    }
}

impl ChatView for TerminalView {
    fn show_busy_notice(&mut self) {
        println!("{}", BUSY_NOTICE.yellow());
    }

    // A printed line cannot be taken back; the reply that follows replaces it.
    fn hide_busy_notice(&mut self) {}

    fn begin_stream(&mut self) {
        self.printed.clear();
        print!("{} ", "StudyBot:".cyan().bold());
        let _ = io::stdout().flush();
    }

    fn update_stream(&mut self, frame: &Frame) {
        self.print_frame(frame);
    }

    fn finalize_stream(&mut self, frame: &Frame) {
        self.print_frame(frame);
        println!("\n");
        self.printed.clear();
    }

    fn teardown_stream(&mut self) {
        if !self.printed.is_empty() {
            println!("\n{}", "(reply interrupted)".dimmed());
        }
        self.printed.clear();
    }

    fn show_error(&mut self, err: &ChatError) {
        if self.report_errors {
            eprintln!("{} {}\n", "Error:".red().bold(), err);
        }
    }
}

/// Prints nothing; keeps the final frame for structured output.
#[derive(Debug, Default)]
pub struct CaptureView {
    pub final_frame: Option<Frame>,
}

impl ChatView for CaptureView {
    fn show_busy_notice(&mut self) {}
    fn hide_busy_notice(&mut self) {}
    fn begin_stream(&mut self) {}
    fn update_stream(&mut self, _frame: &Frame) {}

    fn finalize_stream(&mut self, frame: &Frame) {
        self.final_frame = Some(frame.clone());
    }

    fn teardown_stream(&mut self) {
        self.final_frame = None;
    }

    fn show_error(&mut self, _err: &ChatError) {}
}
