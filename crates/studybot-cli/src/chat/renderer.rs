//! Incremental rendering of a streamed reply
//!
//! Every delta re-renders the whole accumulated text. Reasoning spans are
//! matched against the full accumulator, so a `<think>` tag split across two
//! deltas is still recognised once both halves have arrived.

use pulldown_cmark::{Event, Options, Parser, html};
use studybot_ai::{strip_reasoning, visible_reasoning_free};

/// One rendering of the reply so far.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub html: String,
    /// Markdown source with reasoning removed, for terminal output
    pub text: String,
    /// Still receiving; cleared by `finalize`
    pub streaming: bool,
}

#[derive(Debug, Default)]
pub struct StreamRenderer {
    raw: String,
    finished: bool,
}

impl StreamRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, delta: &str) -> Frame {
        self.raw.push_str(delta);
        self.frame()
    }

    /// Final rendering, without the cursor. Calling it again yields the same frame.
    pub fn finalize(&mut self) -> Frame {
        self.finished = true;
        self.frame()
    }

    pub fn frame(&self) -> Frame {
        // An unterminated span is hidden while it may still close, and shown
        // as-is once the stream is over.
        let text = if self.finished {
            strip_reasoning(&self.raw)
        } else {
            visible_reasoning_free(&self.raw)
        };

        Frame {
            html: render_markdown(&text),
            text,
            streaming: !self.finished,
        }
    }

    /// Reply as stored in the conversation history.
    pub fn reply(&self) -> String {
        strip_reasoning(&self.raw)
    }
}

/// CommonMark with GFM tables and strikethrough; single newlines become `<br />`.
pub fn render_markdown(text: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);

    let events = Parser::new_ext(text, options).map(|event| match event {
        Event::SoftBreak => Event::HardBreak,
        other => other,
    });

    let mut out = String::with_capacity(text.len() * 3 / 2);
    html::push_html(&mut out, events);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reasoning_span_removed() {
        let mut renderer = StreamRenderer::new();
        let frame = renderer.push("A<think>ignore me</think>B");
        assert_eq!(frame.text, "AB");
        assert_eq!(frame.html, "<p>AB</p>\n");
        assert_eq!(renderer.reply(), "AB");
    }

    #[test]
    fn test_split_tag_across_deltas() {
        let mut renderer = StreamRenderer::new();

        let first = renderer.push("A<thi");
        assert_eq!(first.text, "A");

        let second = renderer.push("nk>x</think>B");
        assert_eq!(second.text, "AB");
        assert_eq!(renderer.reply(), "AB");
    }

    #[test]
    fn test_open_span_hidden_until_closed() {
        let mut renderer = StreamRenderer::new();
        assert_eq!(renderer.push("Hi <think>planning").text, "Hi");
        assert_eq!(renderer.push(" more").text, "Hi");
        assert_eq!(renderer.push("</think> there").text, "Hi  there");
    }

    #[test]
    fn test_unterminated_span_shown_after_finalize() {
        let mut renderer = StreamRenderer::new();
        renderer.push("Answer <think>cut off");
        let frame = renderer.finalize();
        assert!(!frame.streaming);
        assert_eq!(frame.text, "Answer <think>cut off");
    }

    #[test]
    fn test_finalize_is_idempotent() {
        let mut renderer = StreamRenderer::new();
        renderer.push("**bold** text");
        let first = renderer.finalize();
        let second = renderer.finalize();
        assert_eq!(first, second);
        assert!(!first.streaming);
        assert!(
            !renderer.push("").streaming,
            "pushing after finalize never brings the cursor back"
        );
    }

    #[test]
    fn test_cursor_while_streaming() {
        let mut renderer = StreamRenderer::new();
        assert!(renderer.push("x").streaming);
    }

    #[test]
    fn test_markdown_features() {
        let html = render_markdown("line one\nline two");
        assert!(html.contains("line one<br />"));

        let html = render_markdown("~~done~~");
        assert!(html.contains("<del>done</del>"));

        let html = render_markdown("| Task | Due |\n|---|---|\n| Essay | Fri |");
        assert!(html.contains("<table>"));
        assert!(html.contains("<td>Essay</td>"));
    }
}
