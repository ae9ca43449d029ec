//! Shared text utility functions.

use once_cell::sync::Lazy;
use regex::Regex;

const THINK_OPEN: &str = "<think>";

static THINK_SPAN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<think>.*?</think>").expect("valid reasoning span pattern"));

/// Find the largest byte index <= `index` that is a valid char boundary.
pub fn floor_char_boundary(s: &str, index: usize) -> usize {
    if index >= s.len() {
        return s.len();
    }
    let mut i = index;
    while i > 0 && !s.is_char_boundary(i) {
        i -= 1;
    }
    i
}

/// Remove every closed `<think>...</think>` span and trim the result.
///
/// An unterminated `<think>` is left in place: once the text is final it will
/// never close, so it is treated as ordinary content.
pub fn strip_reasoning(text: &str) -> String {
    THINK_SPAN.replace_all(text, "").trim().to_string()
}

/// Text safe to display while a response is still arriving.
///
/// Like [`strip_reasoning`], but also hides an unterminated `<think>` span
/// (it may still close) and a trailing fragment that could be the start of
/// one, such as `"<thi"`.
pub fn visible_reasoning_free(text: &str) -> String {
    let stripped = THINK_SPAN.replace_all(text, "");
    let stripped: &str = &stripped;
    let end = pending_reasoning_start(stripped);
    stripped[..end].trim().to_string()
}

fn pending_reasoning_start(text: &str) -> usize {
    if let Some(open) = text.find(THINK_OPEN) {
        return open;
    }

    (1..THINK_OPEN.len())
        .rev()
        .find(|&len| text.ends_with(&THINK_OPEN[..len]))
        .map(|len| text.len() - len)
        .unwrap_or(text.len())
}
