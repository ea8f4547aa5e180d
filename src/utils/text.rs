//! Text processing utilities.

use std::sync::LazyLock;

use regex::Regex;

static RE_TRAILING_SPACES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)[ \t]+$").unwrap());
static RE_RUNS_OF_SPACES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[ \t]{2,}").unwrap());
static RE_MULTI_BLANK_LINES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n{3,}").unwrap());

/// Clean up text extracted from a PDF page so paragraph breaks survive as
/// `\n\n` and nothing else looks like one.
pub fn normalize_extracted_text(text: &str) -> String {
    let text = text.replace("\r\n", "\n").replace('\r', "\n");
    let text = RE_TRAILING_SPACES.replace_all(&text, "");
    let text = RE_RUNS_OF_SPACES.replace_all(&text, " ");
    let text = RE_MULTI_BLANK_LINES.replace_all(&text, "\n\n");
    text.trim().to_string()
}

/// Truncate to at most `max_chars` characters, appending `...` when cut.
pub fn preview(text: &str, max_chars: usize) -> String {
    let head: String = text.chars().take(max_chars).collect();
    if text.chars().count() > max_chars {
        format!("{}...", head)
    } else {
        head
    }
}
