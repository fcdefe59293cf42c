//! Text clean-up before speech engines see it.
//!
//! Emoji are read aloud literally (or click) by several engines, and markdown
//! emphasis ends up as "asterisk". Paragraph breaks become sentence stops so
//! the engine pauses where the reader would.

use regex::{Captures, Regex};
use std::sync::OnceLock;

fn emoji_regex() -> &'static Regex {
    static EMOJI: OnceLock<Regex> = OnceLock::new();
    EMOJI.get_or_init(|| {
        Regex::new(
            r"[\p{Extended_Pictographic}\x{1F1E6}-\x{1F1FF}\x{1F3FB}-\x{1F3FF}\x{FE0F}\x{200D}\x{20E3}]",
        )
        .expect("Invalid regex pattern - this is a bug")
    })
}

fn markdown_regex() -> &'static Regex {
    static MARKDOWN: OnceLock<Regex> = OnceLock::new();
    MARKDOWN.get_or_init(|| Regex::new(r"[*_`~#]+").expect("Invalid regex pattern - this is a bug"))
}

fn paragraph_regex() -> &'static Regex {
    static PARAGRAPH: OnceLock<Regex> = OnceLock::new();
    PARAGRAPH.get_or_init(|| {
        Regex::new(r"([.!?])?\s*\n\s*\n\s*").expect("Invalid regex pattern - this is a bug")
    })
}

fn whitespace_regex() -> &'static Regex {
    static WHITESPACE: OnceLock<Regex> = OnceLock::new();
    WHITESPACE.get_or_init(|| Regex::new(r"\s+").expect("Invalid regex pattern - this is a bug"))
}

fn space_before_punct_regex() -> &'static Regex {
    static SPACE_PUNCT: OnceLock<Regex> = OnceLock::new();
    SPACE_PUNCT
        .get_or_init(|| Regex::new(r" ([.,!?;:])").expect("Invalid regex pattern - this is a bug"))
}

fn repeated_period_regex() -> &'static Regex {
    static PERIODS: OnceLock<Regex> = OnceLock::new();
    PERIODS.get_or_init(|| Regex::new(r"\.(?:\s*\.)+").expect("Invalid regex pattern - this is a bug"))
}

/// Remove emoji, including flags, skin tones and joiners.
pub fn strip_emoji(text: &str) -> String {
    emoji_regex().replace_all(text, "").into_owned()
}

/// Remove markdown emphasis, code and heading markers.
pub fn strip_markdown(text: &str) -> String {
    markdown_regex().replace_all(text, "").into_owned()
}

/// Full clean-up pipeline. Text made only of emoji, markdown markers and
/// whitespace comes back empty.
pub fn sanitize_for_speech(text: &str) -> String {
    let stripped = strip_markdown(&strip_emoji(text));
    let trimmed = stripped.trim();
    if trimmed.is_empty() {
        return String::new();
    }

    let sentences = paragraph_regex().replace_all(trimmed, |caps: &Captures| match caps.get(1) {
        Some(punct) => format!("{} ", punct.as_str()),
        None => ". ".to_string(),
    });
    let spaced = whitespace_regex().replace_all(&sentences, " ");
    let tight = space_before_punct_regex().replace_all(&spaced, "$1");
    let periods = repeated_period_regex().replace_all(&tight, ".");
    periods.trim().to_string()
}
