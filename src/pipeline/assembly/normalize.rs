use std::sync::LazyLock;

use regex::Regex;

use crate::models::MessageSegment;

/// Three or more line breaks, with only horizontal whitespace between them.
static BLANK_LINE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n[ \t]*\n(?:[ \t]*\n)+").unwrap());

/// Collapse runs of blank lines to a single blank line in text segments.
/// Entity segments are left untouched so display text stays exact.
pub fn normalize_whitespace(segments: Vec<MessageSegment>) -> Vec<MessageSegment> {
    segments
        .into_iter()
        .map(|segment| match segment {
            MessageSegment::Text { content } => MessageSegment::Text {
                content: collapse_blank_lines(&content),
            },
            other => other,
        })
        .collect()
}

pub fn collapse_blank_lines(text: &str) -> String {
    BLANK_LINE_RUN.replace_all(text, "\n\n").into_owned()
}
