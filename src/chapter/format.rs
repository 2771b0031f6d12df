//! Paragraph formatting for chapters extracted from plain text.

use crate::util::html_escape;

/// Indent placed at the start of every paragraph (two ideographic spaces).
pub const PARAGRAPH_INDENT: &str = "\u{3000}\u{3000}";

/// Whether a raw chapter carries enough text to keep.
///
/// Short spans are usually volume headers or table-of-contents lines that
/// happened to match a heading rule.
pub fn is_substantial(raw: &str, min_chars: usize) -> bool {
    raw.trim().chars().take(min_chars).count() >= min_chars
}

/// Wrap every non-blank line of `raw` in an indented `<p>` element.
pub fn format_paragraphs(raw: &str) -> String {
    let mut html = String::with_capacity(raw.len() + raw.len() / 4);
    for line in raw.split('\n').map(str::trim).filter(|l| !l.is_empty()) {
        html.push_str("<p>");
        html.push_str(PARAGRAPH_INDENT);
        html.push_str(&html_escape(line));
        html.push_str("</p>");
    }
    html
}
