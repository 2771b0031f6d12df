//! Flattening of MOBI HTML into plain text lines.

use std::sync::LazyLock;

use regex::Regex;

use crate::util::decode_entities;

static BLOCK_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)</?(?:p|div|br|h[1-6])\b[^>]*>").unwrap());

static ANY_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").unwrap());

/// Turn MOBI markup into text: block tags become line breaks, every other
/// tag is dropped, then character references are decoded.
pub fn strip_markup(html: &str) -> String {
    let lines = BLOCK_TAG.replace_all(html, "\n");
    let text = ANY_TAG.replace_all(&lines, "");
    decode_entities(&text).into_owned()
}
