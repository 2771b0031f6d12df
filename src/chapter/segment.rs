//! Chapter boundary assignment over normalized text.
//!
//! Ranges are byte offsets into the text and always sit on `char`
//! boundaries. Length limits are counted in characters.

use memchr::{memchr, memrchr};
use regex::Regex;

/// Title of the synthetic chapter holding text before the first heading.
pub const PREFACE_TITLE: &str = "Preface";

/// Title stem for chunks of text with no detectable headings.
pub const NUMBERED_TITLE_BASE: &str = "第";

/// A half-open slice of the normalized text that will become one chapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChapterRange {
    pub title: String,
    pub start: usize,
    pub end: usize,
}

impl ChapterRange {
    pub fn new(title: impl Into<String>, start: usize, end: usize) -> Self {
        Self {
            title: title.into(),
            start,
            end,
        }
    }

    pub fn slice<'a>(&self, text: &'a str) -> &'a str {
        &text[self.start..self.end]
    }
}

/// How split points are chosen for oversized ranges.
#[derive(Debug, Clone, Copy)]
pub struct SplitPolicy {
    /// Maximum chunk length in characters.
    pub max_len: usize,
    /// How far past the naive cut a line break may lie and still be used.
    pub tolerance: usize,
}

/// How chunk titles are derived when a range is split.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplitTitles {
    /// `"<title> (<part>)"`
    Parts,
    /// `"<title><n>章"`
    Numbered,
}

/// Segment `text` at every match of `heading`.
///
/// Ranges longer than `policy.max_len` characters are split into parts.
pub fn segment_with_rule(text: &str, heading: &Regex, policy: SplitPolicy) -> Vec<ChapterRange> {
    let mut ranges: Vec<ChapterRange> = Vec::new();

    for (i, m) in heading.find_iter(text).enumerate() {
        let start = m.start();

        if i == 0 && start > 0 && !text[..start].trim().is_empty() {
            ranges.push(ChapterRange::new(PREFACE_TITLE, 0, start));
        }

        if let Some(prev) = ranges.last_mut() {
            prev.end = start;
        }

        ranges.push(ChapterRange::new(m.as_str().trim(), start, text.len()));
    }

    let mut out = Vec::with_capacity(ranges.len());
    for range in ranges {
        if char_len(range.slice(text)) > policy.max_len {
            out.extend(split_range(text, &range, policy, SplitTitles::Parts));
        } else {
            out.push(range);
        }
    }
    out
}

/// Segment `text` that has no recognisable headings into numbered chunks.
pub fn segment_without_rule(text: &str, policy: SplitPolicy) -> Vec<ChapterRange> {
    let whole = ChapterRange::new(NUMBERED_TITLE_BASE, 0, text.len());
    split_range(text, &whole, policy, SplitTitles::Numbered)
}

/// Cut `range` into chunks of at most `policy.max_len` characters, preferring
/// to cut at line breaks.
///
/// For each chunk the first line break at or after the naive cut is used if
/// it lies within `policy.tolerance` characters; otherwise the last line break
/// before the naive cut (but after the chunk start), otherwise the naive cut
/// itself.
pub fn split_range(
    text: &str,
    range: &ChapterRange,
    policy: SplitPolicy,
    titles: SplitTitles,
) -> Vec<ChapterRange> {
    let bytes = text.as_bytes();
    let max_len = policy.max_len.max(1);
    let mut chunks = Vec::new();
    let mut pos = range.start;

    while pos < range.end {
        let naive = advance_chars(text, pos, max_len);

        let cut = if naive >= range.end {
            range.end
        } else if let Some(next) = memchr(b'\n', &bytes[naive..range.end])
            .filter(|&off| char_len_below(&text[naive..naive + off], policy.tolerance))
        {
            naive + next
        } else if let Some(prev) = memrchr(b'\n', &bytes[pos + 1..=naive]) {
            pos + 1 + prev
        } else {
            naive
        };

        let n = chunks.len() + 1;
        let title = match titles {
            SplitTitles::Parts => format!("{} ({n})", range.title),
            SplitTitles::Numbered => format!("{}{n}章", range.title),
        };
        chunks.push(ChapterRange::new(title, pos, cut));
        pos = cut;
    }

    chunks
}

/// Number of characters in `s`.
pub fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// True when `s` holds fewer than `limit` characters, without counting past
/// the limit.
fn char_len_below(s: &str, limit: usize) -> bool {
    s.len() < limit || s.chars().take(limit).count() < limit
}

/// Byte offset reached after stepping `n` characters forward from `from`
/// (clamped to the end of `text`).
fn advance_chars(text: &str, from: usize, n: usize) -> usize {
    match text[from..].char_indices().nth(n) {
        Some((idx, _)) => from + idx,
        None => text.len(),
    }
}
