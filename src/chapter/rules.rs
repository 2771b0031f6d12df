//! Chapter heading rules for unstructured text.
//!
//! Uses LazyLock to compile the catalog once on first use; the table is
//! read-only and shared by every ingestion.

use regex::Regex;
use std::sync::LazyLock;

/// A pattern that recognises chapter-heading lines.
#[derive(Debug)]
pub struct TocRule {
    pub pattern: &'static str,
    pub enabled: bool,
    regex: Regex,
}

impl TocRule {
    fn new(pattern: &'static str, enabled: bool) -> Self {
        let regex = Regex::new(&format!("(?m){pattern}")).unwrap();
        Self {
            pattern,
            enabled,
            regex,
        }
    }

    /// The compiled pattern, in multi-line mode.
    pub fn regex(&self) -> &Regex {
        &self.regex
    }

    /// Number of non-overlapping matches in `text`.
    pub fn count_matches(&self, text: &str) -> usize {
        self.regex.find_iter(text).count()
    }
}

/// The rule catalog, in priority order.
pub static TOC_RULES: LazyLock<Vec<TocRule>> = LazyLock::new(|| {
    vec![
        TocRule::new(r"^\s*[第卷][0-9一二三四五六七八九十百千万]+[章卷].*$", true),
        TocRule::new(r"^\s*(Chapter|CHAPTER)\s*[0-9]+.*$", true),
        TocRule::new(r"^\s*第\s*[0-9]+\s*章.*$", true),
        TocRule::new(r"^\s*第\s*[0-9]+\s*节.*$", true),
        TocRule::new(r"^\s*Book\s*[0-9]+.*$", true),
        TocRule::new(r"^\s*Part\s*[0-9]+.*$", true),
    ]
});

/// Pick the rule that best fits `text`, looking at its first `sample_len`
/// characters only.
///
/// A rule takes over when its match count is at least the best count seen so
/// far (seeded at 1), so zero-match rules never win and, on a tie, the rule
/// that comes later in the catalog is kept.
pub fn find_toc_rule(text: &str, sample_len: usize) -> Option<&'static TocRule> {
    let sample = char_prefix(text, sample_len);

    let mut max_count = 1;
    let mut best = None;

    for rule in TOC_RULES.iter().filter(|r| r.enabled) {
        let count = rule.count_matches(sample);
        if count >= max_count {
            max_count = count;
            best = Some(rule);
        }
    }

    if let Some(rule) = best {
        log::debug!("TOC rule {:?} matched {} times", rule.pattern, max_count);
    }
    best
}

/// The longest prefix of `text` holding at most `max_chars` characters.
pub fn char_prefix(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
