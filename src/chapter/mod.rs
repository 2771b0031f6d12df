//! Chapter segmentation for unstructured text.
//!
//! The pipeline is:
//! 1. [`rules::find_toc_rule`] picks the heading pattern that fits the text
//! 2. [`segment`] turns the matches (or their absence) into [`ChapterRange`]s
//! 3. [`format`] drops near-empty ranges and renders the rest as paragraphs

pub mod format;
pub mod rules;
pub mod segment;

pub use rules::{TOC_RULES, TocRule, find_toc_rule};
pub use segment::{ChapterRange, PREFACE_TITLE, SplitPolicy};

use crate::book::Chapter;

/// Tunables for chapter detection. The defaults match the limits long-form
/// web novels are tuned for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChapterOptions {
    /// Ranges found by a heading rule are split above this many characters.
    pub max_len_with_toc: usize,
    /// Chunk size for text where no heading rule matched.
    pub max_len_without_toc: usize,
    /// How far past a chunk boundary a line break may be and still be used.
    pub split_tolerance: usize,
    /// Only this many leading characters are used to pick a heading rule.
    pub sample_len: usize,
    /// Chapters with fewer trimmed characters than this are dropped.
    pub min_chapter_chars: usize,
}

impl Default for ChapterOptions {
    fn default() -> Self {
        Self {
            max_len_with_toc: 100 * 1024,
            max_len_without_toc: 10 * 1024,
            split_tolerance: 1000,
            sample_len: 512_000,
            min_chapter_chars: 30,
        }
    }
}

/// Find chapter boundaries in `text` without formatting anything.
pub fn segment(text: &str, options: &ChapterOptions) -> Vec<ChapterRange> {
    match find_toc_rule(text, options.sample_len) {
        Some(rule) => segment::segment_with_rule(
            text,
            rule.regex(),
            SplitPolicy {
                max_len: options.max_len_with_toc,
                tolerance: options.split_tolerance,
            },
        ),
        None => {
            log::debug!("no TOC rule matched, splitting by length");
            segment::segment_without_rule(
                text,
                SplitPolicy {
                    max_len: options.max_len_without_toc,
                    tolerance: options.split_tolerance,
                },
            )
        }
    }
}

/// Split normalized `text` into formatted chapters.
///
/// The ranges borrow `text` only while this runs; the returned chapters own
/// their strings.
pub fn chapterize(text: &str, options: &ChapterOptions) -> Vec<Chapter> {
    segment(text, options)
        .into_iter()
        .filter_map(|range| {
            let raw = range.slice(text);
            format::is_substantial(raw, options.min_chapter_chars)
                .then(|| Chapter::new(range.title, format::format_paragraphs(raw)))
        })
        .collect()
}
