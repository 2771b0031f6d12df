//! EPUB container parsing and chapter markup helpers.

pub mod assets;
mod parser;

use std::collections::HashMap;

use percent_encoding::percent_decode_str;

pub use assets::{AssetSource, inline_images};
pub use parser::{NavPoint, Package, parse_container_xml, parse_ncx, parse_opf, strip_bom};

/// A manifest item. `href` is the full path inside the archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestEntry {
    pub id: String,
    pub href: String,
    pub media_type: String,
}

/// The OPF manifest, indexed both by id and by archive path.
#[derive(Debug, Default)]
pub struct Manifest {
    entries: HashMap<String, ManifestEntry>,
    by_path: HashMap<String, String>,
}

impl Manifest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entry; a later entry with the same id replaces the earlier one.
    pub fn insert(&mut self, entry: ManifestEntry) {
        if let Some(old) = self.entries.get(&entry.id) {
            self.by_path.remove(&old.href);
        }
        self.by_path.insert(entry.href.clone(), entry.id.clone());
        self.entries.insert(entry.id.clone(), entry);
    }

    pub fn get(&self, id: &str) -> Option<&ManifestEntry> {
        self.entries.get(id)
    }

    /// Look an entry up by its normalized archive path.
    pub fn by_path(&self, path: &str) -> Option<&ManifestEntry> {
        self.by_path.get(path).and_then(|id| self.entries.get(id))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Resolve a relative href against the archive path of the file containing
/// it.
///
/// For example, if base is "OEBPS/text/ch01.xhtml" and relative is
/// "../images/a%20b.jpg", the result is "OEBPS/images/a b.jpg". The href is
/// percent-decoded, `.` and `..` segments are folded, and a leading `/` means
/// the archive root.
pub fn resolve_href(base: &str, relative: &str) -> String {
    let decoded = percent_decode_str(relative).decode_utf8_lossy();

    let mut segments: Vec<&str> = Vec::new();
    if !decoded.starts_with('/') {
        segments.extend(base.split('/'));
        // Drop the file name of the base.
        segments.pop();
    }

    for part in decoded.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            _ => segments.push(part),
        }
    }

    segments.retain(|s| !s.is_empty());
    segments.join("/")
}

/// The inner markup of `<body>`, or the whole document when there is none.
pub fn body_fragment(markup: &str) -> &str {
    let Some(open) = find_ignore_case(markup, "<body", 0) else {
        return markup;
    };
    let Some(open_end) = markup[open..].find('>').map(|i| open + i + 1) else {
        return markup;
    };
    let close = rfind_ignore_case(markup, "</body").filter(|&c| c >= open_end);
    match close {
        Some(close) => markup[open_end..close].trim(),
        None => markup[open_end..].trim(),
    }
}

fn find_ignore_case(haystack: &str, needle: &str, from: usize) -> Option<usize> {
    haystack.as_bytes()[from..]
        .windows(needle.len())
        .position(|w| w.eq_ignore_ascii_case(needle.as_bytes()))
        .map(|i| from + i)
}

fn rfind_ignore_case(haystack: &str, needle: &str) -> Option<usize> {
    haystack
        .as_bytes()
        .windows(needle.len())
        .rposition(|w| w.eq_ignore_ascii_case(needle.as_bytes()))
}
