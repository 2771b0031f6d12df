use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;

/// Author recorded when the source declares none.
pub const UNKNOWN_AUTHOR: &str = "Unknown";

/// A normalized book: the unit handed across the ingestion boundary.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Book {
    pub title: String,
    pub author: String,
    pub cover: Option<Cover>,
    pub chapters: Vec<Chapter>,
}

/// A chapter with its title and HTML body fragment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Chapter {
    pub title: String,
    pub content: String,
}

/// Cover image bytes with their media type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Cover {
    pub media_type: String,
    #[serde(skip)]
    pub data: Vec<u8>,
}

/// Source formats understood by the importers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    Txt,
    Epub,
    Mobi,
}

/// A book together with where it came from, ready for storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngestedBook {
    pub book: Book,
    pub source_path: PathBuf,
    pub format: Format,
}

impl Book {
    pub fn new(title: impl Into<String>, author: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            author: author.into(),
            ..Default::default()
        }
    }

    pub fn with_cover(mut self, cover: Option<Cover>) -> Self {
        self.cover = cover;
        self
    }

    pub fn with_chapters(mut self, chapters: Vec<Chapter>) -> Self {
        self.chapters = chapters;
        self
    }
}

impl Chapter {
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
        }
    }
}

impl Format {
    /// Detect the format from a file extension (case-insensitive).
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "txt" => Some(Format::Txt),
            "epub" => Some(Format::Epub),
            "mobi" => Some(Format::Mobi),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Format::Txt => "txt",
            Format::Epub => "epub",
            Format::Mobi => "mobi",
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Book title derived from a file name: the stem, without extension.
pub fn title_from_path(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}
