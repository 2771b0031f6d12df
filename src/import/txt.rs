//! Plain-text importer.

use std::fs;
use std::path::{Path, PathBuf};

use crate::book::{Format, UNKNOWN_AUTHOR, title_from_path};
use crate::error::Result;
use crate::import::{Content, Importer};
use crate::util::{decode_text, normalize_newlines};

/// Plain-text importer. The title is the file stem; there is no author.
pub struct TxtImporter {
    path: PathBuf,
    title: String,
}

impl Importer for TxtImporter {
    const FORMAT: Format = Format::Txt;

    fn open(path: &Path) -> Result<Self> {
        // Fail early on missing files, before any content is read.
        fs::metadata(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            title: title_from_path(path),
        })
    }

    fn title(&self) -> &str {
        &self.title
    }

    fn author(&self) -> &str {
        UNKNOWN_AUTHOR
    }

    fn load_content(&mut self) -> Result<Content> {
        let bytes = fs::read(&self.path)?;
        let text = decode_text(&bytes);
        Ok(Content::Text(normalize_newlines(&text)))
    }
}
