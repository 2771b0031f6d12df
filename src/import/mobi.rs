//! MOBI importer.
//!
//! The text stream is flattened to plain text and goes through the same
//! chapter detection as `.txt` files.

use std::fs;
use std::path::Path;

use crate::book::{Cover, Format, UNKNOWN_AUTHOR, title_from_path};
use crate::error::Result;
use crate::import::{Content, Importer};
use crate::mobi::{MobiFile, strip_markup};
use crate::util::normalize_newlines;

/// MOBI importer. The whole file is read into memory on `open`.
pub struct MobiImporter {
    file: MobiFile,
    title: String,
    author: String,
}

impl Importer for MobiImporter {
    const FORMAT: Format = Format::Mobi;

    fn open(path: &Path) -> Result<Self> {
        let data = fs::read(path)?;
        let file = MobiFile::parse(data)?;

        let title = file
            .title()
            .map(str::to_string)
            .unwrap_or_else(|| title_from_path(path));
        let author = file.author().unwrap_or(UNKNOWN_AUTHOR).to_string();

        Ok(Self {
            file,
            title,
            author,
        })
    }

    fn title(&self) -> &str {
        &self.title
    }

    fn author(&self) -> &str {
        &self.author
    }

    fn cover(&self) -> Option<Cover> {
        self.file.cover()
    }

    fn load_content(&mut self) -> Result<Content> {
        let markup = self.file.markup()?;
        let text = strip_markup(&normalize_newlines(&markup));
        Ok(Content::Text(text))
    }
}
