//! Format importers for reading ebook files.
//!
//! Each importer reads the metadata of one source format on `open` and
//! produces its content on demand. Content comes in one of two shapes:
//! - **Text**: unstructured text that still needs chapter detection
//! - **Chapters**: chapters already delimited by the container

mod epub;
mod mobi;
mod txt;

pub use epub::EpubImporter;
pub use mobi::MobiImporter;
pub use txt::TxtImporter;

use std::path::Path;

use crate::book::{Chapter, Cover, Format};
use crate::error::Result;

/// What an importer hands back for the body of the book.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Content {
    /// Normalized text (`\n` line endings) awaiting chapter detection.
    Text(String),
    /// Chapters taken directly from the container structure.
    Chapters(Vec<Chapter>),
}

/// Polymorphic interface for format-specific backends.
pub trait Importer: Sized {
    /// The format this importer reads.
    const FORMAT: Format;

    /// Open a file and read its metadata.
    fn open(path: &Path) -> Result<Self>;

    /// Book title, already resolved against the file-name fallback.
    fn title(&self) -> &str;

    /// Book author, `"Unknown"` when the source declares none.
    fn author(&self) -> &str;

    /// Cover image, when the format carries one.
    fn cover(&self) -> Option<Cover> {
        None
    }

    /// Extract the book body.
    fn load_content(&mut self) -> Result<Content>;
}
