//! Ingestion front door: path in, [`IngestedBook`] out.

use std::path::Path;

use crate::book::{Book, Format, IngestedBook};
use crate::chapter::{ChapterOptions, chapterize};
use crate::error::{Error, Result};
use crate::import::{Content, EpubImporter, Importer, MobiImporter, TxtImporter};

/// Storage for finished books.
///
/// `save` is called at most once per ingestion, and only after the whole book
/// has been built.
pub trait BookSink {
    type Id;
    type Error: std::error::Error + Send + Sync + 'static;

    fn save(&mut self, book: &IngestedBook) -> std::result::Result<Self::Id, Self::Error>;
}

/// Ingest a book file with the default chapter options.
///
/// # Example
///
/// ```no_run
/// let ingested = bookmill::ingest("novel.txt")?;
/// println!("{} chapters", ingested.book.chapters.len());
/// # Ok::<(), bookmill::Error>(())
/// ```
pub fn ingest(path: impl AsRef<Path>) -> Result<IngestedBook> {
    ingest_with(path, &ChapterOptions::default())
}

/// Ingest a book file, choosing the importer by extension.
pub fn ingest_with(path: impl AsRef<Path>, options: &ChapterOptions) -> Result<IngestedBook> {
    let path = path.as_ref();
    let format = Format::from_path(path)
        .ok_or_else(|| Error::UnsupportedFormat(path.display().to_string()))?;

    log::info!("ingesting {} as {format}", path.display());

    let book = match format {
        Format::Txt => import::<TxtImporter>(path, options)?,
        Format::Epub => import::<EpubImporter>(path, options)?,
        Format::Mobi => import::<MobiImporter>(path, options)?,
    };

    log::info!(
        "{:?} by {:?}: {} chapters",
        book.title,
        book.author,
        book.chapters.len()
    );

    Ok(IngestedBook {
        book,
        source_path: path.to_path_buf(),
        format,
    })
}

/// Ingest a book and hand it to `sink`.
///
/// The sink sees nothing unless ingestion succeeded in full.
pub fn ingest_into<S: BookSink>(path: impl AsRef<Path>, sink: &mut S) -> Result<S::Id> {
    ingest_into_with(path, &ChapterOptions::default(), sink)
}

/// [`ingest_into`] with explicit chapter options.
pub fn ingest_into_with<S: BookSink>(
    path: impl AsRef<Path>,
    options: &ChapterOptions,
    sink: &mut S,
) -> Result<S::Id> {
    let ingested = ingest_with(path, options)?;
    sink.save(&ingested).map_err(|e| Error::Sink(Box::new(e)))
}

/// Run one importer to completion.
pub fn import<I: Importer>(path: &Path, options: &ChapterOptions) -> Result<Book> {
    let mut importer = I::open(path)?;

    let chapters = match importer.load_content()? {
        Content::Text(text) => chapterize(&text, options),
        Content::Chapters(chapters) => chapters,
    };

    Ok(Book::new(importer.title(), importer.author())
        .with_cover(importer.cover())
        .with_chapters(chapters))
}
