//! # bookmill
//!
//! Ingestion of TXT, EPUB and MOBI files into a uniform [`Book`]: title,
//! author, optional cover and an ordered list of HTML chapters.
//!
//! ## Features
//!
//! - Encoding detection for plain text (UTF-8/16 BOMs, GBK, Big5, Shift_JIS, ...)
//! - Chapter detection from heading lines such as `第一章` or `Chapter 12`,
//!   with length-based splitting when a book has none
//! - EPUB spine extraction with images embedded as `data:` URIs
//! - Legacy MOBI text extraction (uncompressed, PalmDOC and HUFF/CDIC)
//!
//! ## Quick Start
//!
//! ```no_run
//! use bookmill::ingest;
//!
//! let ingested = ingest("novel.txt").unwrap();
//! for chapter in &ingested.book.chapters {
//!     println!("{}", chapter.title);
//! }
//! ```
//!
//! ## Chapter detection on its own
//!
//! ```
//! use bookmill::{ChapterOptions, chapterize};
//!
//! let filler = "天色渐晚，城门将闭。少年背着行囊，站在长街尽头，回望来路。";
//! let text = format!("第一章 开始\n{filler}\n第二章 继续\n{filler}\n");
//! let chapters = chapterize(&text, &ChapterOptions::default());
//!
//! assert_eq!(chapters.len(), 2);
//! assert_eq!(chapters[1].title, "第二章 继续");
//! ```

pub mod book;
pub mod chapter;
pub mod epub;
pub mod error;
pub mod import;
pub mod ingest;
pub mod mobi;
pub mod util;

pub use book::{Book, Chapter, Cover, Format, IngestedBook};
pub use chapter::{ChapterOptions, chapterize};
pub use error::{Error, Result};
pub use ingest::{BookSink, ingest, ingest_into, ingest_into_with, ingest_with};
