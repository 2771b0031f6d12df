//! Error types for bookmill operations.

use thiserror::Error;

/// Errors that abort an ingestion.
///
/// Recoverable problems (an image that cannot be embedded, an encoding that
/// cannot be detected) are logged instead and never show up here.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("XML parsing error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("Invalid EPUB: {0}")]
    InvalidEpub(String),

    #[error("Invalid MOBI: {0}")]
    InvalidMobi(String),

    #[error("Storage error: {0}")]
    Sink(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
    /// True for failures caused by an unreadable file or a corrupt container.
    pub fn is_io_failure(&self) -> bool {
        matches!(
            self,
            Error::Io(_) | Error::Zip(_) | Error::Xml(_) | Error::InvalidEpub(_) | Error::InvalidMobi(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
