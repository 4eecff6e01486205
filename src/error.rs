//! Error types for the extraction pipeline.

use std::io;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for prashn operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur while extracting questions from a document.
///
/// Page-local variants never abort a document: the orchestrator records
/// them against the page and continues. Only [`Error::EngineUnavailable`],
/// undecodable input and caller cancellation end an extraction early.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error when reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The input is neither a PDF nor a supported image format.
    #[error("Unknown file format: not a PDF or supported image")]
    UnknownFormat,

    /// The input was recognized but cannot be decoded at all.
    #[error("Undecodable document: {0}")]
    UndecodableDocument(String),

    /// A page could not be converted to a bitmap.
    #[error("Rasterization failed on page {page}: {reason}")]
    Rasterization { page: u32, reason: String },

    /// A bitmap was malformed for preprocessing.
    #[error("Preprocessing failed on page {page}: {reason}")]
    Preprocess { page: u32, reason: String },

    /// The OCR engine rejected a single page.
    #[error("OCR failed on page {page}: {reason}")]
    Ocr { page: u32, reason: String },

    /// The OCR engine is missing or misconfigured.
    #[error("OCR engine unavailable{}: {reason}", page_context(.page))]
    EngineUnavailable { page: Option<u32>, reason: String },

    /// The per-document time budget ran out before every page was processed.
    #[error("Time budget of {budget:?} exceeded after {processed} of {total} pages")]
    TimeoutExceeded {
        budget: Duration,
        processed: u32,
        total: u32,
    },

    /// The caller cancelled the extraction.
    #[error("Extraction cancelled after {processed} of {total} pages")]
    Cancelled { processed: u32, total: u32 },

    /// A configuration value is out of range.
    #[error("Invalid option: {0}")]
    InvalidOption(String),

    /// Error while serializing a result.
    #[error("Serialization error: {0}")]
    Serialize(String),
}

fn page_context(page: &Option<u32>) -> String {
    match page {
        Some(page) => format!(" (page {})", page),
        None => String::new(),
    }
}

impl Error {
    /// Whether this failure only affects the page it happened on.
    pub fn is_page_local(&self) -> bool {
        matches!(
            self,
            Error::Rasterization { .. } | Error::Preprocess { .. } | Error::Ocr { .. }
        )
    }

    /// Whether this failure must abort the whole document.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::EngineUnavailable { .. }
                | Error::UndecodableDocument(_)
                | Error::UnknownFormat
                | Error::Cancelled { .. }
        )
    }
}

impl From<lopdf::Error> for Error {
    fn from(err: lopdf::Error) -> Self {
        match err {
            lopdf::Error::IO(e) => Error::Io(e),
            _ => Error::UndecodableDocument(err.to_string()),
        }
    }
}

impl From<image::ImageError> for Error {
    fn from(err: image::ImageError) -> Self {
        match err {
            image::ImageError::IoError(e) => Error::Io(e),
            _ => Error::UndecodableDocument(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::Rasterization {
            page: 2,
            reason: "bad stream".to_string(),
        };
        assert_eq!(err.to_string(), "Rasterization failed on page 2: bad stream");

        let err = Error::EngineUnavailable {
            page: Some(3),
            reason: "tesseract not found".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "OCR engine unavailable (page 3): tesseract not found"
        );

        let err = Error::EngineUnavailable {
            page: None,
            reason: "missing hin.traineddata".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "OCR engine unavailable: missing hin.traineddata"
        );
    }

    #[test]
    fn test_taxonomy() {
        let raster = Error::Rasterization {
            page: 1,
            reason: String::new(),
        };
        assert!(raster.is_page_local());
        assert!(!raster.is_fatal());

        let engine = Error::EngineUnavailable {
            page: None,
            reason: String::new(),
        };
        assert!(engine.is_fatal());
        assert!(!engine.is_page_local());

        let timeout = Error::TimeoutExceeded {
            budget: Duration::from_secs(1),
            processed: 1,
            total: 2,
        };
        assert!(!timeout.is_fatal());
        assert!(!timeout.is_page_local());
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }
}
