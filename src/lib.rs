//! # prashn
//!
//! Extract structured Hindi multiple-choice questions from scanned and
//! digital PDFs and from photographed pages.
//!
//! ## Quick Start
//!
//! ```no_run
//! use prashn::{extract_file, render, JsonFormat};
//!
//! fn main() -> prashn::Result<()> {
//!     let result = extract_file("question-paper.pdf")?;
//!     if result.low_confidence_warning {
//!         eprintln!("low confidence, consider re-scanning");
//!     }
//!     println!("{}", render::to_json(&result, JsonFormat::Pretty)?);
//!     Ok(())
//! }
//! ```
//!
//! ## Pipeline
//!
//! - **Classification**: text-layer pages are read directly, the rest are rasterized
//! - **Preprocessing**: denoise, deskew, binarize, with stronger profiles on retry
//! - **OCR**: Tesseract (`hin` + `eng`), retried while confidence is low
//! - **Normalization**: legacy KrutiDev remapping and matra repair
//! - **Detection**: an explicit state machine segments questions, options and answers
//!
//! Pages are processed in parallel by a bounded worker pool; detection runs
//! once over the page-ordered text.

pub mod backend;
pub mod classify;
pub mod detect;
pub mod error;
pub mod mcq;
pub mod model;
pub mod normalize;
pub mod ocr;
pub mod options;
pub mod pipeline;
pub mod preprocess;
pub mod raster;
pub mod render;

// Re-export commonly used types
pub use backend::{open_backend, DocumentBackend, ImageBackend, LopdfBackend};
pub use classify::{Classifier, PageClassification};
pub use detect::{detect_kind_from_bytes, detect_kind_from_path, DocumentKind, ImageFormat};
pub use error::{Error, Result};
pub use mcq::McqDetector;
pub use model::{
    Document, ExtractionResult, Page, PageContent, PageKind, PageReport, Question, QuestionOption,
};
pub use normalize::{NormalizedText, Normalizer};
pub use ocr::{
    OcrAttempt, OcrEngine, OcrInvoker, OcrLanguage, OcrOutcome, OcrToken, PageSegMode,
    Recognition, TesseractCli,
};
pub use options::ExtractOptions;
pub use pipeline::{CancellationToken, Extractor};
pub use preprocess::{Preprocessor, Profile};
pub use raster::Rasterizer;
pub use render::JsonFormat;

use std::path::Path;
use std::sync::Arc;

/// Extract questions from a PDF or image file with default options.
///
/// # Example
///
/// ```no_run
/// use prashn::extract_file;
///
/// let result = extract_file("paper.pdf").unwrap();
/// for q in &result.questions {
///     println!("{}. {}", q.question_number, q.question_text);
/// }
/// ```
pub fn extract_file<P: AsRef<Path>>(path: P) -> Result<ExtractionResult> {
    extract_file_with_options(path, ExtractOptions::default())
}

/// Extract questions from a file with custom options, using the Tesseract
/// executable on `PATH`.
///
/// # Example
///
/// ```no_run
/// use prashn::{extract_file_with_options, ExtractOptions};
/// use std::time::Duration;
///
/// let options = ExtractOptions::new()
///     .with_dpi(400)
///     .with_time_budget(Duration::from_secs(60));
/// let result = extract_file_with_options("scan.png", options).unwrap();
/// ```
pub fn extract_file_with_options<P: AsRef<Path>>(
    path: P,
    options: ExtractOptions,
) -> Result<ExtractionResult> {
    let document = Document::open(path)?;
    extract_document(&document, options)
}

/// Extract questions from in-memory bytes.
///
/// `mime_hint` is consulted only when the bytes are not self-describing.
pub fn extract_bytes(
    data: &[u8],
    mime_hint: Option<&str>,
    options: ExtractOptions,
) -> Result<ExtractionResult> {
    let document = Document::from_bytes(data, mime_hint)?;
    extract_document(&document, options)
}

fn extract_document(document: &Document, options: ExtractOptions) -> Result<ExtractionResult> {
    let engine = TesseractCli::new();
    engine.probe(&options.language)?;
    Extractor::new(Arc::new(engine))
        .with_options(options)
        .extract(document)
}

/// Segment already normalized text into questions.
///
/// Pages may be separated by lines holding only a form feed (U+000C).
///
/// # Example
///
/// ```
/// let questions = prashn::detect_questions("प्रश्न 1. कौन?\nA) राम\nB) श्याम\nउत्तर: A");
/// assert_eq!(questions.len(), 1);
/// assert_eq!(questions[0].correct_answer.as_deref(), Some("A"));
/// ```
pub fn detect_questions(text: &str) -> Vec<Question> {
    McqDetector::new().detect(text)
}

/// Normalize OCR or text-layer output with default settings.
pub fn normalize_text(text: &str) -> NormalizedText {
    Normalizer::new().normalize(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_bytes_empty_data() {
        let result = extract_bytes(&[], None, ExtractOptions::default());
        assert!(matches!(result, Err(Error::UnknownFormat)));
    }

    #[test]
    fn test_extract_bytes_unknown_magic() {
        let data = b"<!DOCTYPE html><html></html>";
        let result = extract_bytes(data, None, ExtractOptions::default());
        assert!(matches!(result, Err(Error::UnknownFormat)));
    }

    #[test]
    fn test_invalid_options_rejected_before_work() {
        let options = ExtractOptions::new().with_ocr_confidence_threshold(70.0);
        assert!(matches!(options.validate(), Err(Error::InvalidOption(_))));
    }

    #[test]
    fn test_detect_and_normalize_helpers() {
        let normalized = normalize_text("प्रश्न 1. कौन है |\nA) राम\nB) श्याम");
        assert!(normalized.text.contains('।'));
        let questions = detect_questions(&normalized.text);
        assert_eq!(questions.len(), 1);
        assert_eq!(questions[0].options.len(), 2);
    }
}
