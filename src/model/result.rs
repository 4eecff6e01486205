//! Extraction result types.

use super::{PageKind, Question};
use crate::preprocess::Profile;
use serde::{Deserialize, Serialize};

/// Final output of an extraction run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractionResult {
    /// Normalized text of all pages, separated by page-break lines
    pub full_text: String,

    /// Detected questions in document order
    pub questions: Vec<Question>,

    /// Token-weighted mean confidence over all processed pages, in `[0, 1]`
    pub overall_confidence: f32,

    /// Set when confidence is low, no question was found, or work was cut short
    pub low_confidence_warning: bool,

    /// The time budget ran out and some pages were skipped
    #[serde(default)]
    pub timed_out: bool,

    /// Per-page diagnostics in page order
    #[serde(default)]
    pub pages: Vec<PageReport>,
}

impl ExtractionResult {
    /// Number of pages in the source document.
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Pages that contributed no text because of a failure or skip.
    pub fn failed_pages(&self) -> Vec<u32> {
        self.pages
            .iter()
            .filter(|p| p.failure.is_some())
            .map(|p| p.page)
            .collect()
    }

    /// Whether every page was processed without a page-local failure.
    pub fn is_complete(&self) -> bool {
        !self.timed_out && self.pages.iter().all(|p| p.failure.is_none())
    }
}

/// What happened to one page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageReport {
    /// Page number (1-indexed)
    pub page: u32,

    /// Classification outcome
    pub kind: PageKind,

    /// Mean OCR confidence of the kept attempt (1.0 for text layers)
    pub confidence: f32,

    /// Tokens with a defined confidence, used as the page's weight
    pub tokens: usize,

    /// OCR invocations made for this page
    pub attempts: u32,

    /// Preprocessing profile of the kept attempt
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<Profile>,

    /// Resolution the page was rasterized at
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dpi: Option<u32>,

    /// Legacy font encoding was detected and remapped
    #[serde(default)]
    pub legacy_font: bool,

    /// Characters changed by the normalizer
    #[serde(default)]
    pub repaired_chars: usize,

    /// Text layer could not be read during classification
    #[serde(default)]
    pub flagged: bool,

    /// Page-local failure, if the page contributed no text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<String>,
}

impl PageReport {
    /// Empty report for a page that has not contributed yet.
    pub fn new(page: u32, kind: PageKind) -> Self {
        Self {
            page,
            kind,
            confidence: 0.0,
            tokens: 0,
            attempts: 0,
            profile: None,
            dpi: None,
            legacy_font: false,
            repaired_chars: 0,
            flagged: false,
            failure: None,
        }
    }

    /// Report for a page that produced nothing.
    pub fn failed(page: u32, kind: PageKind, reason: impl Into<String>) -> Self {
        Self {
            failure: Some(reason.into()),
            ..Self::new(page, kind)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failed_pages() {
        let ok = PageReport::new(1, PageKind::TextNative);
        let result = ExtractionResult {
            pages: vec![ok, PageReport::failed(2, PageKind::ScanNative, "corrupt")],
            ..Default::default()
        };
        assert_eq!(result.failed_pages(), vec![2]);
        assert!(!result.is_complete());
        assert_eq!(result.page_count(), 2);
    }

    #[test]
    fn test_serialized_top_level_keys() {
        let json = serde_json::to_value(ExtractionResult::default()).unwrap();
        for key in [
            "full_text",
            "questions",
            "overall_confidence",
            "low_confidence_warning",
        ] {
            assert!(json.get(key).is_some(), "missing key {}", key);
        }
    }
}
