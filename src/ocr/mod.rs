//! OCR engine seam and the confidence-driven retry loop.
//!
//! The engine itself is an external collaborator behind [`OcrEngine`].
//! [`TesseractCli`] drives the `tesseract` executable; tests plug in fakes.

mod retry;
mod tesseract;

pub use retry::{OcrInvoker, OcrOutcome};
pub use tesseract::{parse_tsv, TesseractCli};

use crate::error::Result;
use crate::preprocess::Profile;
use image::GrayImage;
use serde::{Deserialize, Serialize};

/// Language configuration: Hindi plus an optional Latin fallback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OcrLanguage {
    /// Primary traineddata name
    pub primary: String,

    /// Secondary script tried alongside the primary
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback: Option<String>,
}

impl OcrLanguage {
    /// Hindi only.
    pub fn hindi() -> Self {
        Self {
            primary: "hin".to_string(),
            fallback: None,
        }
    }

    /// Language argument in Tesseract's `lang+lang` form.
    pub fn tesseract_code(&self) -> String {
        match &self.fallback {
            Some(fallback) if !fallback.is_empty() => format!("{}+{}", self.primary, fallback),
            _ => self.primary.clone(),
        }
    }
}

impl Default for OcrLanguage {
    fn default() -> Self {
        Self {
            primary: "hin".to_string(),
            fallback: Some("eng".to_string()),
        }
    }
}

/// Page segmentation modes understood by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageSegMode {
    /// Fully automatic segmentation without orientation detection
    Auto,
    /// A single column of variable-sized text
    SingleColumn,
    /// A single uniform block of text
    #[default]
    SingleBlock,
    /// A single text line
    SingleLine,
    /// Sparse text in no particular order
    SparseText,
}

impl PageSegMode {
    /// Numeric `--psm` value.
    pub fn as_u8(self) -> u8 {
        match self {
            PageSegMode::Auto => 3,
            PageSegMode::SingleColumn => 4,
            PageSegMode::SingleBlock => 6,
            PageSegMode::SingleLine => 7,
            PageSegMode::SparseText => 11,
        }
    }
}

/// One recognized word.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OcrToken {
    pub text: String,

    /// Fraction in `[0, 1]`; `None` when the engine reported no value
    pub confidence: Option<f32>,
}

impl OcrToken {
    pub fn new(text: impl Into<String>, confidence: Option<f32>) -> Self {
        Self {
            text: text.into(),
            confidence,
        }
    }
}

/// Raw engine output for one bitmap.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Recognition {
    pub text: String,
    pub tokens: Vec<OcrToken>,
}

/// External OCR engine.
///
/// Implementations return [`crate::Error::EngineUnavailable`] when the engine
/// is missing or misconfigured and [`crate::Error::Ocr`] when only the given
/// bitmap was rejected.
pub trait OcrEngine: Send + Sync {
    /// Engine name for diagnostics.
    fn name(&self) -> &str;

    /// Recognize a preprocessed bitmap.
    fn recognize(
        &self,
        image: &GrayImage,
        language: &OcrLanguage,
        mode: PageSegMode,
    ) -> Result<Recognition>;
}

/// One OCR invocation on a page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OcrAttempt {
    /// Preprocessing profile the bitmap went through
    pub profile: Profile,

    /// Raw engine text
    pub text: String,

    /// Per-token confidences in engine order
    pub token_confidences: Vec<Option<f32>>,

    /// Mean over the defined confidences only (0.0 when none are defined)
    pub mean_confidence: f32,

    /// 1-based attempt number
    pub attempt: u32,
}

impl OcrAttempt {
    /// Build an attempt from an engine recognition.
    pub fn from_recognition(recognition: Recognition, profile: Profile, attempt: u32) -> Self {
        let token_confidences: Vec<Option<f32>> =
            recognition.tokens.iter().map(|t| t.confidence).collect();
        let mean_confidence = mean_defined(&token_confidences);
        Self {
            profile,
            text: recognition.text,
            token_confidences,
            mean_confidence,
            attempt,
        }
    }

    /// Number of tokens with a defined confidence.
    pub fn scored_tokens(&self) -> usize {
        self.token_confidences.iter().flatten().count()
    }
}

fn mean_defined(values: &[Option<f32>]) -> f32 {
    let (sum, count) = values
        .iter()
        .flatten()
        .fold((0.0f64, 0usize), |(sum, n), &c| (sum + c as f64, n + 1));
    if count == 0 {
        0.0
    } else {
        (sum / count as f64) as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_code() {
        assert_eq!(OcrLanguage::default().tesseract_code(), "hin+eng");
        assert_eq!(OcrLanguage::hindi().tesseract_code(), "hin");
    }

    #[test]
    fn test_psm_values() {
        assert_eq!(PageSegMode::default().as_u8(), 6);
        assert_eq!(PageSegMode::SparseText.as_u8(), 11);
    }

    #[test]
    fn test_mean_ignores_undefined() {
        let recognition = Recognition {
            text: "क ख ग".to_string(),
            tokens: vec![
                OcrToken::new("क", Some(0.9)),
                OcrToken::new("ख", None),
                OcrToken::new("ग", Some(0.5)),
            ],
        };
        let attempt = OcrAttempt::from_recognition(recognition, Profile::Baseline, 1);
        assert!((attempt.mean_confidence - 0.7).abs() < 1e-6);
        assert_eq!(attempt.scored_tokens(), 2);
        assert_eq!(attempt.token_confidences.len(), 3);
    }

    #[test]
    fn test_mean_without_scores_is_zero() {
        let attempt = OcrAttempt::from_recognition(Recognition::default(), Profile::Enhanced, 2);
        assert_eq!(attempt.mean_confidence, 0.0);
        assert_eq!(attempt.scored_tokens(), 0);
    }
}
