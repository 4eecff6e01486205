//! Hindi text normalization.
//!
//! Runs legacy font detection and remapping first, then Devanagari sequence
//! repair until the text stops changing. Both stages are idempotent, so
//! normalizing already normalized text is a no-op.

pub mod legacy;
pub mod matra;

use serde::{Deserialize, Serialize};

use crate::options::ExtractOptions;

/// Normalizer output for one page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NormalizedText {
    /// Repaired text
    pub text: String,

    /// The input was KrutiDev-encoded and has been remapped
    pub legacy_font_detected: bool,

    /// Characters changed by remapping and repair
    pub repaired_chars: usize,

    /// Legacy glyphs with no table entry, left unchanged
    pub unmapped_chars: usize,
}

/// Text normalizer.
#[derive(Debug, Clone)]
pub struct Normalizer {
    legacy_threshold: f32,
    legacy_detection: bool,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self {
            legacy_threshold: 0.35,
            legacy_detection: true,
        }
    }
}

impl Normalizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Normalizer configured from extraction options.
    pub fn from_options(options: &ExtractOptions) -> Self {
        Self::default().with_legacy_threshold(options.legacy_detection_threshold)
    }

    /// Share of signature words needed to treat text as KrutiDev.
    pub fn with_legacy_threshold(mut self, threshold: f32) -> Self {
        self.legacy_threshold = threshold;
        self
    }

    /// Enable or disable legacy font handling.
    pub fn with_legacy_detection(mut self, enabled: bool) -> Self {
        self.legacy_detection = enabled;
        self
    }

    /// Normalize `text`.
    pub fn normalize(&self, text: &str) -> NormalizedText {
        let mut repaired_chars = 0;
        let mut unmapped_chars = 0;
        let legacy_font_detected =
            self.legacy_detection && legacy::detect(text, self.legacy_threshold);

        let unicode = if legacy_font_detected {
            let remapped = legacy::remap(text);
            log::info!(
                "legacy font encoding detected: {} glyphs remapped, {} unmapped",
                remapped.mapped,
                remapped.unmapped
            );
            repaired_chars += remapped.mapped;
            unmapped_chars = remapped.unmapped;
            remapped.text
        } else {
            text.to_string()
        };

        let (text, edits) = matra::repair(&unicode);
        if edits > 0 {
            log::debug!("matra repair made {} edits", edits);
        }
        repaired_chars += edits;

        NormalizedText {
            text,
            legacy_font_detected,
            repaired_chars,
            unmapped_chars,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unicode_passes_through() {
        let out = Normalizer::new().normalize("प्रश्न 1. भारत की राजधानी क्या है?");
        assert_eq!(out.text, "प्रश्न 1. भारत की राजधानी क्या है?");
        assert!(!out.legacy_font_detected);
        assert_eq!(out.repaired_chars, 0);
    }

    #[test]
    fn test_english_heading_passes_through() {
        let out = Normalizer::new().normalize("GENERAL AWARENESS PAPER QUIZ SECTION");
        assert!(!out.legacy_font_detected);
        assert_eq!(out.text, "GENERAL AWARENESS PAPER QUIZ SECTION");
    }

    #[test]
    fn test_legacy_page_is_converted() {
        let out = Normalizer::new().normalize("iz'u 1- Hkkjr dh jkt/kkuh D;k gS\\\n¼d½ eqacbZ\n¼[k½ fnYyh");
        assert!(out.legacy_font_detected);
        assert_eq!(
            out.text,
            "प्रश्न 1. भारत की राजधानी क्या है?\n(क) मुंबई\n(ख) दिल्ली"
        );
        assert!(out.repaired_chars > 0);
    }

    #[test]
    fn test_legacy_detection_can_be_disabled() {
        let out = Normalizer::new()
            .with_legacy_detection(false)
            .normalize("Hkkjr dh jkt/kkuh D;k gS\\ Hkkjr dh jkt/kkuh");
        assert!(!out.legacy_font_detected);
        assert!(out.text.starts_with("Hkkjr"));
    }

    #[test]
    fn test_idempotent() {
        let normalizer = Normalizer::new();
        let samples = [
            "iz'u 1- Hkkjr dh jkt/kkuh D;k gS\\",
            "\u{093F}कताब क\u{093E}\u{0947}न |",
            "Q. What is 2 + 2? A) 3 B) 4",
            "",
        ];
        for sample in samples {
            let once = normalizer.normalize(sample);
            let twice = normalizer.normalize(&once.text);
            assert_eq!(once.text, twice.text, "not idempotent for {:?}", sample);
            assert!(!twice.legacy_font_detected);
        }
    }
}
