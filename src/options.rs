//! Extraction options and configuration.

use crate::error::{Error, Result};
use crate::ocr::{OcrLanguage, PageSegMode};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Options for extracting questions from a document.
///
/// All confidence values are fractions in `[0, 1]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractOptions {
    /// Rasterization resolution for scanned pages
    pub dpi: u32,

    /// Resolution used instead of `dpi` under memory pressure
    pub degraded_dpi: u32,

    /// Mean OCR confidence below which a stronger profile is tried
    pub ocr_confidence_threshold: f32,

    /// Maximum OCR invocations per page
    pub max_ocr_attempts: u32,

    /// Overall confidence below which the result carries a warning
    pub overall_confidence_warning_threshold: f32,

    /// Wall-clock budget for a whole document
    #[serde(with = "duration_secs", rename = "per_document_time_budget_secs")]
    pub per_document_time_budget: Duration,

    /// Minimum text-layer characters per square inch for a text-native page
    pub min_text_density: f32,

    /// Number of page workers (0 = one per CPU)
    pub workers: usize,

    /// Concurrent OCR engine invocations (0 = one per CPU)
    pub ocr_instances: usize,

    /// Memory available for in-flight bitmaps, in MB
    pub memory_budget_mb: u32,

    /// OCR language configuration
    pub language: OcrLanguage,

    /// OCR page segmentation mode
    pub page_segmentation: PageSegMode,

    /// Share of legacy-looking words needed to treat text as legacy-font encoded
    pub legacy_detection_threshold: f32,
}

impl ExtractOptions {
    /// Create new options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load options from a JSON file. Missing keys keep their defaults.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let data = std::fs::read_to_string(path)?;
        let options: Self = serde_json::from_str(&data)
            .map_err(|e| Error::InvalidOption(format!("config file: {}", e)))?;
        options.validate()?;
        Ok(options)
    }

    /// Set the rasterization DPI.
    pub fn with_dpi(mut self, dpi: u32) -> Self {
        self.dpi = dpi;
        self
    }

    /// Set the DPI used under memory pressure.
    pub fn with_degraded_dpi(mut self, dpi: u32) -> Self {
        self.degraded_dpi = dpi;
        self
    }

    /// Set the per-page OCR retry threshold.
    pub fn with_ocr_confidence_threshold(mut self, threshold: f32) -> Self {
        self.ocr_confidence_threshold = threshold;
        self
    }

    /// Set the maximum OCR attempts per page.
    pub fn with_max_ocr_attempts(mut self, attempts: u32) -> Self {
        self.max_ocr_attempts = attempts;
        self
    }

    /// Set the overall confidence warning threshold.
    pub fn with_warning_threshold(mut self, threshold: f32) -> Self {
        self.overall_confidence_warning_threshold = threshold;
        self
    }

    /// Set the per-document time budget.
    pub fn with_time_budget(mut self, budget: Duration) -> Self {
        self.per_document_time_budget = budget;
        self
    }

    /// Set the text-native density threshold.
    pub fn with_min_text_density(mut self, density: f32) -> Self {
        self.min_text_density = density;
        self
    }

    /// Set the number of page workers.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// Process pages one at a time.
    pub fn sequential(mut self) -> Self {
        self.workers = 1;
        self
    }

    /// Set the number of concurrent OCR invocations.
    pub fn with_ocr_instances(mut self, instances: usize) -> Self {
        self.ocr_instances = instances;
        self
    }

    /// Set the bitmap memory budget in MB.
    pub fn with_memory_budget_mb(mut self, mb: u32) -> Self {
        self.memory_budget_mb = mb;
        self
    }

    /// Set the OCR language configuration.
    pub fn with_language(mut self, language: OcrLanguage) -> Self {
        self.language = language;
        self
    }

    /// Set the OCR page segmentation mode.
    pub fn with_page_segmentation(mut self, mode: PageSegMode) -> Self {
        self.page_segmentation = mode;
        self
    }

    /// Set the legacy font detection threshold.
    pub fn with_legacy_detection_threshold(mut self, threshold: f32) -> Self {
        self.legacy_detection_threshold = threshold;
        self
    }

    /// Effective worker count.
    pub fn effective_workers(&self) -> usize {
        resolve_parallelism(self.workers)
    }

    /// Effective OCR instance count.
    pub fn effective_ocr_instances(&self) -> usize {
        resolve_parallelism(self.ocr_instances)
    }

    /// Check that every value is usable.
    pub fn validate(&self) -> Result<()> {
        if !(36..=1200).contains(&self.dpi) {
            return Err(Error::InvalidOption(format!(
                "dpi must be between 36 and 1200, got {}",
                self.dpi
            )));
        }
        if self.degraded_dpi == 0 || self.degraded_dpi > self.dpi {
            return Err(Error::InvalidOption(format!(
                "degraded_dpi must be between 1 and dpi ({}), got {}",
                self.dpi, self.degraded_dpi
            )));
        }
        check_fraction("ocr_confidence_threshold", self.ocr_confidence_threshold)?;
        check_fraction(
            "overall_confidence_warning_threshold",
            self.overall_confidence_warning_threshold,
        )?;
        check_fraction("legacy_detection_threshold", self.legacy_detection_threshold)?;
        if self.max_ocr_attempts == 0 {
            return Err(Error::InvalidOption(
                "max_ocr_attempts must be at least 1".to_string(),
            ));
        }
        if self.per_document_time_budget.is_zero() {
            return Err(Error::InvalidOption(
                "per_document_time_budget must be positive".to_string(),
            ));
        }
        if !(self.min_text_density >= 0.0) {
            return Err(Error::InvalidOption(format!(
                "min_text_density must be non-negative, got {}",
                self.min_text_density
            )));
        }
        if self.language.primary.trim().is_empty() {
            return Err(Error::InvalidOption("language must not be empty".to_string()));
        }
        Ok(())
    }
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            dpi: 300,
            degraded_dpi: 200,
            ocr_confidence_threshold: 0.70,
            max_ocr_attempts: 3,
            overall_confidence_warning_threshold: 0.50,
            per_document_time_budget: Duration::from_secs(120),
            min_text_density: 1.0,
            workers: 0,
            ocr_instances: 0,
            memory_budget_mb: 1024,
            language: OcrLanguage::default(),
            page_segmentation: PageSegMode::SingleBlock,
            legacy_detection_threshold: 0.35,
        }
    }
}

fn check_fraction(name: &str, value: f32) -> Result<()> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(Error::InvalidOption(format!(
            "{} must be within [0, 1], got {}",
            name, value
        )))
    }
}

fn resolve_parallelism(requested: usize) -> usize {
    if requested > 0 {
        return requested;
    }
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(value.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options() {
        let options = ExtractOptions::default();
        assert_eq!(options.dpi, 300);
        assert_eq!(options.degraded_dpi, 200);
        assert_eq!(options.max_ocr_attempts, 3);
        assert!((options.ocr_confidence_threshold - 0.70).abs() < f32::EPSILON);
        assert!((options.overall_confidence_warning_threshold - 0.50).abs() < f32::EPSILON);
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_builder() {
        let options = ExtractOptions::new()
            .with_dpi(400)
            .with_max_ocr_attempts(2)
            .with_warning_threshold(0.4)
            .with_time_budget(Duration::from_secs(5))
            .sequential();

        assert_eq!(options.dpi, 400);
        assert_eq!(options.max_ocr_attempts, 2);
        assert_eq!(options.effective_workers(), 1);
        assert_eq!(options.per_document_time_budget, Duration::from_secs(5));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        assert!(ExtractOptions::new().with_dpi(10).validate().is_err());
        assert!(ExtractOptions::new().with_max_ocr_attempts(0).validate().is_err());
        assert!(ExtractOptions::new()
            .with_ocr_confidence_threshold(70.0)
            .validate()
            .is_err());
        assert!(ExtractOptions::new()
            .with_time_budget(Duration::ZERO)
            .validate()
            .is_err());
        assert!(ExtractOptions::new()
            .with_dpi(150)
            .with_degraded_dpi(200)
            .validate()
            .is_err());
    }

    #[test]
    fn test_json_round_trip_keeps_defaults() {
        let options: ExtractOptions =
            serde_json::from_str(r#"{"dpi": 200, "degraded_dpi": 150, "per_document_time_budget_secs": 30}"#)
                .unwrap();
        assert_eq!(options.dpi, 200);
        assert_eq!(options.per_document_time_budget, Duration::from_secs(30));
        assert_eq!(options.max_ocr_attempts, 3);
    }

    #[test]
    fn test_from_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prashn.json");
        std::fs::write(&path, r#"{"max_ocr_attempts": 2, "workers": 2}"#).unwrap();

        let options = ExtractOptions::from_json_file(&path).unwrap();
        assert_eq!(options.max_ocr_attempts, 2);
        assert_eq!(options.effective_workers(), 2);

        std::fs::write(&path, r#"{"max_ocr_attempts": 0}"#).unwrap();
        assert!(ExtractOptions::from_json_file(&path).is_err());
    }
}
