//! Confidence-driven retry over escalating preprocessing profiles.

use image::DynamicImage;

use super::{OcrAttempt, OcrEngine, OcrLanguage, PageSegMode};
use crate::error::{Error, Result};
use crate::options::ExtractOptions;
use crate::preprocess::{Preprocessor, Profile};

/// Best attempt for a page plus how many invocations it took.
#[derive(Debug, Clone)]
pub struct OcrOutcome {
    pub best: OcrAttempt,
    pub attempts: u32,
}

/// Runs the OCR engine on a page, retrying with stronger profiles while the
/// mean confidence stays under the threshold.
pub struct OcrInvoker<'a> {
    engine: &'a dyn OcrEngine,
    preprocessor: Preprocessor,
    language: OcrLanguage,
    mode: PageSegMode,
    threshold: f32,
    max_attempts: u32,
}

impl<'a> OcrInvoker<'a> {
    /// Create an invoker configured from extraction options.
    pub fn new(engine: &'a dyn OcrEngine, options: &ExtractOptions) -> Self {
        Self {
            engine,
            preprocessor: Preprocessor::new(),
            language: options.language.clone(),
            mode: options.page_segmentation,
            threshold: options.ocr_confidence_threshold,
            max_attempts: options.max_ocr_attempts,
        }
    }

    /// Replace the preprocessor.
    pub fn with_preprocessor(mut self, preprocessor: Preprocessor) -> Self {
        self.preprocessor = preprocessor;
        self
    }

    /// Invocation cap: the configured maximum, bounded by the number of profiles.
    pub fn attempt_limit(&self) -> u32 {
        self.max_attempts.clamp(1, Profile::ALL.len() as u32)
    }

    /// Recognize `bitmap` for `page`.
    ///
    /// Returns the attempt with the highest mean confidence; the earliest wins
    /// a tie. An unavailable engine aborts at once. A page-local engine error
    /// moves on to the next profile and is returned only if no attempt succeeded.
    pub fn run(&self, page: u32, bitmap: &DynamicImage) -> Result<OcrOutcome> {
        let limit = self.attempt_limit();
        let mut best: Option<OcrAttempt> = None;
        let mut last_error: Option<Error> = None;
        let mut profile = Some(Profile::Baseline);
        let mut attempts = 0;

        while let Some(current) = profile {
            if attempts >= limit {
                break;
            }
            attempts += 1;

            let prepared = self.preprocessor.apply(page, bitmap, current)?;
            match self.engine.recognize(&prepared, &self.language, self.mode) {
                Ok(recognition) => {
                    let attempt = OcrAttempt::from_recognition(recognition, current, attempts);
                    log::debug!(
                        "page {}: attempt {} ({}) mean confidence {:.2}",
                        page,
                        attempts,
                        current,
                        attempt.mean_confidence
                    );
                    let good_enough = attempt.mean_confidence >= self.threshold;
                    if best
                        .as_ref()
                        .map_or(true, |b| attempt.mean_confidence > b.mean_confidence)
                    {
                        best = Some(attempt);
                    }
                    if good_enough {
                        break;
                    }
                }
                Err(err) => {
                    let err = with_page(err, page);
                    if !err.is_page_local() {
                        return Err(err);
                    }
                    log::warn!("page {}: attempt {} ({}) failed: {}", page, attempts, current, err);
                    last_error = Some(err);
                }
            }

            profile = current.next();
            if let (Some(next), true) = (profile, attempts < limit) {
                log::info!(
                    "page {}: confidence below {:.2}, retrying with {} profile",
                    page,
                    self.threshold,
                    next
                );
            }
        }

        match (best, last_error) {
            (Some(best), _) => Ok(OcrOutcome { best, attempts }),
            (None, Some(err)) => Err(err),
            (None, None) => Err(Error::Ocr {
                page,
                reason: format!("{} produced no attempt", self.engine.name()),
            }),
        }
    }
}

/// Attach the page number to engine errors raised without one.
fn with_page(err: Error, page: u32) -> Error {
    match err {
        Error::Ocr { reason, .. } => Error::Ocr { page, reason },
        Error::EngineUnavailable { page: None, reason } => Error::EngineUnavailable {
            page: Some(page),
            reason,
        },
        other => other,
    }
}
