//! Extraction orchestrator.
//!
//! Pages are classified up front, then handed to a bounded pool of page
//! workers through a bounded channel of page numbers. Each worker takes a
//! page from bitmap (or text layer) to normalized text. Results are gathered
//! into a page-ordered vector, concatenated with page-break lines, and
//! segmented by the detector in a single pass.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use crossbeam_channel::{bounded, unbounded, Receiver, Sender};
use image::GrayImage;
use rayon::prelude::*;

use crate::backend::{open_backend, DocumentBackend};
use crate::classify::{Classifier, PageClassification};
use crate::error::{Error, Result};
use crate::mcq::lines::PAGE_BREAK;
use crate::mcq::McqDetector;
use crate::model::{Document, ExtractionResult, PageContent, PageKind, PageReport};
use crate::normalize::Normalizer;
use crate::ocr::{OcrEngine, OcrInvoker, OcrLanguage, OcrOutcome, PageSegMode, Recognition};
use crate::options::ExtractOptions;
use crate::preprocess::Preprocessor;
use crate::raster::{choose_dpi, Rasterizer};

/// Caller-side cancellation flag, checked between pages.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Pages already in flight run to completion.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Runs the full pipeline on documents.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use prashn::{Document, Extractor, ExtractOptions, TesseractCli};
///
/// let extractor = Extractor::new(Arc::new(TesseractCli::new()))
///     .with_options(ExtractOptions::new().with_dpi(300));
/// let result = extractor.extract(&Document::open("paper.pdf")?)?;
/// println!("{} questions", result.questions.len());
/// # Ok::<(), prashn::Error>(())
/// ```
pub struct Extractor {
    options: ExtractOptions,
    engine: Arc<dyn OcrEngine>,
    preprocessor: Preprocessor,
    detector: McqDetector,
    cancel: CancellationToken,
}

/// A page that made it through normalization.
struct PageWork {
    report: PageReport,
    text: String,
}

enum Outcome {
    Done(PageWork),
    Fatal(u32, Error),
}

impl Extractor {
    /// Create an extractor with default options.
    pub fn new(engine: Arc<dyn OcrEngine>) -> Self {
        Self {
            options: ExtractOptions::default(),
            engine,
            preprocessor: Preprocessor::new(),
            detector: McqDetector::new(),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_options(mut self, options: ExtractOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_preprocessor(mut self, preprocessor: Preprocessor) -> Self {
        self.preprocessor = preprocessor;
        self
    }

    pub fn with_detector(mut self, detector: McqDetector) -> Self {
        self.detector = detector;
        self
    }

    /// Observe `token` for cancellation.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn options(&self) -> &ExtractOptions {
        &self.options
    }

    /// A token that cancels this extractor's runs.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Extract questions from `document`.
    pub fn extract(&self, document: &Document) -> Result<ExtractionResult> {
        let backend = open_backend(document)?;
        self.extract_with_backend(backend.as_ref())
    }

    /// Extract questions from an already opened backend.
    ///
    /// Page-local failures are recorded in the result. Engine unavailability
    /// and cancellation end the run with an error. When the time budget runs
    /// out, the pages finished so far are returned with the warning flag set.
    pub fn extract_with_backend(&self, backend: &dyn DocumentBackend) -> Result<ExtractionResult> {
        self.options.validate()?;
        let started = Instant::now();
        let budget = self.options.per_document_time_budget;
        let deadline = started + budget;
        let total = backend.page_count();

        let classifier = Classifier::new(self.options.min_text_density);
        let classifications: Vec<PageClassification> = (1..=total)
            .into_par_iter()
            .map(|page| classifier.classify_page(backend, page))
            .collect();

        let workers = self.options.effective_workers().min(total.max(1) as usize);
        let dpi = self.pick_dpi(backend, &classifications, workers);
        log::info!(
            "extracting {} pages with {} workers at {} dpi",
            total,
            workers,
            dpi
        );

        let outcomes = self.run_workers(backend, &classifications, workers, dpi, deadline);

        let mut slots: Vec<Option<PageWork>> = (0..total).map(|_| None).collect();
        let mut fatal: Option<(u32, Error)> = None;
        for outcome in outcomes {
            match outcome {
                Outcome::Done(work) => {
                    let index = (work.report.page - 1) as usize;
                    slots[index] = Some(work);
                }
                Outcome::Fatal(page, err) => {
                    if fatal.as_ref().map_or(true, |(p, _)| page < *p) {
                        fatal = Some((page, err));
                    }
                }
            }
        }
        if let Some((page, err)) = fatal {
            log::error!("extraction aborted on page {}: {}", page, err);
            return Err(err);
        }

        let processed = slots.iter().filter(|s| s.is_some()).count() as u32;
        if processed < total && self.cancel.is_cancelled() {
            log::warn!("extraction cancelled after {} of {} pages", processed, total);
            return Err(Error::Cancelled { processed, total });
        }

        let timed_out = processed < total;
        let skipped_reason = timed_out.then(|| {
            let err = Error::TimeoutExceeded {
                budget,
                processed,
                total,
            };
            log::warn!("{}", err);
            err.to_string()
        });

        let mut pages = Vec::with_capacity(total as usize);
        let mut texts = Vec::with_capacity(total as usize);
        for (slot, classification) in slots.into_iter().zip(&classifications) {
            match slot {
                Some(work) => {
                    texts.push(work.text);
                    pages.push(work.report);
                }
                None => {
                    texts.push(String::new());
                    let mut report = PageReport::failed(
                        classification.page,
                        classification.kind,
                        skipped_reason.clone().unwrap_or_default(),
                    );
                    report.flagged = classification.flagged;
                    pages.push(report);
                }
            }
        }

        let separator = format!("\n{}\n", PAGE_BREAK);
        let full_text = texts.join(&separator);
        let questions = self.detector.detect(&full_text);
        let overall_confidence = weighted_confidence(&pages);
        let low_confidence_warning = timed_out
            || questions.is_empty()
            || overall_confidence < self.options.overall_confidence_warning_threshold;

        if low_confidence_warning {
            log::warn!(
                "low confidence result: overall {:.2}, {} questions{}",
                overall_confidence,
                questions.len(),
                if timed_out { ", timed out" } else { "" }
            );
        }
        log::info!(
            "extracted {} questions from {} pages in {:.2?}",
            questions.len(),
            total,
            started.elapsed()
        );

        Ok(ExtractionResult {
            full_text,
            questions,
            overall_confidence,
            low_confidence_warning,
            timed_out,
            pages,
        })
    }

    /// Resolution for scan pages, degraded when the largest one would not fit
    /// the memory budget once per worker.
    fn pick_dpi(
        &self,
        backend: &dyn DocumentBackend,
        classifications: &[PageClassification],
        workers: usize,
    ) -> u32 {
        let largest = classifications
            .iter()
            .filter(|c| c.kind == PageKind::ScanNative)
            .filter_map(|c| backend.page_size(c.page).ok())
            .fold((0.0f32, 0.0f32), |acc, size| {
                if size.0 * size.1 > acc.0 * acc.1 {
                    size
                } else {
                    acc
                }
            });
        choose_dpi(
            largest,
            workers,
            self.options.dpi,
            self.options.degraded_dpi,
            self.options.memory_budget_mb,
        )
    }

    fn run_workers(
        &self,
        backend: &dyn DocumentBackend,
        classifications: &[PageClassification],
        workers: usize,
        dpi: u32,
        deadline: Instant,
    ) -> Vec<Outcome> {
        let (task_tx, task_rx) = bounded::<u32>(workers);
        let (result_tx, result_rx) = unbounded::<Outcome>();
        let engine = Throttled::new(self.engine.as_ref(), self.options.effective_ocr_instances());
        let abort = AtomicBool::new(false);

        std::thread::scope(|scope| {
            for _ in 0..workers {
                let task_rx = task_rx.clone();
                let result_tx = result_tx.clone();
                let engine = &engine;
                let abort = &abort;
                scope.spawn(move || {
                    let normalizer = Normalizer::from_options(&self.options);
                    let invoker = OcrInvoker::new(engine, &self.options)
                        .with_preprocessor(self.preprocessor.clone());
                    for page in task_rx.iter() {
                        if self.should_stop(abort, deadline) {
                            break;
                        }
                        let classification = &classifications[(page - 1) as usize];
                        let outcome =
                            self.process_page(backend, classification, &invoker, &normalizer, dpi);
                        if matches!(outcome, Outcome::Fatal(..)) {
                            abort.store(true, Ordering::SeqCst);
                        }
                        if result_tx.send(outcome).is_err() {
                            break;
                        }
                    }
                });
            }
            drop(task_rx);
            drop(result_tx);

            for page in 1..=classifications.len() as u32 {
                if self.should_stop(&abort, deadline) || task_tx.send(page).is_err() {
                    break;
                }
            }
            drop(task_tx);
        });

        result_rx.try_iter().collect()
    }

    fn should_stop(&self, abort: &AtomicBool, deadline: Instant) -> bool {
        abort.load(Ordering::SeqCst) || self.cancel.is_cancelled() || Instant::now() >= deadline
    }

    fn process_page(
        &self,
        backend: &dyn DocumentBackend,
        classification: &PageClassification,
        invoker: &OcrInvoker<'_>,
        normalizer: &Normalizer,
        dpi: u32,
    ) -> Outcome {
        let page = classification.page;
        let mut report = PageReport::new(page, classification.kind);
        report.flagged = classification.flagged;

        let raw = match &classification.text_layer {
            Some(text) => {
                report.confidence = 1.0;
                report.tokens = text.split_whitespace().count();
                text.clone()
            }
            None => match self.recognize_page(backend, page, invoker, dpi) {
                Ok((text, outcome)) => {
                    report.confidence = outcome.best.mean_confidence;
                    report.tokens = outcome.best.scored_tokens();
                    report.attempts = outcome.attempts;
                    report.profile = Some(outcome.best.profile);
                    report.dpi = Some(dpi);
                    text
                }
                Err(err) if err.is_page_local() => {
                    log::warn!("page {} skipped: {}", page, err);
                    let mut failed = PageReport::failed(page, classification.kind, err.to_string());
                    failed.flagged = classification.flagged;
                    return Outcome::Done(PageWork {
                        report: failed,
                        text: String::new(),
                    });
                }
                Err(err) => return Outcome::Fatal(page, err),
            },
        };

        let normalized = normalizer.normalize(&raw);
        report.legacy_font = normalized.legacy_font_detected;
        report.repaired_chars = normalized.repaired_chars;
        Outcome::Done(PageWork {
            report,
            text: normalized.text,
        })
    }

    fn recognize_page(
        &self,
        backend: &dyn DocumentBackend,
        page: u32,
        invoker: &OcrInvoker<'_>,
        dpi: u32,
    ) -> Result<(String, OcrOutcome)> {
        let rasterized = Rasterizer::new(backend).rasterize(page, dpi)?;
        let PageContent::Bitmap(bitmap) = &rasterized.content else {
            return Err(Error::Rasterization {
                page,
                reason: "backend returned no bitmap".to_string(),
            });
        };
        let outcome = invoker.run(page, bitmap)?;
        Ok((outcome.best.text.clone(), outcome))
    }
}

/// Token-weighted mean page confidence; failed pages and pages without
/// scored tokens carry no weight.
fn weighted_confidence(pages: &[PageReport]) -> f32 {
    let (sum, weight) = pages
        .iter()
        .filter(|p| p.failure.is_none())
        .fold((0.0f64, 0usize), |(sum, weight), p| {
            (sum + p.confidence as f64 * p.tokens as f64, weight + p.tokens)
        });
    if weight == 0 {
        0.0
    } else {
        (sum / weight as f64) as f32
    }
}

/// Caps concurrent engine invocations with a pool of slot tokens.
struct Throttled<'a> {
    inner: &'a dyn OcrEngine,
    release: Sender<()>,
    acquire: Receiver<()>,
}

impl<'a> Throttled<'a> {
    fn new(inner: &'a dyn OcrEngine, instances: usize) -> Self {
        let instances = instances.max(1);
        let (release, acquire) = bounded(instances);
        for _ in 0..instances {
            let _ = release.send(());
        }
        Self {
            inner,
            release,
            acquire,
        }
    }
}

impl OcrEngine for Throttled<'_> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn recognize(
        &self,
        image: &GrayImage,
        language: &OcrLanguage,
        mode: PageSegMode,
    ) -> Result<Recognition> {
        // Both ends live in `self`, so the channel never disconnects.
        let _ = self.acquire.recv();
        let result = self.inner.recognize(image, language, mode);
        let _ = self.release.send(());
        result
    }
}
