//! Text-native vs scan-native page classification.

use serde::{Deserialize, Serialize};

use crate::backend::DocumentBackend;
use crate::model::PageKind;

const POINTS_PER_INCH: f32 = 72.0;

/// Classification outcome for one page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageClassification {
    /// Page number (1-indexed)
    pub page: u32,

    pub kind: PageKind,

    /// The text layer, kept for text-native pages
    #[serde(skip)]
    pub text_layer: Option<String>,

    /// Non-whitespace characters per square inch
    pub density: f32,

    /// The text layer could not be read; failure is deferred to rasterization
    pub flagged: bool,
}

/// Decides per page whether the text layer is usable.
#[derive(Debug, Clone, Copy)]
pub struct Classifier {
    min_text_density: f32,
}

impl Classifier {
    /// `min_text_density` is in characters per square inch.
    pub fn new(min_text_density: f32) -> Self {
        Self { min_text_density }
    }

    /// Classify every page of the backend.
    pub fn classify(&self, backend: &dyn DocumentBackend) -> Vec<PageClassification> {
        (1..=backend.page_count())
            .map(|page| self.classify_page(backend, page))
            .collect()
    }

    /// Classify one page. Never fails: unreadable pages come back scan-native and flagged.
    pub fn classify_page(&self, backend: &dyn DocumentBackend, page: u32) -> PageClassification {
        let text = match backend.text_layer(page) {
            Ok(text) => text,
            Err(e) => {
                log::warn!("page {}: text layer unreadable, treating as scan: {}", page, e);
                return PageClassification {
                    page,
                    kind: PageKind::ScanNative,
                    text_layer: None,
                    density: 0.0,
                    flagged: true,
                };
            }
        };

        let Some(text) = text else {
            log::debug!("page {}: no text layer", page);
            return PageClassification {
                page,
                kind: PageKind::ScanNative,
                text_layer: None,
                density: 0.0,
                flagged: false,
            };
        };

        let size = match backend.page_size(page) {
            Ok(size) => size,
            Err(e) => {
                log::warn!("page {}: geometry unreadable, treating as scan: {}", page, e);
                return PageClassification {
                    page,
                    kind: PageKind::ScanNative,
                    text_layer: None,
                    density: 0.0,
                    flagged: true,
                };
            }
        };

        let density = text_density(&text, size);
        let text_native = density > 0.0 && density >= self.min_text_density;
        log::debug!(
            "page {}: density {:.2} chars/in² -> {}",
            page,
            density,
            if text_native { "text" } else { "scan" }
        );

        PageClassification {
            page,
            kind: if text_native {
                PageKind::TextNative
            } else {
                PageKind::ScanNative
            },
            text_layer: text_native.then_some(text),
            density,
            flagged: false,
        }
    }
}

/// Non-whitespace characters per square inch of page area.
pub fn text_density(text: &str, (width_pt, height_pt): (f32, f32)) -> f32 {
    let area = (width_pt / POINTS_PER_INCH) * (height_pt / POINTS_PER_INCH);
    if !(area > 0.0) {
        return 0.0;
    }
    let chars = text.chars().filter(|c| !c.is_whitespace()).count();
    chars as f32 / area
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Error, Result};
    use image::DynamicImage;

    struct Layers(Vec<Result<Option<String>>>);

    impl DocumentBackend for Layers {
        fn page_count(&self) -> u32 {
            self.0.len() as u32
        }

        fn page_size(&self, _page: u32) -> Result<(f32, f32)> {
            Ok((72.0, 72.0))
        }

        fn text_layer(&self, page: u32) -> Result<Option<String>> {
            match &self.0[page as usize - 1] {
                Ok(text) => Ok(text.clone()),
                Err(e) => Err(Error::UndecodableDocument(e.to_string())),
            }
        }

        fn rasterize(&self, page: u32, _dpi: u32) -> Result<DynamicImage> {
            Err(Error::Rasterization {
                page,
                reason: "not needed".to_string(),
            })
        }
    }

    #[test]
    fn test_density() {
        assert_eq!(text_density("ab cd", (72.0, 72.0)), 4.0);
        assert_eq!(text_density("abcd", (144.0, 144.0)), 1.0);
        assert_eq!(text_density("abcd", (0.0, 72.0)), 0.0);
    }

    #[test]
    fn test_classification_by_threshold() {
        let backend = Layers(vec![
            Ok(Some("प्रश्न 1. क्या".to_string())),
            Ok(Some("ab".to_string())),
            Ok(None),
            Err(Error::UndecodableDocument("broken xref".to_string())),
        ]);

        for threshold in [1.0, 2.0, 5.0] {
            let pages = Classifier::new(threshold).classify(&backend);
            assert_eq!(pages.len(), 4);
            assert_eq!(pages[0].kind, PageKind::TextNative);
            assert!(pages[0].text_layer.is_some());
            assert_eq!(
                pages[1].kind,
                if threshold <= 2.0 {
                    PageKind::TextNative
                } else {
                    PageKind::ScanNative
                }
            );
            assert_eq!(pages[2].kind, PageKind::ScanNative);
            assert!(!pages[2].flagged);
            assert_eq!(pages[3].kind, PageKind::ScanNative);
            assert!(pages[3].flagged);
        }
    }

    #[test]
    fn test_whitespace_only_layer_is_scan() {
        let backend = Layers(vec![Ok(Some("  \n\t ".to_string()))]);
        let page = Classifier::new(0.0).classify_page(&backend, 1);
        assert_eq!(page.kind, PageKind::ScanNative);
        assert!(page.text_layer.is_none());
    }
}
