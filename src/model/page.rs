//! Page-level types.

use image::DynamicImage;
use serde::{Deserialize, Serialize};

/// How a page's text has to be obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageKind {
    /// The page carries a usable text layer.
    TextNative,
    /// The page must be rasterized and OCR'd.
    ScanNative,
}

/// A single unit of work for the pipeline.
#[derive(Debug, Clone)]
pub struct Page {
    /// Page number (1-indexed)
    pub number: u32,

    /// Bitmap or text layer
    pub content: PageContent,

    /// Resolution the bitmap was produced at (`None` for text layers)
    pub dpi: Option<u32>,
}

/// What a page carries once it has been classified or rasterized.
#[derive(Debug, Clone)]
pub enum PageContent {
    /// Rasterized page
    Bitmap(DynamicImage),
    /// Extracted text layer
    TextLayer(String),
}

impl Page {
    /// Create a rasterized page.
    pub fn bitmap(number: u32, image: DynamicImage, dpi: u32) -> Self {
        Self {
            number,
            content: PageContent::Bitmap(image),
            dpi: Some(dpi),
        }
    }

    /// Create a text-native page.
    pub fn text(number: u32, text: impl Into<String>) -> Self {
        Self {
            number,
            content: PageContent::TextLayer(text.into()),
            dpi: None,
        }
    }

    /// Kind of this page.
    pub fn kind(&self) -> PageKind {
        match self.content {
            PageContent::Bitmap(_) => PageKind::ScanNative,
            PageContent::TextLayer(_) => PageKind::TextNative,
        }
    }

    /// Bitmap dimensions in pixels, if rasterized.
    pub fn dimensions(&self) -> Option<(u32, u32)> {
        match &self.content {
            PageContent::Bitmap(image) => Some((image.width(), image.height())),
            PageContent::TextLayer(_) => None,
        }
    }
}
