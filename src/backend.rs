//! Document backend abstraction layer.
//!
//! Provides a trait-based interface for page access, isolating the concrete
//! PDF and image libraries from classification and rasterization logic.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::PathBuf;
use std::process::Command;

use image::DynamicImage;
use lopdf::{Document as LopdfDocument, Object, ObjectId};
use tempfile::NamedTempFile;

use crate::detect::DocumentKind;
use crate::error::{Error, Result};
use crate::model::Document;

/// Default external rasterizer (poppler-utils).
pub const DEFAULT_RASTERIZER: &str = "pdftoppm";

/// Letter size in points, used when a page has no usable MediaBox.
const DEFAULT_PAGE_SIZE: (f32, f32) = (612.0, 792.0);

/// Resolution assumed for image documents when converting pixels to points.
const IMAGE_NATIVE_DPI: f32 = 300.0;

/// Abstract interface for page access.
///
/// Pages are numbered from 1. Implementations must be shareable between
/// page workers.
pub trait DocumentBackend: Send + Sync {
    /// Number of pages.
    fn page_count(&self) -> u32;

    /// Page size in points (1/72 inch).
    fn page_size(&self, page: u32) -> Result<(f32, f32)>;

    /// Extractable text layer, or `None` when the page has none.
    fn text_layer(&self, page: u32) -> Result<Option<String>>;

    /// Render the page to a bitmap at `dpi`.
    fn rasterize(&self, page: u32, dpi: u32) -> Result<DynamicImage>;
}

/// Open the backend matching the document kind.
pub fn open_backend(document: &Document) -> Result<Box<dyn DocumentBackend>> {
    match document.kind() {
        DocumentKind::Pdf => Ok(Box::new(LopdfBackend::load_bytes(document.bytes())?)),
        DocumentKind::Image(_) => Ok(Box::new(ImageBackend::load_bytes(document.bytes())?)),
    }
}

// ---------------------------------------------------------------------------
// LopdfBackend: text layer via lopdf, rasterization via pdftoppm
// ---------------------------------------------------------------------------

/// Concrete [`DocumentBackend`] for PDFs.
pub struct LopdfBackend {
    doc: LopdfDocument,
    pages: BTreeMap<u32, ObjectId>,
    spool: NamedTempFile,
    rasterizer: PathBuf,
}

impl LopdfBackend {
    /// Load from an in-memory byte slice.
    pub fn load_bytes(data: &[u8]) -> Result<Self> {
        let doc = LopdfDocument::load_mem(data)
            .map_err(|e| Error::UndecodableDocument(format!("PDF: {}", e)))?;
        if doc.is_encrypted() {
            log::warn!("PDF is encrypted; text layers may be unreadable");
        }
        let pages = doc.get_pages();
        if pages.is_empty() {
            return Err(Error::UndecodableDocument("PDF has no pages".to_string()));
        }

        // The rasterizer reads from a path, so keep a private copy on disk.
        let mut spool = NamedTempFile::new()?;
        spool.write_all(data)?;
        spool.flush()?;

        Ok(Self {
            doc,
            pages,
            spool,
            rasterizer: PathBuf::from(DEFAULT_RASTERIZER),
        })
    }

    /// Use a different `pdftoppm` executable.
    pub fn with_rasterizer(mut self, program: impl Into<PathBuf>) -> Self {
        self.rasterizer = program.into();
        self
    }

    fn page_id(&self, page: u32) -> Result<ObjectId> {
        self.pages.get(&page).copied().ok_or_else(|| {
            Error::UndecodableDocument(format!(
                "page {} does not exist (document has {} pages)",
                page,
                self.pages.len()
            ))
        })
    }

    /// Find the MediaBox, following the Parent chain for inherited boxes.
    fn media_box(&self, page_id: ObjectId) -> Option<(f32, f32)> {
        let mut current = self.doc.get_dictionary(page_id).ok()?;
        for _ in 0..16 {
            if let Ok(media_box) = current.get(b"MediaBox") {
                let array = match media_box {
                    Object::Reference(r) => self.doc.get_object(*r).ok()?.as_array().ok()?,
                    other => other.as_array().ok()?,
                };
                if array.len() >= 4 {
                    let x0 = array[0].as_float().unwrap_or(0.0);
                    let y0 = array[1].as_float().unwrap_or(0.0);
                    let x1 = array[2].as_float().ok()?;
                    let y1 = array[3].as_float().ok()?;
                    return Some(((x1 - x0).abs(), (y1 - y0).abs()));
                }
            }
            let parent = current.get(b"Parent").ok()?.as_reference().ok()?;
            current = self.doc.get_dictionary(parent).ok()?;
        }
        None
    }
}

impl DocumentBackend for LopdfBackend {
    fn page_count(&self) -> u32 {
        self.pages.len() as u32
    }

    fn page_size(&self, page: u32) -> Result<(f32, f32)> {
        let id = self.page_id(page)?;
        Ok(self.media_box(id).unwrap_or(DEFAULT_PAGE_SIZE))
    }

    fn text_layer(&self, page: u32) -> Result<Option<String>> {
        self.page_id(page)?;
        let text = self
            .doc
            .extract_text(&[page])
            .map_err(|e| Error::UndecodableDocument(format!("page {}: {}", page, e)))?;
        if text.trim().is_empty() {
            Ok(None)
        } else {
            Ok(Some(text))
        }
    }

    fn rasterize(&self, page: u32, dpi: u32) -> Result<DynamicImage> {
        let fail = |reason: String| Error::Rasterization { page, reason };

        self.page_id(page).map_err(|e| fail(e.to_string()))?;
        let out_dir = tempfile::tempdir().map_err(|e| fail(e.to_string()))?;
        let root = out_dir.path().join("page");
        let page_arg = page.to_string();

        let output = Command::new(&self.rasterizer)
            .arg("-r")
            .arg(dpi.to_string())
            .arg("-f")
            .arg(&page_arg)
            .arg("-l")
            .arg(&page_arg)
            .arg("-png")
            .arg("-singlefile")
            .arg(self.spool.path())
            .arg(&root)
            .output()
            .map_err(|e| fail(format!("{}: {}", self.rasterizer.display(), e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(fail(format!(
                "{} exited with {}: {}",
                self.rasterizer.display(),
                output.status,
                stderr.trim()
            )));
        }

        image::open(root.with_extension("png")).map_err(|e| fail(e.to_string()))
    }
}

// ---------------------------------------------------------------------------
// ImageBackend: single-page raster documents
// ---------------------------------------------------------------------------

/// Concrete [`DocumentBackend`] for image documents. Always one page.
pub struct ImageBackend {
    image: DynamicImage,
}

impl ImageBackend {
    /// Decode an image from memory.
    pub fn load_bytes(data: &[u8]) -> Result<Self> {
        let image = image::load_from_memory(data)
            .map_err(|e| Error::UndecodableDocument(format!("image: {}", e)))?;
        Ok(Self { image })
    }

    /// Wrap an already decoded image.
    pub fn from_image(image: DynamicImage) -> Self {
        Self { image }
    }

    fn check_page(&self, page: u32) -> Result<()> {
        if page == 1 {
            Ok(())
        } else {
            Err(Error::UndecodableDocument(format!(
                "page {} does not exist (image has 1 page)",
                page
            )))
        }
    }
}

impl DocumentBackend for ImageBackend {
    fn page_count(&self) -> u32 {
        1
    }

    fn page_size(&self, page: u32) -> Result<(f32, f32)> {
        self.check_page(page)?;
        let scale = 72.0 / IMAGE_NATIVE_DPI;
        Ok((
            self.image.width() as f32 * scale,
            self.image.height() as f32 * scale,
        ))
    }

    fn text_layer(&self, page: u32) -> Result<Option<String>> {
        self.check_page(page)?;
        Ok(None)
    }

    fn rasterize(&self, page: u32, _dpi: u32) -> Result<DynamicImage> {
        self.check_page(page).map_err(|e| Error::Rasterization {
            page,
            reason: e.to_string(),
        })?;
        Ok(self.image.clone())
    }
}
