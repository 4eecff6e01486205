//! Page rasterization and DPI selection.

use crate::backend::DocumentBackend;
use crate::error::{Error, Result};
use crate::model::Page;

/// Bytes per pixel of a decoded RGBA bitmap.
const BYTES_PER_PIXEL: u64 = 4;

/// Converts scan-native pages to bitmaps.
pub struct Rasterizer<'a> {
    backend: &'a dyn DocumentBackend,
}

impl<'a> Rasterizer<'a> {
    pub fn new(backend: &'a dyn DocumentBackend) -> Self {
        Self { backend }
    }

    /// Render `page` at `dpi`. Every failure is reported as page-local.
    pub fn rasterize(&self, page: u32, dpi: u32) -> Result<Page> {
        let image = self.backend.rasterize(page, dpi).map_err(|e| match e {
            Error::Rasterization { .. } => e,
            other => Error::Rasterization {
                page,
                reason: other.to_string(),
            },
        })?;
        if image.width() == 0 || image.height() == 0 {
            return Err(Error::Rasterization {
                page,
                reason: "backend produced an empty bitmap".to_string(),
            });
        }
        log::debug!(
            "page {}: rasterized at {} dpi ({}x{})",
            page,
            dpi,
            image.width(),
            image.height()
        );
        Ok(Page::bitmap(page, image, dpi))
    }
}

/// Estimated size of a decoded bitmap for a page of `size` points at `dpi`.
pub fn estimated_bitmap_bytes((width_pt, height_pt): (f32, f32), dpi: u32) -> u64 {
    let scale = dpi as f64 / 72.0;
    let w = (width_pt as f64 * scale).ceil().max(0.0) as u64;
    let h = (height_pt as f64 * scale).ceil().max(0.0) as u64;
    w * h * BYTES_PER_PIXEL
}

/// Pick `dpi`, or `degraded_dpi` when `workers` bitmaps of the largest page
/// would not fit into `memory_budget_mb`.
pub fn choose_dpi(
    largest_page: (f32, f32),
    workers: usize,
    dpi: u32,
    degraded_dpi: u32,
    memory_budget_mb: u32,
) -> u32 {
    let needed = estimated_bitmap_bytes(largest_page, dpi).saturating_mul(workers.max(1) as u64);
    let budget = memory_budget_mb as u64 * 1024 * 1024;
    if needed > budget {
        log::warn!(
            "{} workers need ~{} MB at {} dpi (budget {} MB); degrading to {} dpi",
            workers,
            needed / (1024 * 1024),
            dpi,
            memory_budget_mb,
            degraded_dpi
        );
        degraded_dpi
    } else {
        dpi
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::ImageBackend;
    use image::{DynamicImage, GrayImage};

    const A4: (f32, f32) = (595.0, 842.0);

    #[test]
    fn test_estimated_bytes() {
        assert_eq!(estimated_bitmap_bytes((72.0, 72.0), 300), 300 * 300 * 4);
    }

    #[test]
    fn test_choose_dpi_degrades_under_pressure() {
        // A4 at 300 dpi is roughly 33 MB per bitmap.
        assert_eq!(choose_dpi(A4, 4, 300, 200, 1024), 300);
        assert_eq!(choose_dpi(A4, 4, 300, 200, 100), 200);
        assert_eq!(choose_dpi(A4, 0, 300, 200, 40), 300);
    }

    #[test]
    fn test_rasterize_wraps_backend() {
        let backend = ImageBackend::from_image(DynamicImage::ImageLuma8(GrayImage::new(8, 6)));
        let rasterizer = Rasterizer::new(&backend);

        let page = rasterizer.rasterize(1, 300).unwrap();
        assert_eq!(page.number, 1);
        assert_eq!(page.dpi, Some(300));
        assert_eq!(page.dimensions(), Some((8, 6)));

        assert!(matches!(
            rasterizer.rasterize(3, 300),
            Err(Error::Rasterization { page: 3, .. })
        ));
    }

    #[test]
    fn test_empty_bitmap_is_rasterization_error() {
        let backend = ImageBackend::from_image(DynamicImage::ImageLuma8(GrayImage::new(0, 0)));
        assert!(matches!(
            Rasterizer::new(&backend).rasterize(1, 300),
            Err(Error::Rasterization { page: 1, .. })
        ));
    }
}
