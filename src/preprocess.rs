//! Bitmap enhancement ahead of OCR.
//!
//! Each [`Profile`] is a fixed pipeline: grayscale, contrast normalization,
//! denoise, optional upscaling, adaptive binarization, deskew and border crop.
//! Output depends only on the input bitmap and the profile.

use image::imageops::{self, FilterType};
use image::{DynamicImage, GrayImage, Luma};
use imageproc::contrast::{adaptive_threshold, equalize_histogram};
use imageproc::filter::{gaussian_blur_f32, median_filter};
use imageproc::geometric_transformations::{rotate_about_center, Interpolation};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Pixels at or below this value count as ink.
const INK_LEVEL: u8 = 127;

/// Keeps the integral image used for binarization inside `u32`.
const MAX_PIXELS: u64 = 16_000_000;

/// Width of the copy used to score skew angles.
const SKEW_SAMPLE_WIDTH: u32 = 800;

/// White border kept around the content after cropping.
const CROP_MARGIN: u32 = 10;

/// Enhancement strength, tried in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Profile {
    /// Cheap cleanup used on the first attempt
    Baseline,
    /// Contrast stretch, blur and 1.5x upscale
    Enhanced,
    /// Histogram equalization, heavy denoise and 2x upscale
    Aggressive,
}

impl Profile {
    /// All profiles from weakest to strongest.
    pub const ALL: [Profile; 3] = [Profile::Baseline, Profile::Enhanced, Profile::Aggressive];

    /// The next stronger profile.
    pub fn next(self) -> Option<Profile> {
        match self {
            Profile::Baseline => Some(Profile::Enhanced),
            Profile::Enhanced => Some(Profile::Aggressive),
            Profile::Aggressive => None,
        }
    }

    /// Lowercase name.
    pub fn name(self) -> &'static str {
        match self {
            Profile::Baseline => "baseline",
            Profile::Enhanced => "enhanced",
            Profile::Aggressive => "aggressive",
        }
    }

    fn settings(self) -> Settings {
        match self {
            Profile::Baseline => Settings {
                contrast: Contrast::None,
                median_radius: 1,
                blur_sigma: None,
                upscale: 1.0,
                threshold_radius: 5,
                despeckle: false,
                max_skew: 5.0,
                skew_step: 0.5,
            },
            Profile::Enhanced => Settings {
                contrast: Contrast::Stretch,
                median_radius: 1,
                blur_sigma: Some(0.8),
                upscale: 1.5,
                threshold_radius: 7,
                despeckle: false,
                max_skew: 10.0,
                skew_step: 0.25,
            },
            Profile::Aggressive => Settings {
                contrast: Contrast::Equalize,
                median_radius: 2,
                blur_sigma: Some(1.0),
                upscale: 2.0,
                threshold_radius: 9,
                despeckle: true,
                max_skew: 15.0,
                skew_step: 0.25,
            },
        }
    }
}

impl std::fmt::Display for Profile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy)]
enum Contrast {
    None,
    Stretch,
    Equalize,
}

#[derive(Debug, Clone, Copy)]
struct Settings {
    contrast: Contrast,
    median_radius: u32,
    blur_sigma: Option<f32>,
    upscale: f32,
    threshold_radius: u32,
    despeckle: bool,
    max_skew: f32,
    skew_step: f32,
}

/// Applies enhancement profiles to page bitmaps.
#[derive(Debug, Clone)]
pub struct Preprocessor {
    deskew: bool,
    crop: bool,
}

impl Default for Preprocessor {
    fn default() -> Self {
        Self {
            deskew: true,
            crop: true,
        }
    }
}

impl Preprocessor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable skew correction.
    pub fn with_deskew(mut self, enabled: bool) -> Self {
        self.deskew = enabled;
        self
    }

    /// Enable or disable cropping to the content bounding box.
    pub fn with_crop(mut self, enabled: bool) -> Self {
        self.crop = enabled;
        self
    }

    /// Run `profile` over the bitmap of `page`.
    pub fn apply(&self, page: u32, bitmap: &DynamicImage, profile: Profile) -> Result<GrayImage> {
        let (width, height) = (bitmap.width(), bitmap.height());
        if width == 0 || height == 0 {
            return Err(Error::Preprocess {
                page,
                reason: format!("bitmap has zero dimension ({}x{})", width, height),
            });
        }

        let settings = profile.settings();
        let mut gray = bitmap.to_luma8();

        gray = match settings.contrast {
            Contrast::None => gray,
            Contrast::Stretch => stretch_contrast(&gray),
            Contrast::Equalize => equalize_histogram(&gray),
        };

        gray = median_filter(&gray, settings.median_radius, settings.median_radius);
        if let Some(sigma) = settings.blur_sigma {
            gray = gaussian_blur_f32(&gray, sigma);
        }

        gray = scale_within_limit(&gray, settings.upscale);

        let mut binary = adaptive_threshold(&gray, settings.threshold_radius);
        if settings.despeckle {
            binary = median_filter(&binary, 1, 1);
        }

        if self.deskew {
            let angle = estimate_skew(&binary, settings.max_skew, settings.skew_step);
            if angle != 0.0 {
                log::debug!("page {}: deskewing by {:.2} degrees", page, angle);
                binary = rotate_about_center(
                    &binary,
                    angle.to_radians(),
                    Interpolation::Nearest,
                    Luma([255]),
                );
            }
        }

        if self.crop {
            binary = crop_to_content(&binary, CROP_MARGIN);
        }

        log::debug!(
            "page {}: {} profile {}x{} -> {}x{}",
            page,
            profile,
            width,
            height,
            binary.width(),
            binary.height()
        );
        Ok(binary)
    }
}

/// Linear stretch between the 1st and 99th percentile.
fn stretch_contrast(image: &GrayImage) -> GrayImage {
    let mut histogram = [0u64; 256];
    for pixel in image.pixels() {
        histogram[pixel[0] as usize] += 1;
    }
    let total = image.width() as u64 * image.height() as u64;
    let cut = total / 100;

    let mut seen = 0;
    let mut low = 0u8;
    for (value, count) in histogram.iter().enumerate() {
        seen += count;
        if seen > cut {
            low = value as u8;
            break;
        }
    }
    seen = 0;
    let mut high = 255u8;
    for (value, count) in histogram.iter().enumerate().rev() {
        seen += count;
        if seen > cut {
            high = value as u8;
            break;
        }
    }
    if high <= low {
        return image.clone();
    }

    let span = (high - low) as f32;
    let mut out = image.clone();
    for pixel in out.pixels_mut() {
        let v = pixel[0].clamp(low, high) - low;
        pixel[0] = ((v as f32 / span) * 255.0).round() as u8;
    }
    out
}

/// Resize by `factor`, shrinking the factor so the result stays under [`MAX_PIXELS`].
fn scale_within_limit(image: &GrayImage, factor: f32) -> GrayImage {
    let (w, h) = image.dimensions();
    let area = w as f64 * h as f64;
    let limit = (MAX_PIXELS as f64 / area).sqrt() as f32;
    let factor = factor.min(limit);
    if (factor - 1.0).abs() < 0.01 {
        return image.clone();
    }
    let new_w = ((w as f32 * factor).round() as u32).max(1);
    let new_h = ((h as f32 * factor).round() as u32).max(1);
    imageops::resize(image, new_w, new_h, FilterType::CatmullRom)
}

/// Find the rotation (degrees) that makes text rows sharpest.
///
/// Scores each candidate by the squared differences between adjacent row ink
/// counts on a downscaled copy. Ties go to the angle closest to zero.
fn estimate_skew(binary: &GrayImage, max_angle: f32, step: f32) -> f32 {
    let (w, h) = binary.dimensions();
    let sample = if w > SKEW_SAMPLE_WIDTH {
        let sh = ((h as u64 * SKEW_SAMPLE_WIDTH as u64) / w as u64).max(1) as u32;
        imageops::resize(binary, SKEW_SAMPLE_WIDTH, sh, FilterType::Nearest)
    } else {
        binary.clone()
    };

    // Candidates ordered by |angle| so the first maximum is the smallest rotation.
    let steps = (max_angle / step).round() as i32;
    let mut candidates = vec![0.0f32];
    for i in 1..=steps {
        let a = i as f32 * step;
        candidates.push(-a);
        candidates.push(a);
    }

    let scores: Vec<u64> = candidates
        .par_iter()
        .map(|&angle| {
            if angle == 0.0 {
                row_profile_score(&sample)
            } else {
                let rotated =
                    rotate_about_center(&sample, angle.to_radians(), Interpolation::Nearest, Luma([255]));
                row_profile_score(&rotated)
            }
        })
        .collect();

    let mut best = 0;
    for (i, score) in scores.iter().enumerate() {
        if *score > scores[best] {
            best = i;
        }
    }
    candidates[best]
}

fn row_profile_score(image: &GrayImage) -> u64 {
    let (w, h) = image.dimensions();
    let mut previous: Option<i64> = None;
    let mut score = 0u64;
    for y in 0..h {
        let ink = (0..w)
            .filter(|&x| image.get_pixel(x, y)[0] <= INK_LEVEL)
            .count() as i64;
        if let Some(p) = previous {
            let d = ink - p;
            score += (d * d) as u64;
        }
        previous = Some(ink);
    }
    score
}

/// Crop to the ink bounding box plus `margin`. Blank images are returned as is.
fn crop_to_content(image: &GrayImage, margin: u32) -> GrayImage {
    let (w, h) = image.dimensions();
    let mut bounds: Option<(u32, u32, u32, u32)> = None;
    for (x, y, pixel) in image.enumerate_pixels() {
        if pixel[0] <= INK_LEVEL {
            bounds = Some(match bounds {
                None => (x, y, x, y),
                Some((x0, y0, x1, y1)) => (x0.min(x), y0.min(y), x1.max(x), y1.max(y)),
            });
        }
    }
    let Some((x0, y0, x1, y1)) = bounds else {
        return image.clone();
    };

    let left = x0.saturating_sub(margin);
    let top = y0.saturating_sub(margin);
    let right = (x1 + margin).min(w - 1);
    let bottom = (y1 + margin).min(h - 1);
    imageops::crop_imm(image, left, top, right - left + 1, bottom - top + 1).to_image()
}
