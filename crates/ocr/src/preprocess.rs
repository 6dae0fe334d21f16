use image::{DynamicImage, GrayImage, ImageBuffer, Luma};
use imageproc::contrast::equalize_histogram;
use imageproc::filter::median_filter;
use serde::Serialize;
use std::fmt;
use std::io::Cursor;
use std::path::Path;
use thiserror::Error;

use crate::filters;

/// Longest side accepted before downscaling (Tesseract works best at ~300 DPI / ~2000 px).
const MAX_SIDE: u32 = 2800;

#[derive(Debug, Error)]
pub enum PreprocessError {
    #[error("Failed to decode image: {0}")]
    Decode(#[from] image::ImageError),
    #[error("Failed to encode processed image: {0}")]
    Encode(String),
    #[error("Image has no pixels")]
    EmptyImage,
}

/// A binarization recipe, each aimed at a different class of label defect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Technique {
    Otsu,
    AdaptiveGaussian,
    EqualizedAdaptive,
    Sharpened,
    Denoised,
    Bilateral,
    Clahe,
    ContrastStretch,
}

impl Technique {
    /// Bank order.
    pub const ALL: [Technique; 8] = [
        Technique::Otsu,
        Technique::AdaptiveGaussian,
        Technique::EqualizedAdaptive,
        Technique::Sharpened,
        Technique::Denoised,
        Technique::Bilateral,
        Technique::Clahe,
        Technique::ContrastStretch,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Technique::Otsu => "otsu",
            Technique::AdaptiveGaussian => "adaptive_gaussian",
            Technique::EqualizedAdaptive => "equalized_adaptive",
            Technique::Sharpened => "sharpened",
            Technique::Denoised => "denoised",
            Technique::Bilateral => "bilateral",
            Technique::Clahe => "clahe",
            Technique::ContrastStretch => "contrast_stretch",
        }
    }

    /// Derive this technique's binary image from a grayscale source.
    pub fn apply(self, gray: &GrayImage) -> GrayImage {
        match self {
            Technique::Otsu => filters::otsu_binarize(gray),
            Technique::AdaptiveGaussian => {
                let blurred = filters::gaussian_blur3x3(gray);
                filters::adaptive_mean_threshold(&blurred, 11, 2)
            }
            Technique::EqualizedAdaptive => {
                let equalized = equalize_histogram(gray);
                filters::adaptive_mean_threshold(&equalized, 15, 5)
            }
            Technique::Sharpened => {
                let sharpened = filters::sharpen(gray);
                filters::otsu_binarize(&sharpened)
            }
            Technique::Denoised => {
                let denoised = median_filter(gray, 1, 1);
                filters::open(&filters::otsu_binarize(&denoised), 2, 2)
            }
            Technique::Bilateral => {
                let smoothed = filters::bilateral(gray, 9, 75.0, 75.0);
                filters::otsu_binarize(&smoothed)
            }
            Technique::Clahe => {
                let enhanced = filters::clahe(gray, 2.0, 8);
                let binary = filters::adaptive_mean_threshold(&enhanced, 11, 2);
                filters::close(&binary, 2, 1)
            }
            Technique::ContrastStretch => filters::otsu_binarize(&filters::stretch_contrast(gray)),
        }
    }
}

impl fmt::Display for Technique {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for Technique {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Technique::ALL
            .into_iter()
            .find(|t| t.name() == s)
            .ok_or_else(|| format!("Unknown preprocessing technique: '{s}'"))
    }
}

/// One binarized rendition of the source image.
#[derive(Debug, Clone)]
pub struct Variant {
    pub technique: Technique,
    pub image: GrayImage,
}

/// Produces the preprocessed variants of a source image.
pub trait VariantSource: Send + Sync {
    fn produce_variants(&self, image: &DynamicImage) -> Result<Vec<Variant>, PreprocessError>;
}

/// Runs every [`Technique`] against a grayscale copy of the source.
#[derive(Debug, Clone, Copy, Default)]
pub struct PreprocessingBank;

impl VariantSource for PreprocessingBank {
    fn produce_variants(&self, image: &DynamicImage) -> Result<Vec<Variant>, PreprocessError> {
        if image.width() == 0 || image.height() == 0 {
            return Err(PreprocessError::EmptyImage);
        }

        let gray = image.to_luma8();
        let variants = Technique::ALL
            .into_iter()
            .map(|technique| {
                tracing::debug!(technique = technique.name(), "applying preprocessing technique");
                Variant { technique, image: technique.apply(&gray) }
            })
            .collect();
        Ok(variants)
    }
}

/// Decode raw image bytes (JPEG / PNG / WEBP / …), downscaling oversized images.
pub fn load_image(data: &[u8]) -> Result<DynamicImage, PreprocessError> {
    let img = image::load_from_memory(data)?;
    if img.width() == 0 || img.height() == 0 {
        return Err(PreprocessError::EmptyImage);
    }
    Ok(if img.width() > MAX_SIDE || img.height() > MAX_SIDE {
        img.resize(MAX_SIDE, MAX_SIDE, image::imageops::FilterType::Lanczos3)
    } else {
        img
    })
}

pub fn encode_png(img: &DynamicImage) -> Result<Vec<u8>, PreprocessError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .map_err(|e| PreprocessError::Encode(e.to_string()))?;
    Ok(buf)
}

/// Tile variants left-to-right, top-to-bottom on a white canvas.
/// Presentation only; nothing in the pipeline reads the result.
pub fn composite_grid(variants: &[Variant], columns: u32) -> GrayImage {
    if variants.is_empty() {
        return GrayImage::new(0, 0);
    }
    let columns = columns.clamp(1, variants.len() as u32);
    let rows = (variants.len() as u32).div_ceil(columns);
    let cell_w = variants.iter().map(|v| v.image.width()).max().unwrap_or(0);
    let cell_h = variants.iter().map(|v| v.image.height()).max().unwrap_or(0);

    let mut canvas: GrayImage = ImageBuffer::from_pixel(cell_w * columns, cell_h * rows, Luma([255]));
    for (idx, variant) in variants.iter().enumerate() {
        let (col, row) = (idx as u32 % columns, idx as u32 / columns);
        image::imageops::replace(
            &mut canvas,
            &variant.image,
            i64::from(col * cell_w),
            i64::from(row * cell_h),
        );
    }
    canvas
}

/// Write [`composite_grid`] output as a PNG.
pub fn save_composite(variants: &[Variant], columns: u32, path: &Path) -> Result<(), PreprocessError> {
    let grid = composite_grid(variants, columns);
    if grid.width() == 0 {
        return Err(PreprocessError::EmptyImage);
    }
    grid.save_with_format(path, image::ImageFormat::Png)
        .map_err(|e| PreprocessError::Encode(e.to_string()))
}
