use image::imageops::{self, FilterType};
use image::{DynamicImage, RgbImage};
use serde::Serialize;

use super::error::ClassifierError;

/// Side of the square every image is resampled to before analysis.
pub const SAMPLE_SIZE: u32 = 64;

/// Brightness difference (0-255 scale) above which a vertical pixel pair counts as an edge.
pub const EDGE_THRESHOLD: f32 = 50.0;

const SAMPLE_PIXELS: usize = (SAMPLE_SIZE * SAMPLE_SIZE) as usize;
const ROW_STRIDE: usize = SAMPLE_SIZE as usize;

/// Coarse color and texture statistics of a downsampled image.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureSummary {
    pub avg_red: f32,
    pub avg_green: f32,
    pub avg_blue: f32,
    pub avg_brightness: f32,
    pub edge_count: u32,
}

impl FeatureSummary {
    pub fn from_image(image: &DynamicImage) -> Result<Self, ClassifierError> {
        if image.width() == 0 || image.height() == 0 {
            return Err(ClassifierError::ValidationError("Image has no pixels".into()));
        }
        Ok(Self::from_sample(&downsample(image)))
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ClassifierError> {
        let image = image::load_from_memory(bytes)?;
        Self::from_image(&image)
    }

    /// Computes the statistics of an already resampled `SAMPLE_SIZE` square.
    fn from_sample(sample: &RgbImage) -> Self {
        let pixels = sample.as_raw();
        debug_assert_eq!(pixels.len(), SAMPLE_PIXELS * 3);

        let brightness: Vec<f32> = pixels
            .chunks_exact(3)
            .map(|px| (px[0] as f32 + px[1] as f32 + px[2] as f32) / 3.0)
            .collect();

        let (mut red, mut green, mut blue) = (0u64, 0u64, 0u64);
        for px in pixels.chunks_exact(3) {
            red += px[0] as u64;
            green += px[1] as u64;
            blue += px[2] as u64;
        }
        let brightness_sum: f64 = brightness.iter().map(|&b| b as f64).sum();

        // First row plus one pixel and the last row are not compared.
        let edge_count = (ROW_STRIDE + 1..SAMPLE_PIXELS - ROW_STRIDE)
            .filter(|&p| (brightness[p] - brightness[p - ROW_STRIDE]).abs() > EDGE_THRESHOLD)
            .count() as u32;

        let total = SAMPLE_PIXELS as f64;
        Self {
            avg_red: (red as f64 / total) as f32,
            avg_green: (green as f64 / total) as f32,
            avg_blue: (blue as f64 / total) as f32,
            avg_brightness: (brightness_sum / total) as f32,
            edge_count,
        }
    }
}

fn downsample(image: &DynamicImage) -> RgbImage {
    let rgb = image.to_rgb8();
    if rgb.width() == SAMPLE_SIZE && rgb.height() == SAMPLE_SIZE {
        return rgb;
    }
    imageops::resize(&rgb, SAMPLE_SIZE, SAMPLE_SIZE, FilterType::Triangle)
}
