//! Deterministic stub backends for development and tests.
//!
//! The stub detector reports the bounding box of bright pixels, which is
//! exactly what the synthetic `stub://` source paints for its plate region.
//! The stub recognizer derives a stable pseudo-plate string from a pixel
//! hash, so demo output is reproducible per crop.

use anyhow::Result;
use image::RgbImage;
use sha2::{Digest, Sha256};

use crate::detect::backend::ObjectDetector;
use crate::detect::recognizer::TextRecognizer;
use crate::detect::result::{BoundingBox, RawDetection};

/// Luma above which a pixel counts as part of a plate blob.
const BRIGHT_LUMA: u32 = 200;

/// Blobs smaller than this are ignored as noise.
const MIN_BLOB_PIXELS: u32 = 64;

fn luma(pixel: &image::Rgb<u8>) -> u32 {
    let [r, g, b] = pixel.0;
    (299 * r as u32 + 587 * g as u32 + 114 * b as u32) / 1000
}

/// Stub detector: finds the bounding box of bright pixels and labels it
/// "plate". Confidence scales with how solidly the box is filled.
pub struct StubDetector;

impl StubDetector {
    pub fn new() -> Self {
        Self
    }
}

impl Default for StubDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl ObjectDetector for StubDetector {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn detect(
        &mut self,
        image: &RgbImage,
        confidence_threshold: f32,
        _iou_threshold: f32,
    ) -> Result<Vec<RawDetection>> {
        let mut count: u32 = 0;
        let (mut min_x, mut min_y) = (u32::MAX, u32::MAX);
        let (mut max_x, mut max_y) = (0u32, 0u32);

        for (x, y, pixel) in image.enumerate_pixels() {
            if luma(pixel) >= BRIGHT_LUMA {
                count += 1;
                min_x = min_x.min(x);
                min_y = min_y.min(y);
                max_x = max_x.max(x);
                max_y = max_y.max(y);
            }
        }

        if count < MIN_BLOB_PIXELS {
            return Ok(vec![]);
        }

        let area = ((max_x - min_x + 1) * (max_y - min_y + 1)) as f32;
        let coverage = count as f32 / area;
        let confidence = (0.95 * coverage).min(0.99);
        if confidence < confidence_threshold {
            return Ok(vec![]);
        }

        Ok(vec![RawDetection {
            label: "plate".to_string(),
            confidence,
            bbox: BoundingBox::new(
                min_x as f32,
                min_y as f32,
                (max_x + 1) as f32,
                (max_y + 1) as f32,
            ),
        }])
    }
}

/// Mean luma below which a crop is treated as unreadable.
const READABLE_LUMA: u32 = 150;

/// Stub recognizer: hashes the crop and formats a pseudo-plate string.
/// Dark crops read as nothing.
pub struct StubRecognizer;

impl StubRecognizer {
    pub fn new() -> Self {
        Self
    }
}

impl Default for StubRecognizer {
    fn default() -> Self {
        Self::new()
    }
}

impl TextRecognizer for StubRecognizer {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn recognize(&mut self, crop: &RgbImage) -> Result<String> {
        let pixel_count = (crop.width() * crop.height()).max(1) as u64;
        let total: u64 = crop.pixels().map(|p| luma(p) as u64).sum();
        if total / pixel_count < READABLE_LUMA as u64 {
            return Ok(String::new());
        }

        let hash: [u8; 32] = Sha256::digest(crop.as_raw()).into();
        let letters: String = hash[..3].iter().map(|b| (b'A' + b % 26) as char).collect();
        let digits: String = hash[3..7].iter().map(|b| (b'0' + b % 10) as char).collect();
        Ok(format!("{} {}", letters, digits))
    }
}
