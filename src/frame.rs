//! Frame type and transport encoding.
//!
//! A `Frame` is one raster image pulled from a video source. Frames move by
//! ownership through the pipeline (acquirer -> frame queue -> processor) and
//! are never aliased across stages.

use anyhow::{anyhow, Result};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use image::codecs::jpeg::JpegEncoder;
use image::imageops::{self, FilterType};
use image::RgbImage;

/// One RGB frame sampled from a video source.
pub struct Frame {
    image: RgbImage,
}

impl Frame {
    pub fn new(image: RgbImage) -> Self {
        Self { image }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn image(&self) -> &RgbImage {
        &self.image
    }

    /// Consume the frame, resampling to the canonical processing resolution.
    pub fn into_resized(self, width: u32, height: u32) -> RgbImage {
        if self.image.width() == width && self.image.height() == height {
            return self.image;
        }
        imageops::resize(&self.image, width, height, FilterType::Triangle)
    }
}

impl From<RgbImage> for Frame {
    fn from(image: RgbImage) -> Self {
        Self::new(image)
    }
}

/// Compress an image to JPEG at the given quality and encode the bytes
/// base64 for text-safe transport.
pub fn encode_jpeg_base64(image: &RgbImage, quality: u8) -> Result<String> {
    let mut bytes = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut bytes, quality);
    encoder
        .encode_image(image)
        .map_err(|e| anyhow!("jpeg encoding failed: {}", e))?;
    Ok(BASE64.encode(bytes))
}
