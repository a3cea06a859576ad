use anyhow::Result;
use image::RgbImage;

/// Text recognition backend, run on cropped detection regions.
///
/// Returns the recognized text, or an empty string when the crop contains
/// nothing readable. Output may span multiple lines; the pipeline merges
/// lines into a single trimmed string.
pub trait TextRecognizer: Send {
    /// Backend identifier.
    fn name(&self) -> &'static str;

    /// Recognize text in a cropped region.
    fn recognize(&mut self, crop: &RgbImage) -> Result<String>;
}
