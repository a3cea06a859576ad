use anyhow::Result;
use image::RgbImage;

use crate::detect::result::RawDetection;

/// Object detection backend.
///
/// The detection model is an opaque, replaceable collaborator: the pipeline
/// hands it a frame and two thresholds and receives labelled boxes back.
/// Implementations must treat the image as read-only and ephemeral and must
/// not retain it beyond the `detect` call.
pub trait ObjectDetector: Send {
    /// Backend identifier.
    fn name(&self) -> &'static str;

    /// Run detection on a frame at the canonical processing resolution.
    ///
    /// `confidence_threshold` filters low-confidence boxes; `iou_threshold`
    /// is the overlap-suppression bound. Both are in `[0, 1]`.
    fn detect(
        &mut self,
        image: &RgbImage,
        confidence_threshold: f32,
        iou_threshold: f32,
    ) -> Result<Vec<RawDetection>>;

    /// Optional warm-up hook.
    fn warm_up(&mut self) -> Result<()> {
        Ok(())
    }
}
