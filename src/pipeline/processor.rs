//! Frame processing worker, the algorithmic heart of the pipeline.
//!
//! Per frame: resize to the canonical resolution, detect, recognize text in
//! each padded crop, build the detection records, draw the overlay, compress
//! and encode for transport, hand the result to the result queue. A failing
//! recognition is contained to its box; a failing frame is skipped whole.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use anyhow::Result;

use crate::annotate::{
    color_hex, crop_rect, draw_detection, mean_color, upscale_if_small, PixelRect,
};
use crate::config::{PipelineSettings, RecognitionSettings};
use crate::detect::{ObjectDetector, TextRecognizer};
use crate::frame::{encode_jpeg_base64, Frame};
use crate::pipeline::buffer::BoundedQueue;
use crate::pipeline::{Detection, FrameResult, PipelineShared};

pub(crate) struct ProcessorContext {
    pub detector: Arc<Mutex<dyn ObjectDetector>>,
    pub recognizer: Arc<Mutex<dyn TextRecognizer>>,
    pub pipeline: PipelineSettings,
    pub recognition: RecognitionSettings,
}

pub(crate) fn lock_backend<T: ?Sized>(backend: &Mutex<T>) -> MutexGuard<'_, T> {
    match backend.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

pub(crate) fn run_processor(
    ctx: ProcessorContext,
    frames: Arc<BoundedQueue<Frame>>,
    results: Arc<BoundedQueue<FrameResult>>,
    shared: Arc<PipelineShared>,
) {
    let poll: Duration = ctx.pipeline.poll_interval;
    loop {
        if !shared.is_running() {
            break;
        }
        let Some(frame) = frames.pop() else {
            if shared.source_done() {
                break;
            }
            std::thread::sleep(poll);
            continue;
        };

        match process_frame(&ctx, frame) {
            Ok(result) => {
                if !results.push_while(result, || shared.is_running(), poll) {
                    break;
                }
            }
            // No partial result is ever pushed; the frame's emission is skipped.
            Err(e) => log::warn!("frame processing failed, skipping frame: {}", e),
        }
    }
    shared.mark_processor_done();
}

pub(crate) fn process_frame(ctx: &ProcessorContext, frame: Frame) -> Result<FrameResult> {
    let image = frame.into_resized(ctx.pipeline.process_width, ctx.pipeline.process_height);

    let raw_detections = lock_backend(&ctx.detector).detect(
        &image,
        ctx.pipeline.confidence_threshold,
        ctx.pipeline.iou_threshold,
    )?;

    let mut detections = Vec::with_capacity(raw_detections.len());
    let mut overlays = Vec::with_capacity(raw_detections.len());

    for raw in raw_detections {
        let Some(rect) = PixelRect::from_box(&raw.bbox, image.width(), image.height(), 0) else {
            log::warn!("discarding degenerate '{}' box {:?}", raw.label, raw.bbox);
            continue;
        };
        let padded =
            PixelRect::from_box(&raw.bbox, image.width(), image.height(), ctx.recognition.crop_padding)
                .unwrap_or(rect);
        let crop = upscale_if_small(crop_rect(&image, &padded));

        let mut recognizer = lock_backend(&ctx.recognizer);
        let text = match recognizer.recognize(&crop) {
            Ok(raw_text) => normalize_text(&raw_text, ctx.recognition.min_text_len),
            Err(e) => {
                // One failing box never aborts the frame.
                log::warn!(
                    "{} recognition failed for '{}' box: {}",
                    recognizer.name(),
                    raw.label,
                    e
                );
                String::new()
            }
        };
        drop(recognizer);

        let swatch = mean_color(&crop);
        log_detection(&raw.label, raw.confidence, &text);

        overlays.push((rect, swatch));
        detections.push(Detection {
            label: raw.label,
            confidence: raw.confidence,
            bounding_box: raw.bbox.as_array(),
            color_annotation: color_hex(swatch),
            text,
        });
    }

    let mut annotated = image;
    for (rect, color) in &overlays {
        draw_detection(&mut annotated, rect, *color);
    }
    let encoded_frame = encode_jpeg_base64(&annotated, ctx.pipeline.jpeg_quality)?;

    Ok(FrameResult {
        encoded_frame,
        detections,
    })
}

/// Merge multi-line recognizer output into one trimmed string and apply the
/// configurable minimum-length filter.
fn normalize_text(raw: &str, min_len: usize) -> String {
    let merged = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    if min_len > 0 && merged.chars().count() < min_len {
        return String::new();
    }
    merged
}

fn log_detection(label: &str, confidence: f32, text: &str) {
    if text.is_empty() {
        log::info!("DETECTED: {} | conf {:.2} | no text found", label, confidence);
    } else {
        log::info!("DETECTED: {} | conf {:.2} | text {}", label, confidence, text);
    }
}
