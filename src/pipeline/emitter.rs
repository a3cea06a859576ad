//! Result emission worker.
//!
//! Pops processed results, computes rolling throughput, and publishes the
//! per-frame event to the sink. The rolling window resets periodically so the
//! reported rate tracks current speed instead of averaging over the whole
//! stream. The emitter also owns the observed-drain transition: once the
//! source is done and both queues are empty, the pipeline collapses to Idle.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::json;

use crate::pipeline::buffer::BoundedQueue;
use crate::pipeline::{FrameResult, PipelineShared};
use crate::publish::{EventSink, EVENT_VIDEO_FRAME};

/// Rolling throughput counter. Callers inject `now` instants, which keeps the
/// windowing logic deterministic under test.
pub struct ThroughputMeter {
    window_start: Instant,
    frames: u64,
    log_interval: u64,
    reset_threshold: u64,
}

impl ThroughputMeter {
    pub fn new(now: Instant, log_interval: u64, reset_threshold: u64) -> Self {
        Self {
            window_start: now,
            frames: 0,
            log_interval,
            reset_threshold,
        }
    }

    /// Count one emitted frame and return the instantaneous frames/sec over
    /// the current window.
    pub fn record(&mut self, now: Instant) -> f64 {
        self.frames += 1;
        let elapsed = now
            .checked_duration_since(self.window_start)
            .unwrap_or_default()
            .as_secs_f64();
        if elapsed > 0.0 {
            self.frames as f64 / elapsed
        } else {
            0.0
        }
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// True every `log_interval` frames.
    pub fn at_log_point(&self) -> bool {
        self.log_interval > 0 && self.frames % self.log_interval == 0 && self.frames > 0
    }

    /// Reset the window once the counter has passed the reset threshold.
    /// Checked at log points, so the counter grows at most one log interval
    /// past the threshold.
    pub fn maybe_reset(&mut self, now: Instant) -> bool {
        if self.frames > self.reset_threshold {
            self.window_start = now;
            self.frames = 0;
            return true;
        }
        false
    }
}

pub(crate) struct EmitterContext {
    pub sink: Arc<dyn EventSink>,
    pub poll_interval: Duration,
    pub log_interval: u64,
    pub reset_threshold: u64,
}

pub(crate) fn run_emitter(
    ctx: EmitterContext,
    results: Arc<BoundedQueue<FrameResult>>,
    shared: Arc<PipelineShared>,
) {
    let mut meter = ThroughputMeter::new(Instant::now(), ctx.log_interval, ctx.reset_threshold);

    let drained = loop {
        if !shared.is_running() {
            break false;
        }
        let Some(result) = results.pop() else {
            // The processor only reports done after its last push, so an
            // empty queue at that point means the stream is fully drained.
            if shared.processor_done() {
                break true;
            }
            std::thread::sleep(ctx.poll_interval);
            continue;
        };

        let fps = meter.record(Instant::now());
        ctx.sink.publish(
            EVENT_VIDEO_FRAME,
            json!({
                "frame": result.encoded_frame,
                "detections": result.detections,
                "fps": fps,
            }),
        );

        if meter.at_log_point() {
            log::info!("processing throughput: {:.2} fps", fps);
            if meter.maybe_reset(Instant::now()) {
                log::debug!("throughput window reset");
            }
        }
    };

    if drained {
        shared.mark_drained();
    }
    log::info!("video stream stopped");
}
