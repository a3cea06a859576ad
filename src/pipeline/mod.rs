//! The three-stage detection pipeline.
//!
//! Data flow: source -> acquirer -> frame queue -> processor -> result queue
//! -> emitter -> event sink. The controller owns lifecycle and the queues;
//! workers communicate only through the two bounded queues and the shared
//! flags, and every wait is a polling loop that re-checks those flags.

mod acquirer;
mod buffer;
mod controller;
mod emitter;
mod processor;

pub use buffer::BoundedQueue;
pub use controller::{PipelineState, VideoPipeline};
pub use emitter::ThroughputMeter;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use serde::Serialize;

/// One recognized object instance within a frame.
#[derive(Clone, Debug, Serialize)]
pub struct Detection {
    pub label: String,
    pub confidence: f32,
    /// `[x1, y1, x2, y2]` in processed-frame pixel coordinates.
    pub bounding_box: [f32; 4],
    /// Mean-color swatch of the detection crop, `#rrggbb`.
    pub color_annotation: String,
    /// Recognized text; empty when nothing was read.
    pub text: String,
}

/// Per-frame output bundle, owned by the result queue between processor and
/// emitter. Never persisted.
pub struct FrameResult {
    /// Base64-encoded JPEG of the annotated frame.
    pub encoded_frame: String,
    /// Model output order; the order carries no meaning.
    pub detections: Vec<Detection>,
}

/// Flags shared between the controller and the three workers.
///
/// The controller writes on start/stop; the emitter's observed-drain path
/// also clears `running` (source exhausted, both queues empty). Workers
/// otherwise only read.
pub(crate) struct PipelineShared {
    running: AtomicBool,
    source_done: AtomicBool,
    processor_done: AtomicBool,
    state: Mutex<PipelineState>,
}

impl PipelineShared {
    pub(crate) fn new() -> Self {
        Self {
            running: AtomicBool::new(false),
            source_done: AtomicBool::new(false),
            processor_done: AtomicBool::new(false),
            state: Mutex::new(PipelineState::Idle),
        }
    }

    fn state_guard(&self) -> std::sync::MutexGuard<'_, PipelineState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub(crate) fn state(&self) -> PipelineState {
        *self.state_guard()
    }

    pub(crate) fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub(crate) fn begin_run(&self) {
        self.source_done.store(false, Ordering::SeqCst);
        self.processor_done.store(false, Ordering::SeqCst);
        self.running.store(true, Ordering::SeqCst);
        *self.state_guard() = PipelineState::Running;
    }

    pub(crate) fn request_stop(&self) {
        *self.state_guard() = PipelineState::Stopping;
        self.running.store(false, Ordering::SeqCst);
    }

    pub(crate) fn finish_stop(&self) {
        *self.state_guard() = PipelineState::Idle;
    }

    /// Observed-drain transition: source exhausted and all buffered work
    /// emitted. Collapses straight back to `Idle`.
    pub(crate) fn mark_drained(&self) {
        self.running.store(false, Ordering::SeqCst);
        *self.state_guard() = PipelineState::Idle;
    }

    pub(crate) fn mark_source_done(&self) {
        self.source_done.store(true, Ordering::SeqCst);
    }

    pub(crate) fn source_done(&self) -> bool {
        self.source_done.load(Ordering::SeqCst)
    }

    pub(crate) fn mark_processor_done(&self) {
        self.processor_done.store(true, Ordering::SeqCst);
    }

    pub(crate) fn processor_done(&self) -> bool {
        self.processor_done.load(Ordering::SeqCst)
    }
}
