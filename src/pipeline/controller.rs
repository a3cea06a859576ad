//! Pipeline lifecycle controller.
//!
//! Owns the two queues, the shared flags, and the three worker threads.
//! `start` and `stop` are idempotent; cancellation is cooperative, so `stop`
//! waits for workers to observe the cleared flag and finish their current
//! unit of work.

use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use anyhow::{Context, Result};
use serde_json::json;

use crate::config::{PipelineSettings, RecognitionSettings};
use crate::detect::{ObjectDetector, TextRecognizer};
use crate::frame::Frame;
use crate::pipeline::acquirer::{run_acquirer, AcquirerContext};
use crate::pipeline::buffer::BoundedQueue;
use crate::pipeline::emitter::{run_emitter, EmitterContext};
use crate::pipeline::processor::{lock_backend, run_processor, ProcessorContext};
use crate::pipeline::{FrameResult, PipelineShared};
use crate::publish::{EventSink, EVENT_VIDEO_ERROR};
use crate::source::VideoSourceProvider;

/// Lifecycle states. `Stopping` is transient and collapses back to `Idle`
/// once the workers have quiesced.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    Running,
    Stopping,
}

pub struct VideoPipeline {
    pipeline: PipelineSettings,
    recognition: RecognitionSettings,
    /// Acquirer pacing when the source reports no usable frame rate.
    fallback_fps: f64,
    provider: Box<dyn VideoSourceProvider>,
    detector: Arc<Mutex<dyn ObjectDetector>>,
    recognizer: Arc<Mutex<dyn TextRecognizer>>,
    sink: Arc<dyn EventSink>,
    shared: Arc<PipelineShared>,
    workers: Vec<JoinHandle<()>>,
    queues: Option<(Arc<BoundedQueue<Frame>>, Arc<BoundedQueue<FrameResult>>)>,
}

impl VideoPipeline {
    pub fn new<D, R>(
        pipeline: PipelineSettings,
        recognition: RecognitionSettings,
        fallback_fps: f64,
        provider: Box<dyn VideoSourceProvider>,
        detector: D,
        recognizer: R,
        sink: Arc<dyn EventSink>,
    ) -> Self
    where
        D: ObjectDetector + 'static,
        R: TextRecognizer + 'static,
    {
        Self {
            pipeline,
            recognition,
            fallback_fps,
            provider,
            detector: Arc::new(Mutex::new(detector)),
            recognizer: Arc::new(Mutex::new(recognizer)),
            sink,
            shared: Arc::new(PipelineShared::new()),
            workers: Vec::new(),
            queues: None,
        }
    }

    pub fn state(&self) -> PipelineState {
        self.shared.state()
    }

    pub fn is_running(&self) -> bool {
        self.shared.is_running()
    }

    /// Current frame/result queue depths, while a run is active.
    pub fn queue_depths(&self) -> Option<(usize, usize)> {
        self.queues
            .as_ref()
            .map(|(frames, results)| (frames.len(), results.len()))
    }

    /// Open the source and spawn the three workers. A second call while
    /// running is a no-op. An open failure publishes a single `video_error`
    /// event, spawns nothing, and leaves the pipeline `Idle`.
    pub fn start(&mut self) -> Result<()> {
        if self.shared.state() == PipelineState::Running {
            log::debug!("pipeline already running, start ignored");
            return Ok(());
        }
        // A drained run leaves finished workers behind; reap them first.
        self.reap_workers();

        let source = match self.provider.open() {
            Ok(source) => source,
            Err(e) => {
                log::error!(
                    "failed to open video source {}: {}",
                    self.provider.describe(),
                    e
                );
                self.sink.publish(
                    EVENT_VIDEO_ERROR,
                    json!({ "error": format!("video source unavailable: {}", e) }),
                );
                return Ok(());
            }
        };

        {
            let mut detector = lock_backend(&self.detector);
            if let Err(e) = detector.warm_up() {
                log::warn!("detector '{}' warm-up failed: {}", detector.name(), e);
            } else {
                log::debug!("detector '{}' ready", detector.name());
            }
        }

        let frames = Arc::new(BoundedQueue::new(self.pipeline.buffer_capacity));
        let results = Arc::new(BoundedQueue::new(self.pipeline.buffer_capacity));
        self.shared.begin_run();

        let acquirer_ctx = AcquirerContext {
            source,
            fallback_fps: self.fallback_fps,
            poll_interval: self.pipeline.poll_interval,
        };
        let processor_ctx = ProcessorContext {
            detector: self.detector.clone(),
            recognizer: self.recognizer.clone(),
            pipeline: self.pipeline.clone(),
            recognition: self.recognition.clone(),
        };
        let emitter_ctx = EmitterContext {
            sink: self.sink.clone(),
            poll_interval: self.pipeline.poll_interval,
            log_interval: self.pipeline.throughput_log_interval,
            reset_threshold: self.pipeline.throughput_reset_threshold,
        };

        let mut workers = Vec::with_capacity(3);
        let spawned = (|| -> Result<()> {
            workers.push(spawn_worker("platewatch-acquirer", {
                let frames = frames.clone();
                let shared = self.shared.clone();
                move || run_acquirer(acquirer_ctx, frames, shared)
            })?);
            workers.push(spawn_worker("platewatch-processor", {
                let frames = frames.clone();
                let results = results.clone();
                let shared = self.shared.clone();
                move || run_processor(processor_ctx, frames, results, shared)
            })?);
            workers.push(spawn_worker("platewatch-emitter", {
                let results = results.clone();
                let shared = self.shared.clone();
                move || run_emitter(emitter_ctx, results, shared)
            })?);
            Ok(())
        })();
        if let Err(e) = spawned {
            self.shared.request_stop();
            for handle in workers.drain(..) {
                join_worker(handle);
            }
            self.shared.finish_stop();
            return Err(e);
        }

        self.workers = workers;
        self.queues = Some((frames, results));
        log::info!("video processing started ({})", self.provider.describe());
        Ok(())
    }

    /// Cooperative stop. A no-op when `Idle`; otherwise clears the running
    /// flag and joins all workers before collapsing to `Idle`.
    pub fn stop(&mut self) {
        if self.shared.state() == PipelineState::Idle {
            self.reap_workers();
            return;
        }
        log::info!("stopping video processing");
        self.shared.request_stop();
        self.reap_workers();
        self.shared.finish_stop();
        self.queues = None;
        log::info!("video processing stopped");
    }

    fn reap_workers(&mut self) {
        for handle in self.workers.drain(..) {
            join_worker(handle);
        }
    }
}

impl Drop for VideoPipeline {
    fn drop(&mut self) {
        self.stop();
    }
}

fn spawn_worker(
    name: &str,
    body: impl FnOnce() + Send + 'static,
) -> Result<JoinHandle<()>> {
    std::thread::Builder::new()
        .name(name.to_string())
        .spawn(body)
        .with_context(|| format!("failed to spawn {}", name))
}

fn join_worker(handle: JoinHandle<()>) {
    let name = handle
        .thread()
        .name()
        .unwrap_or("platewatch-worker")
        .to_string();
    // A crashed worker must never disappear silently; a stall is the one
    // failure mode this pipeline actively guards against.
    if handle.join().is_err() {
        log::error!("{} panicked", name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PlatewatchConfig;
    use crate::detect::{StubDetector, StubRecognizer};
    use crate::source::VideoSource;
    use anyhow::anyhow;
    use serde_json::Value;

    struct FailingProvider;

    impl VideoSourceProvider for FailingProvider {
        fn open(&self) -> Result<Box<dyn VideoSource>> {
            Err(anyhow!("device missing"))
        }
        fn describe(&self) -> String {
            "test://missing".to_string()
        }
    }

    #[derive(Default)]
    struct MemorySink {
        events: Mutex<Vec<(String, Value)>>,
    }

    impl EventSink for MemorySink {
        fn publish(&self, event: &str, payload: Value) {
            self.events
                .lock()
                .unwrap()
                .push((event.to_string(), payload));
        }
    }

    fn failing_pipeline(sink: Arc<MemorySink>) -> VideoPipeline {
        let cfg = PlatewatchConfig::default();
        VideoPipeline::new(
            cfg.pipeline,
            cfg.recognition,
            cfg.source.fallback_fps,
            Box::new(FailingProvider),
            StubDetector::new(),
            StubRecognizer::new(),
            sink,
        )
    }

    #[test]
    fn stop_on_idle_pipeline_is_a_noop() {
        let sink = Arc::new(MemorySink::default());
        let mut pipeline = failing_pipeline(sink.clone());
        pipeline.stop();
        assert_eq!(pipeline.state(), PipelineState::Idle);
        assert!(sink.events.lock().unwrap().is_empty());
    }

    #[test]
    fn open_failure_publishes_one_error_and_stays_idle() {
        let sink = Arc::new(MemorySink::default());
        let mut pipeline = failing_pipeline(sink.clone());

        pipeline.start().unwrap();

        assert_eq!(pipeline.state(), PipelineState::Idle);
        assert!(!pipeline.is_running());
        assert!(pipeline.queue_depths().is_none());
        let events = sink.events.lock().unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].0, EVENT_VIDEO_ERROR);
        assert!(events[0].1["error"]
            .as_str()
            .unwrap()
            .contains("video source unavailable"));
    }
}
