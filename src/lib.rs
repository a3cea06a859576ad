//! platewatch - real-time video detection pipeline.
//!
//! A three-stage concurrent pipeline that reads frames from a video source,
//! runs object detection and text recognition on each frame, and streams
//! annotated results to subscribers with live throughput metrics.
//!
//! # Architecture
//!
//! ```text
//! source -> acquirer -> [frame queue] -> processor -> [result queue] -> emitter -> sink
//! ```
//!
//! - Both queues are bounded; their capacity is the only backpressure
//!   mechanism. A slow consumer throttles the producer instead of growing
//!   memory without bound.
//! - The three workers are plain threads supervised by the
//!   [`pipeline::VideoPipeline`] controller. Cancellation is cooperative:
//!   every wait is a short polling loop that re-checks the running flag.
//! - Detection, text recognition, the video source, and the outward publish
//!   channel are trait seams ([`detect::ObjectDetector`],
//!   [`detect::TextRecognizer`], [`source::VideoSource`],
//!   [`publish::EventSink`]), so the pipeline core runs unchanged against
//!   real models or deterministic stubs.

pub mod annotate;
pub mod config;
pub mod detect;
pub mod frame;
pub mod pipeline;
pub mod publish;
pub mod source;

pub use config::{PipelineSettings, PlatewatchConfig, RecognitionSettings, SourceSettings};
pub use detect::{
    BoundingBox, ObjectDetector, RawDetection, StubDetector, StubRecognizer, TextRecognizer,
};
pub use frame::Frame;
pub use pipeline::{
    BoundedQueue, Detection, FrameResult, PipelineState, ThroughputMeter, VideoPipeline,
};
pub use publish::{EventSink, MqttSettings, MqttSink, EVENT_VIDEO_ERROR, EVENT_VIDEO_FRAME};
pub use source::{PathSourceProvider, SyntheticSource, VideoSource, VideoSourceProvider};
