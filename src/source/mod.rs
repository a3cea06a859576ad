//! Video sources.
//!
//! A `VideoSource` hands frames to the acquirer at whatever pace the
//! underlying stream dictates; the acquirer paces itself from the reported
//! frame rate. Real decoders live behind this trait as opaque collaborators.
//! The built-in `stub://` synthetic source covers development and tests.

mod synthetic;

pub use synthetic::{SyntheticConfig, SyntheticSource};

use anyhow::{anyhow, Result};

use crate::frame::Frame;

/// An open video stream.
pub trait VideoSource: Send {
    /// Read the next frame. `Ok(None)` signals end of stream.
    fn read(&mut self) -> Result<Option<Frame>>;

    /// Native frame rate as reported by the stream, when known.
    fn frame_rate(&self) -> Option<f64>;

    /// Release the underlying stream resources. Called exactly once when the
    /// acquirer's loop ends.
    fn release(&mut self);
}

/// Opens a video source. The open seam is injectable so the pipeline can be
/// driven by scripted sources in tests and so an open failure exercises the
/// error-event path without touching real devices.
pub trait VideoSourceProvider: Send + Sync {
    fn open(&self) -> Result<Box<dyn VideoSource>>;

    /// Human-readable identifier for logs and error events.
    fn describe(&self) -> String;
}

/// Provider that opens a source from a configured path.
///
/// Only local paths are accepted. `stub://` paths open the synthetic source;
/// anything else fails at open time, which surfaces as a `video_error` event.
pub struct PathSourceProvider {
    path: String,
}

impl PathSourceProvider {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }
}

impl VideoSourceProvider for PathSourceProvider {
    fn open(&self) -> Result<Box<dyn VideoSource>> {
        if !is_local_path(&self.path) {
            return Err(anyhow!(
                "video ingestion only supports local paths (no URL schemes)"
            ));
        }
        if self.path.starts_with("stub://") {
            let config = SyntheticConfig::parse(&self.path)?;
            return Ok(Box::new(SyntheticSource::new(config)));
        }
        Err(anyhow!(
            "no decoder available for '{}' (only stub:// sources are built in)",
            self.path
        ))
    }

    fn describe(&self) -> String {
        self.path.clone()
    }
}

fn is_local_path(path: &str) -> bool {
    if path.trim().is_empty() {
        return false;
    }
    if path.starts_with("stub://") {
        return true;
    }
    !path.contains("://")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stub_paths_open() {
        let provider = PathSourceProvider::new("stub://gate");
        assert!(provider.open().is_ok());
    }

    #[test]
    fn url_schemes_are_rejected() {
        let provider = PathSourceProvider::new("rtsp://camera.local/stream");
        assert!(provider.open().is_err());
    }

    #[test]
    fn empty_path_is_rejected() {
        let provider = PathSourceProvider::new("  ");
        assert!(provider.open().is_err());
    }

    #[test]
    fn plain_file_path_has_no_decoder() {
        let provider = PathSourceProvider::new("/var/lib/platewatch/entrance.mp4");
        let err = provider.open().err().unwrap();
        assert!(err.to_string().contains("no decoder"));
    }
}
