//! Frame acquisition worker.
//!
//! Pulls frames from the open source at the source's native pacing and hands
//! them to the frame queue, backing off while the queue is full. End of
//! stream and read failures both terminate the loop as a normal drain, not a
//! pipeline failure.

use std::sync::Arc;
use std::time::Duration;

use crate::frame::Frame;
use crate::pipeline::buffer::BoundedQueue;
use crate::pipeline::PipelineShared;
use crate::source::VideoSource;

pub(crate) struct AcquirerContext {
    pub source: Box<dyn VideoSource>,
    pub fallback_fps: f64,
    pub poll_interval: Duration,
}

pub(crate) fn run_acquirer(
    mut ctx: AcquirerContext,
    frames: Arc<BoundedQueue<Frame>>,
    shared: Arc<PipelineShared>,
) {
    let delay = frame_delay(ctx.source.frame_rate(), ctx.fallback_fps);
    let mut acquired: u64 = 0;

    while shared.is_running() {
        match ctx.source.read() {
            Ok(Some(frame)) => {
                if !frames.push_while(frame, || shared.is_running(), ctx.poll_interval) {
                    break;
                }
                acquired += 1;
                std::thread::sleep(delay);
            }
            Ok(None) => {
                log::info!("video source exhausted after {} frames", acquired);
                break;
            }
            Err(e) => {
                log::warn!("video source read failed, treating as end of stream: {}", e);
                break;
            }
        }
    }

    // The acquirer owns the source handle; release exactly once on exit.
    ctx.source.release();
    shared.mark_source_done();
}

/// Pace reads at the source's reported rate, falling back to ~33 ms when the
/// rate is unknown or invalid.
fn frame_delay(reported_fps: Option<f64>, fallback_fps: f64) -> Duration {
    let fps = reported_fps
        .filter(|fps| fps.is_finite() && *fps > 0.0)
        .unwrap_or(fallback_fps);
    if fps.is_finite() && fps > 0.0 {
        Duration::from_secs_f64(1.0 / fps)
    } else {
        Duration::from_millis(33)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delay_follows_reported_rate() {
        assert_eq!(frame_delay(Some(25.0), 30.0), Duration::from_secs_f64(0.04));
    }

    #[test]
    fn delay_falls_back_for_invalid_rates() {
        assert_eq!(
            frame_delay(Some(0.0), 30.0),
            Duration::from_secs_f64(1.0 / 30.0)
        );
        assert_eq!(
            frame_delay(None, 30.0),
            Duration::from_secs_f64(1.0 / 30.0)
        );
        assert_eq!(frame_delay(Some(f64::NAN), 0.0), Duration::from_millis(33));
    }
}
