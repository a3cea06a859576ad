//! Synthetic `stub://` video source.
//!
//! Generates a dim gradient scene with a bright plate rectangle painted on a
//! configurable cadence, so the stub detector has something real to find.
//! Used by the daemon for dry runs and by the integration tests.

use anyhow::{anyhow, Result};
use image::{Rgb, RgbImage};

use super::VideoSource;
use crate::frame::Frame;

const DEFAULT_WIDTH: u32 = 640;
const DEFAULT_HEIGHT: u32 = 480;
const DEFAULT_FPS: f64 = 25.0;
const DEFAULT_PLATE_INTERVAL: u64 = 3;

/// Configuration parsed from a `stub://` path, e.g.
/// `stub://entrance?frames=120&fps=10&plate_every=2`.
#[derive(Clone, Debug)]
pub struct SyntheticConfig {
    pub name: String,
    pub fps: f64,
    /// Total frames before end of stream; `None` streams forever.
    pub frame_limit: Option<u64>,
    pub width: u32,
    pub height: u32,
    /// Every Nth frame carries a plate rectangle; 0 disables plates.
    pub plate_interval: u64,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            name: "synthetic".to_string(),
            fps: DEFAULT_FPS,
            frame_limit: None,
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            plate_interval: DEFAULT_PLATE_INTERVAL,
        }
    }
}

impl SyntheticConfig {
    pub fn parse(path: &str) -> Result<Self> {
        let rest = path
            .strip_prefix("stub://")
            .ok_or_else(|| anyhow!("synthetic source path must start with stub://"))?;
        let (name, query) = match rest.split_once('?') {
            Some((name, query)) => (name, Some(query)),
            None => (rest, None),
        };

        let mut config = Self {
            name: if name.is_empty() {
                "synthetic".to_string()
            } else {
                name.to_string()
            },
            ..Self::default()
        };

        if let Some(query) = query {
            for pair in query.split('&').filter(|p| !p.is_empty()) {
                let (key, value) = pair
                    .split_once('=')
                    .ok_or_else(|| anyhow!("malformed stub:// query parameter '{}'", pair))?;
                match key {
                    "frames" => config.frame_limit = Some(parse_num(key, value)?),
                    "fps" => {
                        config.fps = value
                            .parse::<f64>()
                            .map_err(|_| anyhow!("stub:// fps must be a number"))?
                    }
                    "plate_every" => config.plate_interval = parse_num(key, value)?,
                    "width" => config.width = parse_num(key, value)? as u32,
                    "height" => config.height = parse_num(key, value)? as u32,
                    _ => return Err(anyhow!("unknown stub:// parameter '{}'", key)),
                }
            }
        }
        if config.width == 0 || config.height == 0 {
            return Err(anyhow!("stub:// dimensions must be non-zero"));
        }
        Ok(config)
    }
}

fn parse_num(key: &str, value: &str) -> Result<u64> {
    value
        .parse::<u64>()
        .map_err(|_| anyhow!("stub:// parameter '{}' must be an integer", key))
}

/// Deterministic synthetic stream.
pub struct SyntheticSource {
    config: SyntheticConfig,
    frames_read: u64,
}

impl SyntheticSource {
    pub fn new(config: SyntheticConfig) -> Self {
        Self {
            config,
            frames_read: 0,
        }
    }

    fn generate(&self, index: u64) -> RgbImage {
        let mut image = RgbImage::from_fn(self.config.width, self.config.height, |x, y| {
            // Dim drifting gradient, always well below the bright-blob luma.
            let v = ((x + y + index as u32) % 96) as u8;
            Rgb([v, v, v])
        });

        let with_plate =
            self.config.plate_interval > 0 && index % self.config.plate_interval == 0;
        if with_plate {
            let (w, h) = (self.config.width, self.config.height);
            let (x1, x2) = (w / 4, w / 4 + w / 5);
            let (y1, y2) = (h / 3, h / 3 + h / 8);
            for y in y1..y2.min(h) {
                for x in x1..x2.min(w) {
                    // Bright plate region with per-frame texture so crops hash
                    // to distinct pseudo-plate strings.
                    let v = 210 + ((x.wrapping_mul(y) as u64 + index) % 40) as u8;
                    image.put_pixel(x, y, Rgb([v, v, v]));
                }
            }
        }
        image
    }
}

impl VideoSource for SyntheticSource {
    fn read(&mut self) -> Result<Option<Frame>> {
        if let Some(limit) = self.config.frame_limit {
            if self.frames_read >= limit {
                return Ok(None);
            }
        }
        let image = self.generate(self.frames_read);
        self.frames_read += 1;
        Ok(Some(Frame::new(image)))
    }

    fn frame_rate(&self) -> Option<f64> {
        (self.config.fps > 0.0).then_some(self.config.fps)
    }

    fn release(&mut self) {
        log::info!(
            "synthetic source '{}' released after {} frames",
            self.config.name,
            self.frames_read
        );
    }
}
