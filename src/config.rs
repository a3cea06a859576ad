//! Daemon configuration.
//!
//! Loaded from a TOML file named by `PLATEWATCH_CONFIG`, then overridden by
//! `PLATEWATCH_*` environment variables, then validated. Every pipeline
//! tunable lives here so tests and deployments can shrink buffers, speed up
//! polling, or disable the text-length filter without code changes.

use std::path::Path;
use std::time::Duration;

use anyhow::{anyhow, Result};
use serde::Deserialize;

use crate::publish::MqttSettings;

const DEFAULT_SOURCE_PATH: &str = "stub://entrance";
const DEFAULT_FALLBACK_FPS: f64 = 30.0;
const DEFAULT_BUFFER_CAPACITY: usize = 10;
const DEFAULT_PROCESS_WIDTH: u32 = 640;
const DEFAULT_PROCESS_HEIGHT: u32 = 480;
const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.5;
const DEFAULT_IOU_THRESHOLD: f32 = 0.5;
const DEFAULT_JPEG_QUALITY: u8 = 60;
const DEFAULT_POLL_INTERVAL_MS: u64 = 10;
const DEFAULT_LOG_INTERVAL: u64 = 30;
const DEFAULT_RESET_THRESHOLD: u64 = 100;
const DEFAULT_CROP_PADDING: u32 = 10;

#[derive(Debug, Deserialize, Default)]
struct ConfigFile {
    source: Option<SourceFile>,
    pipeline: Option<PipelineFile>,
    recognition: Option<RecognitionFile>,
    mqtt: Option<MqttFile>,
}

#[derive(Debug, Deserialize, Default)]
struct SourceFile {
    path: Option<String>,
    fallback_fps: Option<f64>,
}

#[derive(Debug, Deserialize, Default)]
struct PipelineFile {
    buffer_capacity: Option<usize>,
    process_width: Option<u32>,
    process_height: Option<u32>,
    confidence_threshold: Option<f32>,
    iou_threshold: Option<f32>,
    jpeg_quality: Option<u8>,
    poll_interval_ms: Option<u64>,
    throughput_log_interval: Option<u64>,
    throughput_reset_threshold: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
struct RecognitionFile {
    crop_padding: Option<u32>,
    min_text_len: Option<usize>,
}

#[derive(Debug, Deserialize, Default)]
struct MqttFile {
    broker_addr: Option<String>,
    client_id: Option<String>,
    topic_prefix: Option<String>,
}

#[derive(Debug, Clone)]
pub struct SourceSettings {
    /// Video source path; `stub://` opens the synthetic source.
    pub path: String,
    /// Pacing used when the source reports no usable frame rate.
    pub fallback_fps: f64,
}

#[derive(Debug, Clone)]
pub struct PipelineSettings {
    /// Capacity of both the frame queue and the result queue.
    pub buffer_capacity: usize,
    pub process_width: u32,
    pub process_height: u32,
    pub confidence_threshold: f32,
    pub iou_threshold: f32,
    pub jpeg_quality: u8,
    /// Backoff between polls on an empty/full queue.
    pub poll_interval: Duration,
    /// Throughput is logged every this many emitted frames.
    pub throughput_log_interval: u64,
    /// The rolling throughput window resets once the counter passes this.
    pub throughput_reset_threshold: u64,
}

#[derive(Debug, Clone)]
pub struct RecognitionSettings {
    /// Padding in pixels added around a detection box before cropping.
    pub crop_padding: u32,
    /// Recognized text shorter than this reads as empty; 0 disables the filter.
    pub min_text_len: usize,
}

#[derive(Debug, Clone)]
pub struct PlatewatchConfig {
    pub source: SourceSettings,
    pub pipeline: PipelineSettings,
    pub recognition: RecognitionSettings,
    pub mqtt: MqttSettings,
}

impl Default for PlatewatchConfig {
    fn default() -> Self {
        Self::from_file(ConfigFile::default())
    }
}

impl PlatewatchConfig {
    /// Load from `PLATEWATCH_CONFIG` (when set), apply env overrides, validate.
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("PLATEWATCH_CONFIG").ok();
        Self::load_from(config_path.as_deref().map(Path::new))
    }

    pub fn load_from(path: Option<&Path>) -> Result<Self> {
        let file_cfg = match path {
            Some(path) => read_config_file(path)?,
            None => ConfigFile::default(),
        };
        let mut cfg = Self::from_file(file_cfg);
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: ConfigFile) -> Self {
        let source = file.source.unwrap_or_default();
        let pipeline = file.pipeline.unwrap_or_default();
        let recognition = file.recognition.unwrap_or_default();
        let mqtt = file.mqtt.unwrap_or_default();
        let mqtt_defaults = MqttSettings::default();

        Self {
            source: SourceSettings {
                path: source
                    .path
                    .unwrap_or_else(|| DEFAULT_SOURCE_PATH.to_string()),
                fallback_fps: source.fallback_fps.unwrap_or(DEFAULT_FALLBACK_FPS),
            },
            pipeline: PipelineSettings {
                buffer_capacity: pipeline.buffer_capacity.unwrap_or(DEFAULT_BUFFER_CAPACITY),
                process_width: pipeline.process_width.unwrap_or(DEFAULT_PROCESS_WIDTH),
                process_height: pipeline.process_height.unwrap_or(DEFAULT_PROCESS_HEIGHT),
                confidence_threshold: pipeline
                    .confidence_threshold
                    .unwrap_or(DEFAULT_CONFIDENCE_THRESHOLD),
                iou_threshold: pipeline.iou_threshold.unwrap_or(DEFAULT_IOU_THRESHOLD),
                jpeg_quality: pipeline.jpeg_quality.unwrap_or(DEFAULT_JPEG_QUALITY),
                poll_interval: Duration::from_millis(
                    pipeline.poll_interval_ms.unwrap_or(DEFAULT_POLL_INTERVAL_MS),
                ),
                throughput_log_interval: pipeline
                    .throughput_log_interval
                    .unwrap_or(DEFAULT_LOG_INTERVAL),
                throughput_reset_threshold: pipeline
                    .throughput_reset_threshold
                    .unwrap_or(DEFAULT_RESET_THRESHOLD),
            },
            recognition: RecognitionSettings {
                crop_padding: recognition.crop_padding.unwrap_or(DEFAULT_CROP_PADDING),
                min_text_len: recognition.min_text_len.unwrap_or(0),
            },
            mqtt: MqttSettings {
                broker_addr: mqtt.broker_addr.unwrap_or(mqtt_defaults.broker_addr),
                client_id: mqtt.client_id.unwrap_or(mqtt_defaults.client_id),
                topic_prefix: mqtt.topic_prefix.unwrap_or(mqtt_defaults.topic_prefix),
            },
        }
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(path) = std::env::var("PLATEWATCH_SOURCE") {
            if !path.trim().is_empty() {
                self.source.path = path;
            }
        }
        if let Ok(addr) = std::env::var("PLATEWATCH_MQTT_ADDR") {
            if !addr.trim().is_empty() {
                self.mqtt.broker_addr = addr;
            }
        }
        if let Ok(prefix) = std::env::var("PLATEWATCH_TOPIC_PREFIX") {
            if !prefix.trim().is_empty() {
                self.mqtt.topic_prefix = prefix;
            }
        }
        if let Ok(len) = std::env::var("PLATEWATCH_MIN_TEXT_LEN") {
            self.recognition.min_text_len = len
                .parse()
                .map_err(|_| anyhow!("PLATEWATCH_MIN_TEXT_LEN must be an integer"))?;
        }
        if let Ok(capacity) = std::env::var("PLATEWATCH_BUFFER_CAPACITY") {
            self.pipeline.buffer_capacity = capacity
                .parse()
                .map_err(|_| anyhow!("PLATEWATCH_BUFFER_CAPACITY must be an integer"))?;
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.source.path.trim().is_empty() {
            return Err(anyhow!("source path must not be empty"));
        }
        if !(self.source.fallback_fps > 0.0) {
            return Err(anyhow!("fallback fps must be positive"));
        }
        if self.pipeline.buffer_capacity == 0 {
            return Err(anyhow!("buffer capacity must be greater than zero"));
        }
        if self.pipeline.process_width == 0 || self.pipeline.process_height == 0 {
            return Err(anyhow!("processing resolution must be non-zero"));
        }
        for (name, value) in [
            ("confidence_threshold", self.pipeline.confidence_threshold),
            ("iou_threshold", self.pipeline.iou_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(anyhow!("{} must be within [0, 1]", name));
            }
        }
        if !(1..=100).contains(&self.pipeline.jpeg_quality) {
            return Err(anyhow!("jpeg quality must be within 1..=100"));
        }
        if self.pipeline.poll_interval.is_zero() {
            return Err(anyhow!("poll interval must be greater than zero"));
        }
        if self.pipeline.throughput_log_interval == 0 {
            return Err(anyhow!("throughput log interval must be greater than zero"));
        }
        Ok(())
    }
}

fn read_config_file(path: &Path) -> Result<ConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let cfg = toml::from_str(&raw)
        .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_match_canonical_pipeline() {
        let cfg = PlatewatchConfig::default();
        assert_eq!(cfg.pipeline.buffer_capacity, 10);
        assert_eq!(cfg.pipeline.process_width, 640);
        assert_eq!(cfg.pipeline.process_height, 480);
        assert_eq!(cfg.pipeline.confidence_threshold, 0.5);
        assert_eq!(cfg.pipeline.jpeg_quality, 60);
        assert_eq!(cfg.recognition.crop_padding, 10);
        assert_eq!(cfg.recognition.min_text_len, 0);
        assert_eq!(cfg.pipeline.poll_interval, Duration::from_millis(10));
    }

    #[test]
    fn file_values_override_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
[source]
path = "stub://gate?frames=5"

[pipeline]
buffer_capacity = 4
jpeg_quality = 80

[recognition]
min_text_len = 6

[mqtt]
topic_prefix = "gate"
"#
        )
        .unwrap();

        let cfg = PlatewatchConfig::load_from(Some(file.path())).unwrap();
        assert_eq!(cfg.source.path, "stub://gate?frames=5");
        assert_eq!(cfg.pipeline.buffer_capacity, 4);
        assert_eq!(cfg.pipeline.jpeg_quality, 80);
        assert_eq!(cfg.recognition.min_text_len, 6);
        assert_eq!(cfg.mqtt.topic_prefix, "gate");
        // Untouched sections keep defaults.
        assert_eq!(cfg.pipeline.process_width, 640);
    }

    #[test]
    fn invalid_threshold_is_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "[pipeline]\nconfidence_threshold = 1.5\n").unwrap();
        assert!(PlatewatchConfig::load_from(Some(file.path())).is_err());
    }

    #[test]
    fn zero_capacity_is_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "[pipeline]\nbuffer_capacity = 0\n").unwrap();
        assert!(PlatewatchConfig::load_from(Some(file.path())).is_err());
    }

    #[test]
    fn malformed_file_is_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not toml at all [[[").unwrap();
        assert!(PlatewatchConfig::load_from(Some(file.path())).is_err());
    }
}
