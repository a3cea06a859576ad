//! platewatchd - real-time detection pipeline daemon.
//!
//! This daemon:
//! 1. Opens the configured video source (built-in: stub:// synthetic streams)
//! 2. Runs the three-stage detection pipeline on its frames
//! 3. Publishes per-frame results and errors to MQTT
//! 4. Stops the pipeline cooperatively on Ctrl-C

use std::path::PathBuf;
use std::sync::mpsc;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;

use platewatch::{
    MqttSink, PathSourceProvider, PipelineState, PlatewatchConfig, StubDetector, StubRecognizer,
    VideoPipeline,
};

#[derive(Parser, Debug)]
#[command(author, version, about = "Real-time plate detection pipeline daemon")]
struct Args {
    /// Path to the TOML config file.
    #[arg(long, env = "PLATEWATCH_CONFIG")]
    config: Option<PathBuf>,

    /// Video source path, overriding the config file.
    #[arg(long)]
    source: Option<String>,

    /// MQTT broker address, overriding the config file.
    #[arg(long)]
    mqtt_broker_addr: Option<String>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let mut cfg = PlatewatchConfig::load_from(args.config.as_deref())?;
    if let Some(source) = args.source {
        cfg.source.path = source;
    }
    if let Some(addr) = args.mqtt_broker_addr {
        cfg.mqtt.broker_addr = addr;
    }

    log::info!(
        "platewatchd {} starting (source {}, broker {})",
        env!("CARGO_PKG_VERSION"),
        cfg.source.path,
        cfg.mqtt.broker_addr
    );

    let sink = Arc::new(MqttSink::connect(&cfg.mqtt)?);
    let provider = Box::new(PathSourceProvider::new(cfg.source.path.clone()));
    let mut pipeline = VideoPipeline::new(
        cfg.pipeline.clone(),
        cfg.recognition.clone(),
        cfg.source.fallback_fps,
        provider,
        StubDetector::new(),
        StubRecognizer::new(),
        sink.clone(),
    );
    pipeline.start()?;

    let (tx, rx) = mpsc::channel();
    ctrlc::set_handler(move || {
        let _ = tx.send(());
    })
    .expect("error setting Ctrl-C handler");

    log::info!("platewatchd running, Ctrl-C to stop");
    loop {
        match rx.recv_timeout(Duration::from_secs(5)) {
            Ok(()) | Err(mpsc::RecvTimeoutError::Disconnected) => break,
            Err(mpsc::RecvTimeoutError::Timeout) => {
                if pipeline.state() == PipelineState::Idle {
                    log::info!("pipeline drained, shutting down");
                    break;
                }
                if let Some((frames, results)) = pipeline.queue_depths() {
                    log::debug!("queue depths: frames={} results={}", frames, results);
                }
            }
        }
    }

    pipeline.stop();
    drop(pipeline);
    if let Ok(sink) = Arc::try_unwrap(sink) {
        sink.disconnect();
    }
    Ok(())
}
