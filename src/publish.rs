//! Outward event publishing.
//!
//! The pipeline pushes results through an `EventSink`, a fire-and-forget
//! publish boundary. Two event names are used: `video_frame` for per-frame
//! results and `video_error` for user-visible failures.

use std::thread::JoinHandle;
use std::time::Duration;

use anyhow::{anyhow, Result};
use rumqttc::{Client, Connection, Event, MqttOptions, QoS};
use serde_json::Value;

/// Per-frame result event: `{ frame, detections, fps }`.
pub const EVENT_VIDEO_FRAME: &str = "video_frame";
/// Error event: `{ error }`.
pub const EVENT_VIDEO_ERROR: &str = "video_error";

/// Fire-and-forget publish boundary. No acknowledgment is required; a sink
/// that drops a payload must not disturb the pipeline.
pub trait EventSink: Send + Sync {
    fn publish(&self, event: &str, payload: Value);
}

/// MQTT sink settings.
#[derive(Clone, Debug)]
pub struct MqttSettings {
    /// `host:port` of the broker.
    pub broker_addr: String,
    pub client_id: String,
    /// Events are published to `<topic_prefix>/<event>`.
    pub topic_prefix: String,
}

impl Default for MqttSettings {
    fn default() -> Self {
        Self {
            broker_addr: "127.0.0.1:1883".to_string(),
            client_id: "platewatchd".to_string(),
            topic_prefix: "platewatch".to_string(),
        }
    }
}

/// MQTT publish sink. A background thread drives the connection event loop;
/// publishes are QoS 0 and never block the emitter on broker availability.
pub struct MqttSink {
    client: Client,
    topic_prefix: String,
    connection_handle: Option<JoinHandle<()>>,
}

impl MqttSink {
    pub fn connect(settings: &MqttSettings) -> Result<Self> {
        let (host, port) = parse_broker_addr(&settings.broker_addr)?;
        let mut options = MqttOptions::new(&settings.client_id, host, port);
        options.set_keep_alive(Duration::from_secs(30));

        let (client, connection) = Client::new(options, 16);
        let handle = spawn_connection_loop(connection);

        Ok(Self {
            client,
            topic_prefix: settings.topic_prefix.clone(),
            connection_handle: Some(handle),
        })
    }

    pub fn disconnect(mut self) {
        if let Err(e) = self.client.disconnect() {
            log::warn!("MQTT disconnect failed: {}", e);
        }
        if let Some(handle) = self.connection_handle.take() {
            let _ = handle.join();
        }
    }
}

impl EventSink for MqttSink {
    fn publish(&self, event: &str, payload: Value) {
        let topic = format!("{}/{}", self.topic_prefix, event);
        let bytes = match serde_json::to_vec(&payload) {
            Ok(bytes) => bytes,
            Err(e) => {
                log::warn!("dropping unserializable {} payload: {}", event, e);
                return;
            }
        };
        if let Err(e) = self.client.try_publish(&topic, QoS::AtMostOnce, false, bytes) {
            log::warn!("MQTT publish to {} failed: {}", topic, e);
        }
    }
}

fn spawn_connection_loop(mut connection: Connection) -> JoinHandle<()> {
    std::thread::spawn(move || {
        for event in connection.iter() {
            match event {
                Ok(Event::Incoming(_)) | Ok(Event::Outgoing(_)) => {}
                Err(e) => {
                    log::warn!("MQTT connection error: {}", e);
                    std::thread::sleep(Duration::from_secs(1));
                }
            }
        }
    })
}

fn parse_broker_addr(addr: &str) -> Result<(String, u16)> {
    let (host, port) = addr
        .rsplit_once(':')
        .ok_or_else(|| anyhow!("MQTT broker address must be host:port, got '{}'", addr))?;
    if host.is_empty() {
        return Err(anyhow!("MQTT broker host must not be empty"));
    }
    let port: u16 = port
        .parse()
        .map_err(|_| anyhow!("invalid MQTT broker port in '{}'", addr))?;
    Ok((host.to_string(), port))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn broker_addr_parses() {
        assert_eq!(
            parse_broker_addr("127.0.0.1:1883").unwrap(),
            ("127.0.0.1".to_string(), 1883)
        );
    }

    #[test]
    fn broker_addr_without_port_is_rejected() {
        assert!(parse_broker_addr("localhost").is_err());
        assert!(parse_broker_addr(":1883").is_err());
        assert!(parse_broker_addr("localhost:http").is_err());
    }
}
