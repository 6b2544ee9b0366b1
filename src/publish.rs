//! ==============================================================================
//! publish.rs - mqtt publisher
//! ==============================================================================
//!
//! purpose:
//!     sends compact json records to the broker:
//!         metrics  -> {"local_temp","local_humidity","local_pressure","timestamp"}
//!         forecast -> {"remote_temp","remote_desc","timestamp"}
//!
//!     publishing is best-effort, at-most-once: `publish` reports whether
//!     the message was accepted and never retries. reconnecting is the
//!     scheduler's maintenance step, not ours.
//!
//! relationships:
//!     - used by: scheduler.rs (maintenance, sensor and fetch steps)
//!     - uses: rumqttc (async client + event loop, driven cooperatively)
//!
//! ==============================================================================

use std::time::Duration;

use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Packet, QoS};
use serde::Serialize;

use crate::config::MqttConfig;
use crate::domain::{ForecastSummary, SensorReading};

/// how long `service` waits for inbound traffic before yielding
const SERVICE_POLL: Duration = Duration::from_millis(10);
/// cap on events handled per `service` so a chatty broker can't starve the loop
const MAX_EVENTS_PER_SERVICE: usize = 32;

#[allow(async_fn_in_trait)]
pub trait Publisher {
    fn is_connected(&self) -> bool;
    /// one bounded connection attempt
    async fn reconnect(&mut self);
    /// process pending inbound/outbound traffic without blocking
    async fn service(&mut self);
    /// true if the sink accepted the message
    fn publish(&mut self, topic: &str, payload: &str) -> bool;
}

#[derive(Debug, Serialize)]
struct MetricsMessage {
    local_temp: f32,
    local_humidity: f32,
    /// hPa
    local_pressure: f32,
    timestamp: u64,
}

#[derive(Debug, Serialize)]
struct ForecastMessage<'a> {
    remote_temp: f64,
    remote_desc: &'a str,
    timestamp: u64,
}

pub fn metrics_message(reading: &SensorReading) -> String {
    to_json(&MetricsMessage {
        local_temp: reading.temperature,
        local_humidity: reading.humidity,
        local_pressure: reading.pressure_hpa(),
        timestamp: reading.timestamp,
    })
}

pub fn forecast_message(summary: &ForecastSummary, now: u64) -> String {
    to_json(&ForecastMessage {
        remote_temp: summary.current_temp,
        remote_desc: &summary.description,
        timestamp: now,
    })
}

// flat records of numbers and strings always serialize
fn to_json<T: Serialize>(record: &T) -> String {
    serde_json::to_string(record).unwrap_or_default()
}

/// publish and log the outcome; the caller only learns whether it went out
pub fn publish_logged(publisher: &mut impl Publisher, topic: &str, payload: &str) -> bool {
    if !publisher.is_connected() {
        tracing::warn!("MQTT not connected, cannot publish to {}", topic);
        return false;
    }
    let ok = publisher.publish(topic, payload);
    if ok {
        tracing::debug!("MQTT publish to {} -> OK", topic);
    } else {
        tracing::warn!("MQTT publish to {} -> Failed", topic);
    }
    ok
}

pub struct MqttPublisher {
    client: AsyncClient,
    eventloop: EventLoop,
    connected: bool,
    connect_timeout: Duration,
    broker: String,
}

impl MqttPublisher {
    pub fn new(config: &MqttConfig) -> Self {
        let mut options = MqttOptions::new(&config.client_id, &config.host, config.port);
        options.set_keep_alive(Duration::from_secs(config.keep_alive_seconds.max(5)));
        if !config.username.is_empty() {
            options.set_credentials(&config.username, &config.password);
        }
        let (client, eventloop) = AsyncClient::new(options, 16);

        Self {
            client,
            eventloop,
            connected: false,
            connect_timeout: Duration::from_secs(config.connect_timeout_seconds),
            broker: format!("{}:{}", config.host, config.port),
        }
    }

    fn on_event(&mut self, event: Event) {
        match event {
            Event::Incoming(Packet::ConnAck(_)) => {
                self.connected = true;
            }
            Event::Incoming(Packet::Disconnect) => {
                tracing::warn!("MQTT broker closed the session");
                self.connected = false;
            }
            Event::Incoming(Packet::Publish(msg)) => {
                tracing::debug!("MQTT inbound on {} ({} bytes)", msg.topic, msg.payload.len());
            }
            _ => {}
        }
    }
}

impl Publisher for MqttPublisher {
    fn is_connected(&self) -> bool {
        self.connected
    }

    async fn reconnect(&mut self) {
        if self.connected {
            return;
        }
        tracing::info!("Connecting to MQTT at {}...", self.broker);

        let eventloop = &mut self.eventloop;
        let attempt = tokio::time::timeout(self.connect_timeout, async {
            loop {
                if let Event::Incoming(Packet::ConnAck(_)) = eventloop.poll().await? {
                    return Ok::<_, rumqttc::ConnectionError>(());
                }
            }
        })
        .await;

        match attempt {
            Ok(Ok(())) => {
                self.connected = true;
                tracing::info!("MQTT connected");
            }
            Ok(Err(e)) => tracing::warn!("MQTT connect failed: {}", e),
            Err(_) => tracing::warn!("MQTT connect timed out after {:?}", self.connect_timeout),
        }
    }

    async fn service(&mut self) {
        for _ in 0..MAX_EVENTS_PER_SERVICE {
            match tokio::time::timeout(SERVICE_POLL, self.eventloop.poll()).await {
                Err(_) => break,
                Ok(Ok(event)) => self.on_event(event),
                Ok(Err(e)) => {
                    tracing::warn!("MQTT connection lost: {}", e);
                    self.connected = false;
                    break;
                }
            }
        }
    }

    fn publish(&mut self, topic: &str, payload: &str) -> bool {
        if !self.connected {
            return false;
        }
        match self.client.try_publish(topic, QoS::AtMostOnce, false, payload.as_bytes().to_vec()) {
            Ok(()) => true,
            Err(e) => {
                tracing::debug!("MQTT send queue rejected message: {}", e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingPublisher;

    #[test]
    fn test_metrics_message() {
        let reading = SensorReading {
            temperature: 21.5,
            humidity: 40.0,
            pressure: 101_325.0,
            timestamp: 1_700_000_000,
        };
        let msg: serde_json::Value = serde_json::from_str(&metrics_message(&reading)).unwrap();
        assert_eq!(
            msg,
            serde_json::json!({
                "local_temp": 21.5,
                "local_humidity": 40.0,
                "local_pressure": 1013.25,
                "timestamp": 1_700_000_000u64,
            })
        );
    }

    #[test]
    fn test_forecast_message() {
        let summary = ForecastSummary {
            description: "clear".into(),
            current_temp: 21.5,
            daily_high: Some(25.0),
            daily_low: None,
        };
        let msg: serde_json::Value = serde_json::from_str(&forecast_message(&summary, 42)).unwrap();
        assert_eq!(msg, serde_json::json!({"remote_temp": 21.5, "remote_desc": "clear", "timestamp": 42}));
    }

    #[test]
    fn test_nan_fields_still_serialize() {
        let reading = SensorReading { temperature: f32::NAN, humidity: f32::NAN, pressure: f32::NAN, timestamp: 1 };
        let msg: serde_json::Value = serde_json::from_str(&metrics_message(&reading)).unwrap();
        assert!(msg["local_temp"].is_null());
        assert_eq!(msg["timestamp"], 1);
    }

    #[test]
    fn test_publish_logged_skips_disconnected_sink() {
        let mut publisher = RecordingPublisher::disconnected();
        assert!(!publish_logged(&mut publisher, "t", "{}"));
        assert!(publisher.sent().is_empty());

        publisher.set_connected(true);
        assert!(publish_logged(&mut publisher, "t", "{}"));
        assert_eq!(publisher.sent(), vec![("t".to_string(), "{}".to_string())]);
    }

    #[tokio::test]
    async fn test_mqtt_publisher_unreachable_broker() {
        let config = MqttConfig {
            host: "127.0.0.1".into(),
            port: 1,
            connect_timeout_seconds: 2,
            ..MqttConfig::default()
        };
        let mut publisher = MqttPublisher::new(&config);
        assert!(!publisher.is_connected());
        assert!(!publisher.publish("home/weather_node/metrics", "{}"));

        publisher.reconnect().await;
        assert!(!publisher.is_connected());
    }
}
