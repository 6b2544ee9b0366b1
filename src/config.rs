//! ==============================================================================
//! config.rs - Node Configuration Loader
//! ==============================================================================
//!
//! purpose:
//!     defines the schema for `node.toml`.
//!     loads configuration from file or falls back to defaults.
//!
//! structure:
//!     - NetworkConfig: which interface decides "link up".
//!     - ForecastConfig: endpoint, coordinates and access key.
//!     - MqttConfig: broker address, credentials and topics.
//!     - ScheduleConfig: sensor / fetch intervals and loop yield.
//!     - BackoffPolicy: base delay and caps (see backoff.rs).
//!     - CacheConfig / SensorConfig / DisplayConfig / LoggingConfig.
//!
//!     every section is optional in the file; missing keys take defaults.
//!
//! ==============================================================================

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::backoff::BackoffPolicy;

/// Root configuration structure
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct NodeConfig {
    pub network: NetworkConfig,
    pub forecast: ForecastConfig,
    pub mqtt: MqttConfig,
    pub schedule: ScheduleConfig,
    pub backoff: BackoffPolicy,
    pub cache: CacheConfig,
    pub sensor: SensorConfig,
    pub display: DisplayConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct NetworkConfig {
    /// e.g. "wlan0"; empty means don't check
    pub interface: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ForecastConfig {
    pub base_url: String,
    pub lat: f64,
    pub lon: f64,
    pub api_key: String,
    pub request_timeout_seconds: u64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct MqttConfig {
    pub host: String,
    pub port: u16,
    pub client_id: String,
    pub username: String,
    pub password: String,
    pub metrics_topic: String,
    pub forecast_topic: String,
    pub connect_timeout_seconds: u64,
    pub keep_alive_seconds: u64,
}

#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(default)]
pub struct ScheduleConfig {
    pub sensor_interval_seconds: u64,
    pub fetch_interval_seconds: u64,
    /// fixed yield between loop iterations
    pub tick_millis: u64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct CacheConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SensorKind {
    Iio,
    #[default]
    Mock,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SensorConfig {
    pub kind: SensorKind,
    pub iio_device: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DisplayConfig {
    pub console: bool,
    /// serve the last frame over http when set
    pub http_port: Option<u16>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub show_sensor_data: bool,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            base_url: "http://api.openweathermap.org/data/2.5/onecall".to_string(),
            lat: -6.2,
            lon: 106.816666,
            api_key: String::new(),
            request_timeout_seconds: 10,
        }
    }
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 1883,
            client_id: "weather_node".to_string(),
            username: String::new(),
            password: String::new(),
            metrics_topic: "home/weather_node/metrics".to_string(),
            forecast_topic: "home/weather_node/forecast".to_string(),
            connect_timeout_seconds: 5,
            keep_alive_seconds: 30,
        }
    }
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self { sensor_interval_seconds: 60, fetch_interval_seconds: 15 * 60, tick_millis: 200 }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { path: PathBuf::from("weather_cache.json") }
    }
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self { kind: SensorKind::Mock, iio_device: PathBuf::from("/sys/bus/iio/devices/iio:device0") }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self { console: true, http_port: None }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string(), show_sensor_data: true }
    }
}

impl NodeConfig {
    /// Load configuration from file
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| anyhow::anyhow!("Failed to read config file: {}", e))?;

        let config: NodeConfig = toml::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Failed to parse config: {}", e))?;

        Ok(config)
    }

    /// Load with default fallback; an explicit path is tried first
    pub fn load_or_default(explicit: Option<PathBuf>) -> Self {
        let paths = explicit.into_iter().chain([
            PathBuf::from("config").join("node.toml"),
            PathBuf::from("..").join("config").join("node.toml"),
        ]);

        for path in paths {
            if path.exists() {
                match Self::load(&path) {
                    Ok(config) => {
                        println!("[CONFIG] Loaded from {}", path.display());
                        return config;
                    }
                    Err(e) => {
                        println!("[CONFIG] Warning: Failed to load {}: {}", path.display(), e);
                    }
                }
            }
        }

        println!("[CONFIG] Warning: No config file found - using defaults");
        Self::default()
    }

    /// Print configuration summary (secrets omitted)
    pub fn print_summary(&self) {
        println!("┌─────────────────────────────────────────┐");
        println!("│           NODE CONFIGURATION            │");
        println!("├─────────────────────────────────────────┤");
        println!("│ Location: {:.4}, {:.4}", self.forecast.lat, self.forecast.lon);
        println!("│ API key: {}", if self.forecast.api_key.is_empty() { "(missing)" } else { "set" });
        println!("│ MQTT: {}:{} as {}", self.mqtt.host, self.mqtt.port, self.mqtt.client_id);
        println!(
            "│ Sensor every {}s, fetch every {}s",
            self.schedule.sensor_interval_seconds, self.schedule.fetch_interval_seconds
        );
        println!("│ Backoff: {}s base, cap {}", self.backoff.base_seconds, self.backoff.failure_cap);
        println!("│ Cache: {}", self.cache.path.display());
        println!("│ Sensor: {:?}", self.sensor.kind);
        println!("│ Log Level: {}", self.logging.level);
        println!("└─────────────────────────────────────────┘");
    }
}
