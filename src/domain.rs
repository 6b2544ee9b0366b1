use serde::{Deserialize, Serialize};

/// one sample of the local environmental sensor
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SensorReading {
    /// temperature in celsius
    pub temperature: f32,
    /// relative humidity (0-100%)
    pub humidity: f32,
    /// barometric pressure in pascal
    pub pressure: f32,
    /// sample time in seconds (see clock.rs for the time base)
    pub timestamp: u64,
}

impl SensorReading {
    /// pressure in hPa, the unit shown on the display and published
    pub fn pressure_hpa(&self) -> f32 {
        self.pressure / 100.0
    }
}

/// the part of a remote forecast this node cares about
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ForecastSummary {
    pub description: String,
    /// NaN when the payload carried no current temperature
    pub current_temp: f64,
    pub daily_high: Option<f64>,
    pub daily_low: Option<f64>,
}

/// response body exactly as received from the forecast service
/// (or as read back from the cache)
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawPayload(String);

impl RawPayload {
    pub fn new(body: impl Into<String>) -> Self {
        Self(body.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<String> for RawPayload {
    fn from(body: String) -> Self {
        Self(body)
    }
}
