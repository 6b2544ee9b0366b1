//! ==============================================================================
//! sensor.rs - local environmental sensor (bme280)
//! ==============================================================================
//!
//! purpose:
//!     provides temperature / humidity / pressure samples to the scheduler.
//!     abstracts away the difference between running on the real node
//!     (bme280 bound to the linux iio driver) and a development machine
//!     (mock values).
//!
//! why iio sysfs?:
//!     the kernel bmp280 driver does the i2c traffic and the bosch
//!     compensation math; userspace only reads scaled integers from files.
//!
//! relationships:
//!     - used by: scheduler.rs (sample on every sensor step and fetch render)
//!
//! ==============================================================================

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};

use crate::domain::SensorReading;

pub trait Sensor {
    /// (temperature °C, relative humidity %, pressure Pa)
    fn read(&mut self) -> Result<(f32, f32, f32)>;
}

/// take one sample; a failed read gives NaN fields so the rest of the tick
/// (publish, render) still runs
pub fn sample(sensor: &mut dyn Sensor, now: u64) -> SensorReading {
    let (temperature, humidity, pressure) = sensor.read().unwrap_or_else(|e| {
        tracing::warn!("sensor read failed: {:#}", e);
        (f32::NAN, f32::NAN, f32::NAN)
    });
    SensorReading { temperature, humidity, pressure, timestamp: now }
}

// ==============================================================================================
// IIO IMPLEMENTATION (real node)
// ==============================================================================================

pub struct IioSensor {
    device: PathBuf,
}

impl IioSensor {
    pub fn new(device: impl Into<PathBuf>) -> Self {
        let device = device.into();
        tracing::info!("Using IIO sensor at {}", device.display());
        Self { device }
    }

    fn read_channel(&self, name: &str) -> Result<f64> {
        read_scaled(&self.device.join(name))
    }
}

impl Sensor for IioSensor {
    fn read(&mut self) -> Result<(f32, f32, f32)> {
        // millidegrees, milli-percent and kilopascal
        let temp = self.read_channel("in_temp_input")? / 1000.0;
        let humidity = self.read_channel("in_humidityrelative_input")? / 1000.0;
        let pressure = self.read_channel("in_pressure_input")? * 1000.0;
        Ok((temp as f32, humidity as f32, pressure as f32))
    }
}

fn read_scaled(path: &Path) -> Result<f64> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    raw.trim()
        .parse::<f64>()
        .map_err(|e| anyhow!("bad value in {}: {} (got: {:?})", path.display(), e, raw.trim()))
}

// ==============================================================================================
// MOCK IMPLEMENTATION (development host)
// ==============================================================================================

pub struct MockSensor {
    reading: (f32, f32, f32),
}

impl MockSensor {
    pub fn new() -> Self {
        tracing::info!("Using MOCK sensor (no hardware access)");
        Self { reading: (22.5, 45.0, 101_325.0) }
    }

    #[cfg(test)]
    pub fn fixed(temperature: f32, humidity: f32, pressure: f32) -> Self {
        Self { reading: (temperature, humidity, pressure) }
    }
}

impl Default for MockSensor {
    fn default() -> Self {
        Self::new()
    }
}

impl Sensor for MockSensor {
    fn read(&mut self) -> Result<(f32, f32, f32)> {
        Ok(self.reading)
    }
}
