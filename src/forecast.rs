//! ==============================================================================
//! forecast.rs - remote payload decoding
//! ==============================================================================
//!
//! purpose:
//!     turns a One Call response body into a `ForecastSummary`.
//!     only four values are read; everything else in the payload is ignored.
//!
//!     field path                          missing ->
//!     current.weather[0].description      "unknown"
//!     current.temp                        NaN
//!     daily[0].temp.max / .min            None (and None if no daily section)
//!
//!     a field of the wrong type reads as missing. only invalid JSON or a
//!     document that is not an object is malformed.
//!
//! ==============================================================================

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use thiserror::Error;

use crate::domain::{ForecastSummary, RawPayload};

pub const UNKNOWN_DESCRIPTION: &str = "unknown";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("malformed forecast payload: {0}")]
    Malformed(String),
}

/// decodes a field as `T`, or `None` when it has any other shape
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(T::deserialize(value).ok())
}

#[derive(Debug, Deserialize)]
struct OneCall {
    #[serde(default, deserialize_with = "lenient")]
    current: Option<Current>,
    #[serde(default, deserialize_with = "lenient")]
    daily: Option<Vec<Daily>>,
}

#[derive(Debug, Deserialize)]
struct Current {
    #[serde(default, deserialize_with = "lenient")]
    temp: Option<f64>,
    #[serde(default, deserialize_with = "lenient")]
    weather: Option<Vec<Condition>>,
}

#[derive(Debug, Deserialize)]
struct Condition {
    #[serde(default, deserialize_with = "lenient")]
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Daily {
    #[serde(default, deserialize_with = "lenient")]
    temp: Option<DailyTemp>,
}

#[derive(Debug, Deserialize)]
struct DailyTemp {
    #[serde(default, deserialize_with = "lenient")]
    max: Option<f64>,
    #[serde(default, deserialize_with = "lenient")]
    min: Option<f64>,
}

pub fn parse(payload: &RawPayload) -> Result<ForecastSummary, ParseError> {
    let value: serde_json::Value = serde_json::from_str(payload.as_str())
        .map_err(|e| ParseError::Malformed(e.to_string()))?;
    if !value.is_object() {
        return Err(ParseError::Malformed("document is not a JSON object".to_string()));
    }
    let doc = OneCall::deserialize(value).map_err(|e| ParseError::Malformed(e.to_string()))?;
    Ok(summarize(doc))
}

/// all missing-field defaults live here
fn summarize(doc: OneCall) -> ForecastSummary {
    let (description, current_temp) = match doc.current {
        Some(current) => (
            current
                .weather
                .and_then(|w| w.into_iter().next())
                .and_then(|c| c.description),
            current.temp,
        ),
        None => (None, None),
    };

    let today = doc
        .daily
        .and_then(|days| days.into_iter().next())
        .and_then(|day| day.temp);

    ForecastSummary {
        description: description.unwrap_or_else(|| UNKNOWN_DESCRIPTION.to_string()),
        current_temp: current_temp.unwrap_or(f64::NAN),
        daily_high: today.as_ref().and_then(|t| t.max),
        daily_low: today.as_ref().and_then(|t| t.min),
    }
}
