//! Local weather snapshot shown in the feed header.
//!
//! Every failure here (no geolocation, denied permission, backend error,
//! error reply) only hides the weather line; nothing is surfaced to the user.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{info, warn};

use crate::api::ApiClient;

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LocationError {
    #[error("geolocation is not supported on this device")]
    Unsupported,
    #[error("geolocation denied or failed: {0}")]
    Denied(String),
}

/// Source of the device position.
pub trait LocationProvider: Send + Sync {
    fn current_position(&self) -> Result<Coordinates, LocationError>;
}

/// A position fixed by configuration.
#[derive(Debug, Clone, Copy)]
pub struct FixedLocation(pub Coordinates);

impl LocationProvider for FixedLocation {
    fn current_position(&self) -> Result<Coordinates, LocationError> {
        Ok(self.0)
    }
}

/// A device without geolocation support.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoLocation;

impl LocationProvider for NoLocation {
    fn current_position(&self) -> Result<Coordinates, LocationError> {
        Err(LocationError::Unsupported)
    }
}

/// Pick the provider for an optional configured position.
pub fn location_provider(location: Option<Coordinates>) -> Box<dyn LocationProvider> {
    match location {
        Some(coords) => Box::new(FixedLocation(coords)),
        None => Box::new(NoLocation),
    }
}

/// Body of a `/weather` reply. A truthy `error` wins over any report fields.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "RawWeatherReply")]
pub enum WeatherReply {
    Error {
        error: Value,
    },
    Report {
        location: String,
        temperature: String,
        condition: String,
    },
}

#[derive(Debug, Deserialize)]
struct RawWeatherReply {
    #[serde(default)]
    error: Option<Value>,
    location: Option<String>,
    temperature: Option<Value>,
    condition: Option<String>,
}

impl TryFrom<RawWeatherReply> for WeatherReply {
    type Error = String;

    fn try_from(raw: RawWeatherReply) -> Result<Self, String> {
        if let Some(error) = raw.error.filter(is_truthy) {
            return Ok(WeatherReply::Error { error });
        }

        match (raw.location, raw.temperature, raw.condition) {
            (Some(location), Some(temperature), Some(condition)) => Ok(WeatherReply::Report {
                location,
                temperature: temperature_text(temperature)?,
                condition,
            }),
            _ => Err("incomplete weather report".to_string()),
        }
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::String(s) => !s.is_empty(),
        Value::Number(n) => n.as_f64() != Some(0.0),
        Value::Array(_) | Value::Object(_) => true,
    }
}

// The backend passes the upstream `temp_C` through, which is sometimes text.
fn temperature_text(value: Value) -> Result<String, String> {
    match value {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(format!("expected temperature, got {}", other)),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeatherSnapshot {
    pub location: String,
    pub temperature: String,
    pub condition: String,
    /// Local wall-clock time when the snapshot was taken
    pub local_time: String,
}

impl WeatherSnapshot {
    pub fn from_reply(reply: WeatherReply, at: DateTime<Local>) -> Option<Self> {
        match reply {
            WeatherReply::Report {
                location,
                temperature,
                condition,
            } => Some(Self {
                location,
                temperature,
                condition,
                local_time: at.format("%H:%M:%S").to_string(),
            }),
            WeatherReply::Error { .. } => None,
        }
    }
}

impl fmt::Display for WeatherSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "📍 {} • {}°C, {} • {}",
            self.location, self.temperature, self.condition, self.local_time
        )
    }
}

/// Resolve the device position and fetch the weather for it.
pub async fn load_weather(
    client: &ApiClient,
    locator: &dyn LocationProvider,
    timeout: Duration,
) -> Option<WeatherSnapshot> {
    let coords = match locator.current_position() {
        Ok(coords) => coords,
        Err(LocationError::Unsupported) => {
            info!("No geolocation available, weather hidden");
            return None;
        }
        Err(e) => {
            warn!("Geolocation denied or failed: {}", e);
            return None;
        }
    };

    match client.fetch_weather(coords, timeout).await {
        Ok(reply) => {
            let snapshot = WeatherSnapshot::from_reply(reply, Local::now());
            if snapshot.is_none() {
                warn!("Weather backend returned an error reply");
            }
            snapshot
        }
        Err(e) => {
            warn!("Weather fetch failed: {}", e);
            None
        }
    }
}
