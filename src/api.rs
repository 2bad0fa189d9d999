use std::time::Duration;

use reqwest::Client;
use serde_json::Value;
use tracing::{debug, info};

use crate::error::FetchError;
use crate::weather::{Coordinates, WeatherReply};

/// HTTP glue to the Pulse backend.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: &str, timeout: Duration) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent("PulseFeed/1.0 (Headline Client)")
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `GET {base}/trending`, returned as untyped JSON so the view-model
    /// decides what an acceptable payload is.
    pub async fn fetch_trending(&self) -> Result<Value, FetchError> {
        let url = format!("{}/trending", self.base_url);
        info!("Fetching headlines: {}", url);

        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status));
        }

        let bytes = response.bytes().await?;
        let value = serde_json::from_slice(&bytes)?;
        Ok(value)
    }

    /// `GET {base}/weather?lat=..&lon=..` with a timeout of its own.
    pub async fn fetch_weather(
        &self,
        coords: Coordinates,
        timeout: Duration,
    ) -> Result<WeatherReply, FetchError> {
        let url = format!("{}/weather", self.base_url);
        debug!(lat = coords.lat, lon = coords.lon, "Fetching weather");

        let response = self
            .client
            .get(&url)
            .query(&[("lat", coords.lat), ("lon", coords.lon)])
            .timeout(timeout)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status));
        }

        let bytes = response.bytes().await?;
        let reply = serde_json::from_slice(&bytes)?;
        Ok(reply)
    }
}
