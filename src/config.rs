use serde::Deserialize;
use std::path::Path;

use crate::notifications::PermissionState;
use crate::weather::Coordinates;

pub const DEFAULT_API_URL: &str = "https://pulse-backend.onrender.com";
pub const DEFAULT_APP_ID: &str = "ccebf6b2-767a-4fe8-ad2a-a2a2a2f66adc";

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Base URL of the headline/weather backend
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// Address the local web front end listens on
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_weather_timeout")]
    pub weather_timeout_secs: u64,
    /// Stands in for the device position; no section means no geolocation
    pub location: Option<Coordinates>,
    #[serde(default)]
    pub notifications: NotificationConfig,
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_bind() -> String {
    "127.0.0.1:3000".to_string()
}

fn default_request_timeout() -> u64 {
    30
}

fn default_weather_timeout() -> u64 {
    5
}

#[derive(Debug, Deserialize, Clone)]
pub struct NotificationConfig {
    #[serde(default = "default_app_id")]
    pub app_id: String,
    #[serde(default)]
    pub permission: PermissionState,
}

fn default_app_id() -> String {
    DEFAULT_APP_ID.to_string()
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            app_id: default_app_id(),
            permission: PermissionState::default(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            bind: default_bind(),
            request_timeout_secs: default_request_timeout(),
            weather_timeout_secs: default_weather_timeout(),
            location: None,
            notifications: NotificationConfig::default(),
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Parse config from a TOML string (useful for testing)
    pub fn from_str(content: &str) -> anyhow::Result<Self> {
        let config: Config = toml::from_str(content)?;
        Ok(config)
    }

    /// Apply the `PULSE_API_URL` override, if set and non-empty.
    pub fn with_api_url_override(mut self, value: Option<String>) -> Self {
        if let Some(url) = value.filter(|u| !u.trim().is_empty()) {
            self.api_url = url;
        }
        self
    }
}
