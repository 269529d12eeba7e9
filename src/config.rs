use crate::analytics::session::DEFAULT_THRESHOLD_W;
use crate::context::{AnalyticsSettings, DashboardMode};
use crate::device::{Device, DeviceRegistry};
use crate::error::{AppError, Result};
use crate::ws::connection::DEFAULT_RECONNECT_DELAY;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub channel: ChannelConfig,
    #[serde(default)]
    pub dashboard: DashboardConfig,
    #[serde(default)]
    pub analytics: AnalyticsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelConfig {
    /// WebSocket endpoint of the device bridge, e.g. ws://localhost:3000/ws
    pub endpoint: String,
    #[serde(default = "default_reconnect_delay_ms")]
    pub reconnect_delay_ms: u64,
}

fn default_reconnect_delay_ms() -> u64 {
    DEFAULT_RECONNECT_DELAY.as_millis() as u64
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardConfig {
    /// "/", "/overview" or "/<deviceId>"
    #[serde(default = "default_route")]
    pub route: String,
    #[serde(default)]
    pub devices: Vec<Device>,
}

fn default_route() -> String {
    "/".into()
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            route: default_route(),
            devices: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyticsConfig {
    #[serde(default = "default_threshold")]
    pub session_threshold_w: f64,
    /// Currency units per kWh
    #[serde(default = "default_currency_rate")]
    pub currency_rate: f64,
    #[serde(default = "default_trend_window_secs")]
    pub trend_window_secs: u64,
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,
}

fn default_threshold() -> f64 {
    DEFAULT_THRESHOLD_W
}
fn default_currency_rate() -> f64 {
    0.33
}
fn default_trend_window_secs() -> u64 {
    60
}
fn default_tick_ms() -> u64 {
    1000
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            session_threshold_w: default_threshold(),
            currency_rate: default_currency_rate(),
            trend_window_secs: default_trend_window_secs(),
            tick_ms: default_tick_ms(),
        }
    }
}

impl Config {
    /// Load configuration from a YAML file with environment variable substitution.
    /// `TELEMETRY_ENDPOINT` overrides `channel.endpoint` when set.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        let expanded = expand_env_vars(content);
        let mut config: Config = serde_yaml::from_str(&expanded)?;

        if let Ok(endpoint) = std::env::var("TELEMETRY_ENDPOINT") {
            config.channel.endpoint = endpoint;
        }

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        let endpoint = self.channel.endpoint.trim();
        if endpoint.is_empty() {
            return Err(AppError::Config(
                "Channel endpoint cannot be empty".to_string(),
            ));
        }
        if !(endpoint.starts_with("ws://") || endpoint.starts_with("wss://")) {
            return Err(AppError::Config(format!(
                "Channel endpoint must be a ws:// or wss:// URL, got {}",
                endpoint
            )));
        }

        if self.channel.reconnect_delay_ms == 0 {
            return Err(AppError::Config(
                "Reconnect delay cannot be 0".to_string(),
            ));
        }

        if self.analytics.tick_ms == 0 || self.analytics.trend_window_secs == 0 {
            return Err(AppError::Config(
                "Trend tick and window must be positive".to_string(),
            ));
        }

        for (name, value) in [
            ("session_threshold_w", self.analytics.session_threshold_w),
            ("currency_rate", self.analytics.currency_rate),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(AppError::Config(format!(
                    "{} must be a non-negative number",
                    name
                )));
            }
        }

        let mut seen = HashSet::new();
        for device in &self.dashboard.devices {
            if device.device_id.is_empty() {
                return Err(AppError::Config("Device id cannot be empty".to_string()));
            }
            if !seen.insert(device.device_id.as_str()) {
                return Err(AppError::Config(format!(
                    "Duplicate device id: {}",
                    device.device_id
                )));
            }
        }

        Ok(())
    }

    pub fn registry(&self) -> DeviceRegistry {
        DeviceRegistry::new(self.dashboard.devices.clone())
    }

    pub fn mode(&self, registry: &DeviceRegistry) -> Result<DashboardMode> {
        DashboardMode::from_route(&self.dashboard.route, registry)
    }

    pub fn analytics_settings(&self) -> AnalyticsSettings {
        AnalyticsSettings {
            session_threshold_w: self.analytics.session_threshold_w,
            currency_rate: self.analytics.currency_rate,
            trend_window: chrono::Duration::seconds(self.analytics.trend_window_secs as i64),
        }
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.channel.reconnect_delay_ms)
    }

    pub fn tick_period(&self) -> Duration {
        Duration::from_millis(self.analytics.tick_ms)
    }
}

/// Expand environment variables in the format $(VAR_NAME)
fn expand_env_vars(content: &str) -> String {
    let re = match regex::Regex::new(r"\$\(([A-Z_][A-Z0-9_]*)\)") {
        Ok(re) => re,
        Err(_) => return content.to_string(),
    };

    re.replace_all(content, |caps: &regex::Captures| {
        std::env::var(&caps[1]).unwrap_or_else(|_| caps[0].to_string())
    })
    .into_owned()
}
