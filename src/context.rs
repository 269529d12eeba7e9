use crate::device::{Device, DeviceRegistry};
use crate::error::{AppError, Result};
use crate::notify::Notifier;
use chrono::Duration;

/// Which dashboard the engine feeds
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DashboardMode {
    /// One device: realtime, power state, log, session and rollups
    Single(Device),
    /// All registered devices: stacked daily and monthly rollups only
    Overview,
}

impl DashboardMode {
    /// Resolve a dashboard route (`/`, `/overview`, `/<deviceId>`).
    pub fn from_route(route: &str, registry: &DeviceRegistry) -> Result<Self> {
        match route.trim_end_matches('/') {
            "" if registry.is_empty() => Err(AppError::Config(
                "no devices registered for the overview".to_string(),
            )),
            "" | "/overview" => Ok(DashboardMode::Overview),
            path => {
                let device_id = path.trim_start_matches('/');
                registry
                    .get(device_id)
                    .cloned()
                    .map(DashboardMode::Single)
                    .ok_or_else(|| AppError::Config(format!("unknown device: {}", device_id)))
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnalyticsSettings {
    pub session_threshold_w: f64,
    pub currency_rate: f64,
    pub trend_window: Duration,
}

impl Default for AnalyticsSettings {
    fn default() -> Self {
        Self {
            session_threshold_w: crate::analytics::session::DEFAULT_THRESHOLD_W,
            currency_rate: 0.33,
            trend_window: Duration::seconds(60),
        }
    }
}

/// Everything the engine needs to know about the hosting dashboard
#[derive(Debug, Clone)]
pub struct DashboardContext {
    pub mode: DashboardMode,
    pub registry: DeviceRegistry,
    pub settings: AnalyticsSettings,
    pub notifier: Notifier,
}

impl DashboardContext {
    pub fn new(
        mode: DashboardMode,
        registry: DeviceRegistry,
        settings: AnalyticsSettings,
        notifier: Notifier,
    ) -> Self {
        Self {
            mode,
            registry,
            settings,
            notifier,
        }
    }

    /// Devices whose cached data is requested on every (re)connect
    pub fn tracked_devices(&self) -> Vec<String> {
        match &self.mode {
            DashboardMode::Single(device) => vec![device.device_id.clone()],
            DashboardMode::Overview => self
                .registry
                .devices()
                .iter()
                .map(|d| d.device_id.clone())
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> DeviceRegistry {
        DeviceRegistry::new(vec![Device::new("b1", "Oven"), Device::new("a1", "Kettle")])
    }

    #[test]
    fn test_route_resolution() {
        let registry = registry();

        assert_eq!(
            DashboardMode::from_route("/", &registry).unwrap(),
            DashboardMode::Overview
        );
        assert_eq!(
            DashboardMode::from_route("/overview", &registry).unwrap(),
            DashboardMode::Overview
        );
        assert_eq!(
            DashboardMode::from_route("/a1", &registry).unwrap(),
            DashboardMode::Single(Device::new("a1", "Kettle"))
        );
        assert!(DashboardMode::from_route("/zz", &registry).is_err());
        assert!(DashboardMode::from_route("/", &DeviceRegistry::default()).is_err());
    }

    #[test]
    fn test_tracked_devices() {
        let registry = registry();
        let overview = DashboardContext::new(
            DashboardMode::Overview,
            registry.clone(),
            AnalyticsSettings::default(),
            Notifier::default(),
        );
        assert_eq!(overview.tracked_devices(), vec!["a1", "b1"]);

        let single = DashboardContext::new(
            DashboardMode::Single(Device::new("b1", "Oven")),
            registry,
            AnalyticsSettings::default(),
            Notifier::default(),
        );
        assert_eq!(single.tracked_devices(), vec!["b1"]);
    }
}
