use crate::error::{AppError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Real-time reading as pushed by the device bridge.
///
/// Older firmware reports milli-units (`power_mw`, `current_ma`, `voltage_mv`),
/// newer firmware reports base units directly. Only [`normalize_reading`]
/// should ever look at this type.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawReading {
    pub power_mw: Option<f64>,
    pub current_ma: Option<f64>,
    pub voltage_mv: Option<f64>,
    pub power: Option<f64>,
    pub current: Option<f64>,
    pub voltage: Option<f64>,
}

/// Real-time reading in W, A and V
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TelemetrySample {
    pub power: f64,
    pub current: f64,
    pub voltage: f64,
}

impl fmt::Display for TelemetrySample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:.0} W, {:.2} A, {:.0} V",
            self.power, self.current, self.voltage
        )
    }
}

/// Calendar bucket as reported in `dailyUsage` / `monthlyUsage` snapshots
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawUsageEntry {
    pub year: i32,
    pub month: u32,
    pub day: Option<u32>,
    pub energy: Option<f64>,
    pub energy_wh: Option<f64>,
}

/// Pick the milli-unit value when present, otherwise the base-unit value.
pub fn resolve(milli: Option<f64>, base: Option<f64>, field: &str) -> Result<f64> {
    let value = match (milli, base) {
        (Some(m), _) => m / 1000.0,
        (None, Some(b)) => b,
        (None, None) => {
            return Err(AppError::MalformedSample(format!(
                "neither {field} representation present"
            )))
        }
    };

    if value.is_finite() {
        Ok(value)
    } else {
        Err(AppError::MalformedSample(format!("{field} is not finite")))
    }
}

pub fn normalize_reading(raw: &RawReading) -> Result<TelemetrySample> {
    Ok(TelemetrySample {
        power: resolve(raw.power_mw, raw.power, "power")?,
        current: resolve(raw.current_ma, raw.current, "current")?,
        voltage: resolve(raw.voltage_mv, raw.voltage, "voltage")?,
    })
}

/// Energy of a usage bucket in kWh (`energy_wh` wins over `energy`)
pub fn energy_kwh(raw: &RawUsageEntry) -> Result<f64> {
    resolve(raw.energy_wh, raw.energy, "energy")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_milli_units_are_divided() {
        let raw = RawReading {
            power_mw: Some(1_234_000.0),
            current_ma: Some(5_250.0),
            voltage_mv: Some(230_100.0),
            ..Default::default()
        };

        let sample = normalize_reading(&raw).unwrap();
        assert_eq!(sample.power, 1234.0);
        assert_eq!(sample.current, 5.25);
        assert_eq!(sample.voltage, 230.1);
    }

    #[test]
    fn test_base_units_pass_through() {
        let raw = RawReading {
            power: Some(42.5),
            current: Some(0.19),
            voltage: Some(229.0),
            ..Default::default()
        };

        let sample = normalize_reading(&raw).unwrap();
        assert_eq!(
            sample,
            TelemetrySample {
                power: 42.5,
                current: 0.19,
                voltage: 229.0
            }
        );
    }

    #[test]
    fn test_missing_field_is_malformed() {
        let raw = RawReading {
            power: Some(10.0),
            voltage: Some(230.0),
            ..Default::default()
        };

        let err = normalize_reading(&raw).unwrap_err();
        assert!(matches!(err, AppError::MalformedSample(_)));
        assert!(err.to_string().contains("current"));
    }

    #[test]
    fn test_energy_resolution() {
        let wh = RawUsageEntry {
            energy_wh: Some(1500.0),
            ..Default::default()
        };
        let kwh = RawUsageEntry {
            energy: Some(1.5),
            ..Default::default()
        };

        assert_eq!(energy_kwh(&wh).unwrap(), 1.5);
        assert_eq!(energy_kwh(&kwh).unwrap(), 1.5);
        assert!(energy_kwh(&RawUsageEntry::default()).is_err());
    }

    #[test]
    fn test_display_rounding() {
        let sample = TelemetrySample {
            power: 1499.6,
            current: 6.519,
            voltage: 229.4,
        };
        assert_eq!(sample.to_string(), "1500 W, 6.52 A, 229 V");
    }
}
