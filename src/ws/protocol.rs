use crate::analytics::period::{Granularity, UsageEntry};
use crate::analytics::power::PowerState;
use crate::analytics::session::LogEntry;
use crate::analytics::units::{normalize_reading, RawReading, RawUsageEntry, TelemetrySample};
use crate::error::{AppError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Requests sent from the dashboard to the device bridge
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "requestType", rename_all = "camelCase")]
pub enum ClientRequest {
    #[serde(rename_all = "camelCase")]
    GetCachedData { device_id: String },
    #[serde(rename_all = "camelCase")]
    TogglePowerState { device_id: String },
}

impl ClientRequest {
    pub fn get_cached_data(device_id: impl Into<String>) -> Self {
        ClientRequest::GetCachedData {
            device_id: device_id.into(),
        }
    }

    pub fn toggle_power_state(device_id: impl Into<String>) -> Self {
        ClientRequest::TogglePowerState {
            device_id: device_id.into(),
        }
    }

    pub fn device_id(&self) -> &str {
        match self {
            ClientRequest::GetCachedData { device_id }
            | ClientRequest::TogglePowerState { device_id } => device_id,
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DataType {
    RealtimeUsage,
    DailyUsage,
    MonthlyUsage,
    PowerState,
    NewLogEntry,
    LoggedData,
}

impl DataType {
    /// Kinds the overview consumes
    pub fn is_rollup(self) -> bool {
        matches!(self, DataType::DailyUsage | DataType::MonthlyUsage)
    }
}

/// Outer frame of a server message; `data` stays raw until routed.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    pub device_id: String,
    data_type: String,
    #[serde(default)]
    data: Value,
}

impl Envelope {
    pub fn parse(text: &str) -> Result<Self> {
        serde_json::from_str(text)
            .map_err(|e| AppError::Protocol(format!("invalid envelope: {}", e)))
    }

    pub fn data_type(&self) -> Result<DataType> {
        serde_json::from_value(Value::String(self.data_type.clone()))
            .map_err(|_| AppError::Protocol(format!("unknown dataType: {}", self.data_type)))
    }

    /// Decode and normalize the payload.
    ///
    /// Unknown kinds and shape mismatches are `Protocol` errors; readings or
    /// usage entries lacking both unit representations are `MalformedSample`.
    pub fn into_message(self) -> Result<InboundMessage> {
        let payload = match self.data_type()? {
            DataType::RealtimeUsage => {
                let raw: RawReading = decode(self.data, "realtimeUsage")?;
                Payload::RealtimeUsage(normalize_reading(&raw)?)
            }
            DataType::DailyUsage => {
                Payload::DailyUsage(usage_entries(self.data, Granularity::Daily)?)
            }
            DataType::MonthlyUsage => {
                Payload::MonthlyUsage(usage_entries(self.data, Granularity::Monthly)?)
            }
            DataType::PowerState => Payload::PowerState(decode(self.data, "powerState")?),
            DataType::NewLogEntry => Payload::NewLogEntry(decode(self.data, "newLogEntry")?),
            DataType::LoggedData => Payload::LoggedData(decode(self.data, "loggedData")?),
        };

        Ok(InboundMessage {
            device_id: self.device_id,
            payload,
        })
    }
}

/// Normalized payload of a server message
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    RealtimeUsage(TelemetrySample),
    DailyUsage(Vec<UsageEntry>),
    MonthlyUsage(Vec<UsageEntry>),
    PowerState(PowerState),
    NewLogEntry(LogEntry),
    LoggedData(Vec<LogEntry>),
}

/// Message from the device bridge, validated and in canonical units
#[derive(Debug, Clone, PartialEq)]
pub struct InboundMessage {
    pub device_id: String,
    pub payload: Payload,
}

impl InboundMessage {
    /// Parse a text frame into a typed message in one step.
    pub fn parse(text: &str) -> Result<Self> {
        Envelope::parse(text)?.into_message()
    }
}

fn decode<T: serde::de::DeserializeOwned>(data: Value, kind: &str) -> Result<T> {
    serde_json::from_value(data)
        .map_err(|e| AppError::Protocol(format!("invalid {} payload: {}", kind, e)))
}

fn usage_entries(data: Value, granularity: Granularity) -> Result<Vec<UsageEntry>> {
    let kind = match granularity {
        Granularity::Daily => "dailyUsage",
        Granularity::Monthly => "monthlyUsage",
    };
    let raw: Vec<RawUsageEntry> = decode(data, kind)?;
    raw.iter()
        .map(|entry| UsageEntry::from_raw(entry, granularity))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_cached_data_serialization() {
        let json = ClientRequest::get_cached_data("8006ABC").to_json().unwrap();
        assert_eq!(json, r#"{"requestType":"getCachedData","deviceId":"8006ABC"}"#);
    }

    #[test]
    fn test_toggle_power_state_serialization() {
        let json = ClientRequest::toggle_power_state("8006ABC").to_json().unwrap();
        assert_eq!(json, r#"{"requestType":"togglePowerState","deviceId":"8006ABC"}"#);
    }

    #[test]
    fn test_realtime_usage_is_normalized() {
        let json = r#"{"deviceId": "d1", "dataType": "realtimeUsage",
            "data": {"power_mw": 1500000, "current_ma": 6500, "voltage_mv": 230000}}"#;
        let msg = InboundMessage::parse(json).unwrap();

        assert_eq!(msg.device_id, "d1");
        assert_eq!(
            msg.payload,
            Payload::RealtimeUsage(TelemetrySample {
                power: 1500.0,
                current: 6.5,
                voltage: 230.0
            })
        );
    }

    #[test]
    fn test_daily_usage_parsing() {
        let json = r#"{"deviceId": "d1", "dataType": "dailyUsage",
            "data": [{"year": 2024, "month": 1, "day": 5, "energy_wh": 2500},
                     {"year": 2024, "month": 1, "day": 6, "energy": 1.25}]}"#;
        let msg = InboundMessage::parse(json).unwrap();

        match msg.payload {
            Payload::DailyUsage(entries) => {
                assert_eq!(entries.len(), 2);
                assert_eq!(entries[0].energy_kwh, 2.5);
                assert_eq!(entries[1].energy_kwh, 1.25);
                assert_eq!(entries[1].day, Some(6));
            }
            other => panic!("Expected DailyUsage, got {:?}", other),
        }
    }

    #[test]
    fn test_logged_data_and_power_state() {
        let json = r#"{"deviceId": "d1", "dataType": "loggedData",
            "data": [{"ts": 1000, "pw": 12.5}, {"ts": 2000, "pw": 0}]}"#;
        let msg = InboundMessage::parse(json).unwrap();
        assert_eq!(
            msg.payload,
            Payload::LoggedData(vec![
                LogEntry { ts: 1000, pw: 12.5 },
                LogEntry { ts: 2000, pw: 0.0 }
            ])
        );

        let json = r#"{"deviceId": "d1", "dataType": "powerState", "data": {"isOn": false, "uptime": 0}}"#;
        let msg = InboundMessage::parse(json).unwrap();
        assert_eq!(
            msg.payload,
            Payload::PowerState(PowerState {
                is_on: false,
                uptime: 0
            })
        );
    }

    #[test]
    fn test_unknown_data_type_is_protocol_error() {
        let json = r#"{"deviceId": "d1", "dataType": "firmwareUpdate", "data": {}}"#;
        assert!(matches!(
            InboundMessage::parse(json),
            Err(AppError::Protocol(_))
        ));
    }

    #[test]
    fn test_garbage_is_protocol_error() {
        assert!(matches!(
            InboundMessage::parse("not json"),
            Err(AppError::Protocol(_))
        ));
        assert!(matches!(
            InboundMessage::parse(r#"{"deviceId": "d1", "dataType": "loggedData", "data": {"ts": 1}}"#),
            Err(AppError::Protocol(_))
        ));
    }

    #[test]
    fn test_envelope_defers_payload_decoding() {
        let envelope = Envelope::parse(
            r#"{"deviceId": "d2", "dataType": "realtimeUsage", "data": {"power": 5}}"#,
        )
        .unwrap();
        assert_eq!(envelope.device_id, "d2");
        assert_eq!(envelope.data_type().unwrap(), DataType::RealtimeUsage);
        assert!(!envelope.data_type().unwrap().is_rollup());
        assert!(matches!(
            envelope.into_message(),
            Err(AppError::MalformedSample(_))
        ));
    }

    #[test]
    fn test_reading_without_units_is_malformed() {
        let json = r#"{"deviceId": "d1", "dataType": "realtimeUsage", "data": {"power": 10}}"#;
        assert!(matches!(
            InboundMessage::parse(json),
            Err(AppError::MalformedSample(_))
        ));
    }
}
