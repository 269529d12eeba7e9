use serde::{Deserialize, Serialize};

/// Metered device as known to the device registry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Device {
    pub device_id: String,
    pub alias: String,
}

impl Device {
    pub fn new(device_id: impl Into<String>, alias: impl Into<String>) -> Self {
        Self {
            device_id: device_id.into(),
            alias: alias.into(),
        }
    }
}

/// Chart colour derived from the tail of a device id
pub fn device_color(device_id: &str) -> String {
    let tail: String = {
        let chars: Vec<char> = device_id.chars().collect();
        let from = chars.len().saturating_sub(6);
        chars[from..].iter().collect()
    };
    format!("#{}", tail)
}

/// Read-only snapshot of the registered devices, ordered by alias
#[derive(Debug, Clone, Default)]
pub struct DeviceRegistry {
    devices: Vec<Device>,
}

impl DeviceRegistry {
    pub fn new(mut devices: Vec<Device>) -> Self {
        devices.sort_by_cached_key(|d| d.alias.to_lowercase());
        Self { devices }
    }

    pub fn devices(&self) -> &[Device] {
        &self.devices
    }

    pub fn get(&self, device_id: &str) -> Option<&Device> {
        self.devices.iter().find(|d| d.device_id == device_id)
    }

    /// Alias of a device, falling back to its id when unregistered
    pub fn alias_of<'a>(&'a self, device_id: &'a str) -> &'a str {
        self.get(device_id)
            .map(|d| d.alias.as_str())
            .unwrap_or(device_id)
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }
}
