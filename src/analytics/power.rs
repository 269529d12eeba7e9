use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PowerState {
    pub is_on: bool,
    /// Seconds since the relay was last switched on
    #[serde(default)]
    pub uptime: u64,
}

impl PowerState {
    /// `-` when zero, otherwise the two largest units
    pub fn uptime_label(&self) -> String {
        format_uptime(self.uptime)
    }
}

pub fn format_uptime(secs: u64) -> String {
    if secs == 0 {
        return "-".to_string();
    }

    let units: Vec<(u64, &str)> = if secs > 60 {
        vec![
            (secs / 86_400, "d"),
            (secs % 86_400 / 3_600, "h"),
            (secs % 3_600 / 60, "m"),
        ]
    } else {
        vec![(secs / 60, "m"), (secs % 60, "s")]
    };

    // two adjacent units from the largest non-zero one; zeros among them are dropped
    units
        .into_iter()
        .skip_while(|(value, _)| *value == 0)
        .take(2)
        .filter(|(value, _)| *value > 0)
        .map(|(value, unit)| format!("{value}{unit}"))
        .collect::<Vec<_>>()
        .join(" ")
}
