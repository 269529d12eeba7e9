use crate::analytics::period::{Granularity, PeriodStats, UsageEntry};
use crate::device::{device_color, DeviceRegistry};
use serde::Serialize;
use std::collections::HashMap;

/// One device's bars in a stacked chart, aligned with [`StackedSeries::labels`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceDataset {
    pub device_id: String,
    pub label: String,
    pub color: String,
    pub values: Vec<Option<f64>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StackedSeries {
    pub granularity: Granularity,
    pub labels: Vec<String>,
    pub datasets: Vec<DeviceDataset>,
}

/// Combines per-device rollups of one granularity for the overview.
///
/// Labels keep the order in which they were first observed across all
/// devices. A new snapshot for a device replaces that device's cells and
/// stats; labels it no longer covers stay in place for the other devices.
#[derive(Debug)]
pub struct MultiDeviceMerger {
    granularity: Granularity,
    labels: Vec<String>,
    cells: HashMap<String, HashMap<String, f64>>,
    devices: Vec<String>,
    stats: HashMap<String, PeriodStats>,
}

impl MultiDeviceMerger {
    pub fn new(granularity: Granularity) -> Self {
        Self {
            granularity,
            labels: Vec::new(),
            cells: HashMap::new(),
            devices: Vec::new(),
            stats: HashMap::new(),
        }
    }

    pub fn ingest(&mut self, device_id: &str, entries: &[UsageEntry], stats: PeriodStats) {
        if !self.devices.iter().any(|d| d == device_id) {
            self.devices.push(device_id.to_string());
        }

        for per_device in self.cells.values_mut() {
            per_device.remove(device_id);
        }

        for entry in entries {
            let label = entry.label(self.granularity);
            if !self.cells.contains_key(&label) {
                self.labels.push(label.clone());
            }
            self.cells
                .entry(label)
                .or_default()
                .insert(device_id.to_string(), entry.energy_kwh);
        }

        self.stats.insert(device_id.to_string(), stats);
    }

    /// Labels that currently hold at least one device value, in first-seen order
    pub fn labels(&self) -> Vec<&str> {
        self.labels
            .iter()
            .filter(|label| self.cells.get(*label).is_some_and(|c| !c.is_empty()))
            .map(String::as_str)
            .collect()
    }

    pub fn energy(&self, label: &str, device_id: &str) -> Option<f64> {
        self.cells.get(label)?.get(device_id).copied()
    }

    /// Sum over devices for one label
    pub fn label_total(&self, label: &str) -> f64 {
        self.cells
            .get(label)
            .map(|c| c.values().sum())
            .unwrap_or(0.0)
    }

    pub fn device_stats(&self, device_id: &str) -> Option<&PeriodStats> {
        self.stats.get(device_id)
    }

    /// Element-wise sum of the per-device stats
    pub fn combined_stats(&self) -> PeriodStats {
        self.stats.values().copied().sum()
    }

    pub fn stacked(&self, registry: &DeviceRegistry) -> StackedSeries {
        let labels = self.labels();

        let datasets = self
            .devices
            .iter()
            .map(|device_id| DeviceDataset {
                device_id: device_id.clone(),
                label: format!("{} (kWh)", registry.alias_of(device_id)),
                color: device_color(device_id),
                values: labels
                    .iter()
                    .map(|label| self.energy(label, device_id))
                    .collect(),
            })
            .collect();

        StackedSeries {
            granularity: self.granularity,
            labels: labels.into_iter().map(str::to_string).collect(),
            datasets,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::Device;
    use pretty_assertions::assert_eq;

    fn day(month: u32, day: u32, kwh: f64) -> UsageEntry {
        UsageEntry {
            year: 2024,
            month,
            day: Some(day),
            energy_kwh: kwh,
        }
    }

    fn stats(current: f64) -> PeriodStats {
        PeriodStats {
            current_period_kwh: current,
            ..Default::default()
        }
    }

    #[test]
    fn test_same_label_values_stack() {
        let mut merger = MultiDeviceMerger::new(Granularity::Daily);
        merger.ingest("dev-a", &[day(1, 5, 3.0)], stats(3.0));
        merger.ingest("dev-b", &[day(1, 5, 4.0)], stats(4.0));

        assert_eq!(merger.labels(), vec!["Jan 5"]);
        assert_eq!(merger.label_total("Jan 5"), 7.0);
        assert_eq!(merger.combined_stats().current_period_kwh, 7.0);
    }

    #[test]
    fn test_label_order_follows_arrival() {
        let mut merger = MultiDeviceMerger::new(Granularity::Daily);
        merger.ingest("dev-a", &[day(1, 6, 1.0), day(1, 7, 1.0)], stats(0.0));
        merger.ingest("dev-b", &[day(1, 4, 1.0), day(1, 6, 2.0)], stats(0.0));

        assert_eq!(merger.labels(), vec!["Jan 6", "Jan 7", "Jan 4"]);
    }

    #[test]
    fn test_redelivery_is_idempotent() {
        let mut merger = MultiDeviceMerger::new(Granularity::Daily);
        let snapshot = [day(1, 5, 3.0), day(1, 6, 2.0)];
        merger.ingest("dev-a", &snapshot, stats(2.0));
        merger.ingest("dev-b", &[day(1, 7, 1.0)], stats(1.0));
        let registry = DeviceRegistry::default();
        let before = merger.stacked(&registry);

        merger.ingest("dev-a", &snapshot, stats(2.0));

        assert_eq!(merger.stacked(&registry), before);
        assert_eq!(merger.combined_stats().current_period_kwh, 3.0);
    }

    #[test]
    fn test_snapshot_replaces_device_cells() {
        let mut merger = MultiDeviceMerger::new(Granularity::Daily);
        merger.ingest("dev-a", &[day(1, 5, 3.0)], stats(0.0));
        merger.ingest("dev-a", &[day(1, 6, 2.0)], stats(2.0));

        assert_eq!(merger.labels(), vec!["Jan 6"]);
        assert_eq!(merger.energy("Jan 5", "dev-a"), None);
        assert_eq!(merger.device_stats("dev-a"), Some(&stats(2.0)));
        assert_eq!(merger.device_stats("dev-b"), None);
    }

    #[test]
    fn test_stacked_datasets_are_aligned() {
        let registry = DeviceRegistry::new(vec![
            Device::new("0000aa111111", "Kettle"),
            Device::new("0000bb222222", "Oven"),
        ]);
        let mut merger = MultiDeviceMerger::new(Granularity::Daily);
        merger.ingest("0000bb222222", &[day(1, 5, 1.5)], stats(0.0));
        merger.ingest("0000aa111111", &[day(1, 5, 0.5), day(1, 6, 2.5)], stats(0.0));

        let series = merger.stacked(&registry);
        assert_eq!(series.labels, vec!["Jan 5", "Jan 6"]);
        assert_eq!(
            series.datasets,
            vec![
                DeviceDataset {
                    device_id: "0000bb222222".to_string(),
                    label: "Oven (kWh)".to_string(),
                    color: "#222222".to_string(),
                    values: vec![Some(1.5), None],
                },
                DeviceDataset {
                    device_id: "0000aa111111".to_string(),
                    label: "Kettle (kWh)".to_string(),
                    color: "#111111".to_string(),
                    values: vec![Some(0.5), Some(2.5)],
                },
            ]
        );
    }
}
