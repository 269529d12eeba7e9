//! Daily and monthly rollups of a single device.

use crate::analytics::units::{self, RawUsageEntry};
use crate::error::{AppError, Result};
use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use std::ops::Add;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    Daily,
    Monthly,
}

/// Calendar bucket with energy resolved to kWh
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct UsageEntry {
    pub year: i32,
    /// 1-based
    pub month: u32,
    /// Present on daily entries only
    pub day: Option<u32>,
    pub energy_kwh: f64,
}

impl UsageEntry {
    /// Validate the calendar fields and resolve the energy unit.
    pub fn from_raw(raw: &RawUsageEntry, granularity: Granularity) -> Result<Self> {
        let energy_kwh = units::energy_kwh(raw)?;

        let day = match (granularity, raw.day) {
            (Granularity::Daily, None) => {
                return Err(AppError::Protocol(format!(
                    "daily entry {}-{:02} has no day",
                    raw.year, raw.month
                )))
            }
            (Granularity::Daily, Some(day)) => Some(day),
            (Granularity::Monthly, _) => None,
        };

        if NaiveDate::from_ymd_opt(raw.year, raw.month, day.unwrap_or(1)).is_none() {
            return Err(AppError::Protocol(format!(
                "invalid calendar date {}-{}-{}",
                raw.year,
                raw.month,
                day.unwrap_or(1)
            )));
        }

        Ok(Self {
            year: raw.year,
            month: raw.month,
            day,
            energy_kwh,
        })
    }

    fn first_day(&self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month, self.day.unwrap_or(1))
    }

    /// Chart label: `Jan 5` for days, `Jan` for months
    pub fn label(&self, granularity: Granularity) -> String {
        let Some(date) = self.first_day() else {
            return format!("{}-{}", self.year, self.month);
        };
        match granularity {
            Granularity::Daily => date.format("%b %-d").to_string(),
            Granularity::Monthly => date.format("%b").to_string(),
        }
    }

    fn matches(&self, granularity: Granularity, today: NaiveDate) -> bool {
        let same_month = self.year == today.year() && self.month == today.month();
        match granularity {
            Granularity::Daily => same_month && self.day == Some(today.day()),
            Granularity::Monthly => same_month,
        }
    }
}

/// Headline figures of one scope (a device, or the sum over devices)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct PeriodStats {
    pub current_period_kwh: f64,
    pub current_period_currency: f64,
    /// Window total for daily data, lifetime-style total for monthly data
    pub range_total_kwh: f64,
    pub range_total_currency: f64,
    pub average_kwh: f64,
    pub average_currency: f64,
}

impl PeriodStats {
    fn priced(current: f64, total: f64, average: f64, rate: f64) -> Self {
        Self {
            current_period_kwh: current,
            current_period_currency: current * rate,
            range_total_kwh: total,
            range_total_currency: total * rate,
            average_kwh: average,
            average_currency: average * rate,
        }
    }
}

impl Add for PeriodStats {
    type Output = PeriodStats;

    fn add(self, other: PeriodStats) -> PeriodStats {
        PeriodStats {
            current_period_kwh: self.current_period_kwh + other.current_period_kwh,
            current_period_currency: self.current_period_currency + other.current_period_currency,
            range_total_kwh: self.range_total_kwh + other.range_total_kwh,
            range_total_currency: self.range_total_currency + other.range_total_currency,
            average_kwh: self.average_kwh + other.average_kwh,
            average_currency: self.average_currency + other.average_currency,
        }
    }
}

impl std::iter::Sum for PeriodStats {
    fn sum<I: Iterator<Item = PeriodStats>>(iter: I) -> Self {
        iter.fold(PeriodStats::default(), Add::add)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesPoint {
    pub label: String,
    pub energy_kwh: f64,
}

/// Per-entry chart series in snapshot order
pub fn series(granularity: Granularity, entries: &[UsageEntry]) -> Vec<SeriesPoint> {
    entries
        .iter()
        .map(|entry| SeriesPoint {
            label: entry.label(granularity),
            energy_kwh: entry.energy_kwh,
        })
        .collect()
}

#[derive(Debug, Clone, Copy)]
pub struct PeriodAggregator {
    currency_rate: f64,
}

impl PeriodAggregator {
    pub fn new(currency_rate: f64) -> Self {
        Self { currency_rate }
    }

    pub fn aggregate(
        &self,
        granularity: Granularity,
        entries: &[UsageEntry],
        today: NaiveDate,
    ) -> PeriodStats {
        match granularity {
            Granularity::Daily => self.daily(entries, today),
            Granularity::Monthly => self.monthly(entries, today),
        }
    }

    /// Today's value, window total and plain mean per day
    pub fn daily(&self, entries: &[UsageEntry], today: NaiveDate) -> PeriodStats {
        let current = current_value(Granularity::Daily, entries, today);
        let total: f64 = entries.iter().map(|e| e.energy_kwh).sum();
        let average = if entries.is_empty() {
            0.0
        } else {
            total / entries.len() as f64
        };

        PeriodStats::priced(current, total, average, self.currency_rate)
    }

    /// This month's value, plus average and total over completed months.
    ///
    /// The last entry is taken as the running month and left out of the
    /// average, as are months with zero energy (missing data). The total adds
    /// the running month back on top of the qualifying months.
    pub fn monthly(&self, entries: &[UsageEntry], today: NaiveDate) -> PeriodStats {
        let current = current_value(Granularity::Monthly, entries, today);

        let Some((latest, completed)) = entries.split_last() else {
            return PeriodStats::priced(current, 0.0, 0.0, self.currency_rate);
        };

        let qualifying: Vec<f64> = completed
            .iter()
            .map(|e| e.energy_kwh)
            .filter(|&kwh| kwh > 0.0)
            .collect();
        let qualifying_total: f64 = qualifying.iter().sum();
        let average = if qualifying.is_empty() {
            0.0
        } else {
            qualifying_total / qualifying.len() as f64
        };

        PeriodStats::priced(
            current,
            qualifying_total + latest.energy_kwh,
            average,
            self.currency_rate,
        )
    }
}

fn current_value(granularity: Granularity, entries: &[UsageEntry], today: NaiveDate) -> f64 {
    entries
        .iter()
        .find(|e| e.matches(granularity, today))
        .map(|e| e.energy_kwh)
        .unwrap_or(0.0)
}
