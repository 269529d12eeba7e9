use chrono::{DateTime, Datelike, TimeZone};
use serde::{Deserialize, Serialize};

/// Default power (W) above which a device counts as in use
pub const DEFAULT_THRESHOLD_W: f64 = 5.0;

const MS_PER_HOUR_KILO: f64 = 3.6e9;

/// One logged power reading; logs arrive ordered by `ts`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Milliseconds since the Unix epoch
    pub ts: i64,
    /// Watts
    pub pw: f64,
}

/// Most recent contiguous run of above-threshold usage in a log.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Session {
    /// Idle sample the run rises from (or 0 when truncated), not the first
    /// active sample. Integration starts here.
    pub start_index: usize,
    pub end_index: usize,
    pub energy_kwh: f64,
    /// No idle sample precedes the run, so the energy is a lower bound
    pub left_truncated: bool,
    /// The last log entry is still above the threshold
    pub in_progress: bool,
}

impl Session {
    /// One decimal, prefixed with `>` when the true start predates the log
    pub fn display_kwh(&self) -> String {
        let prefix = if self.left_truncated { ">" } else { "" };
        format!("{}{:.1}", prefix, self.energy_kwh)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SessionDetector {
    threshold_w: f64,
}

impl Default for SessionDetector {
    fn default() -> Self {
        Self::new(DEFAULT_THRESHOLD_W)
    }
}

impl SessionDetector {
    pub fn new(threshold_w: f64) -> Self {
        Self { threshold_w }
    }

    /// Scan backwards for the latest active run and integrate its energy.
    ///
    /// The run ends at the last entry above the threshold (`end`) and starts
    /// at the closest earlier entry below it (`start`), or at index 0 when no
    /// such entry exists. Energy is a left Riemann sum over `[start, end)`, so
    /// nothing past `end` is ever referenced.
    pub fn detect(&self, log: &[LogEntry]) -> Option<Session> {
        let end = log.iter().rposition(|e| e.pw > self.threshold_w)?;

        let idle_before = log[..end].iter().rposition(|e| e.pw < self.threshold_w);
        let start = idle_before.unwrap_or(0);

        let energy_kwh = log[start..=end]
            .windows(2)
            .map(|pair| pair[0].pw * (pair[1].ts as f64 - pair[0].ts as f64) / MS_PER_HOUR_KILO)
            .sum();

        Some(Session {
            start_index: start,
            end_index: end,
            energy_kwh,
            left_truncated: idle_before.is_none(),
            in_progress: end == log.len() - 1,
        })
    }
}

/// Chart label of a log entry, e.g. `Jan 5th 14:03`
pub fn log_label<Tz: TimeZone>(ts: i64, tz: &Tz) -> Option<String>
where
    Tz::Offset: std::fmt::Display,
{
    let time: DateTime<Tz> = tz.timestamp_millis_opt(ts).single()?;
    let day = time.day();
    Some(format!(
        "{} {}{} {}",
        time.format("%b"),
        day,
        ordinal_suffix(day),
        time.format("%H:%M")
    ))
}

fn ordinal_suffix(day: u32) -> &'static str {
    match (day % 10, day % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn log(points: &[(i64, f64)]) -> Vec<LogEntry> {
        points.iter().map(|&(ts, pw)| LogEntry { ts, pw }).collect()
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-12
    }

    #[test]
    fn test_closed_session_energy() {
        let entries = log(&[(0, 0.0), (1000, 10.0), (2000, 10.0), (3000, 0.0)]);
        let session = SessionDetector::default().detect(&entries).unwrap();

        assert_eq!(session.start_index, 0);
        assert_eq!(session.end_index, 2);
        assert!(!session.left_truncated);
        assert!(!session.in_progress);
        // idle boundary contributes 0 W, the single active interval 10 W * 1 s
        assert!(approx(session.energy_kwh, 10.0 * 1000.0 / 3.6e9));
    }

    #[test]
    fn test_no_active_entry_means_no_session() {
        let entries = log(&[(0, 0.0), (1000, 4.9), (2000, 5.0)]);
        assert!(SessionDetector::default().detect(&entries).is_none());
        assert!(SessionDetector::default().detect(&[]).is_none());
    }

    #[test]
    fn test_left_truncated_when_log_starts_active() {
        let entries = log(&[(0, 100.0), (60_000, 100.0), (120_000, 0.0)]);
        let session = SessionDetector::default().detect(&entries).unwrap();

        assert!(session.left_truncated);
        assert_eq!(session.start_index, 0);
        assert_eq!(session.end_index, 1);
        assert!(approx(session.energy_kwh, 100.0 * 60_000.0 / 3.6e9));
        assert_eq!(session.display_kwh(), ">0.0");
    }

    #[test]
    fn test_session_in_progress_at_end_of_log() {
        let entries = log(&[
            (0, 1.0),
            (3_600_000, 2000.0),
            (7_200_000, 1000.0),
            (10_800_000, 1500.0),
        ]);
        let session = SessionDetector::default().detect(&entries).unwrap();

        assert!(session.in_progress);
        assert!(!session.left_truncated);
        assert_eq!(session.end_index, 3);
        // 1 W + 2000 W + 1000 W, one hour each; the open hour after 1500 W is excluded
        assert!(approx(session.energy_kwh, 3.001));
        assert_eq!(session.display_kwh(), "3.0");
    }

    #[test]
    fn test_only_latest_run_is_reported() {
        let entries = log(&[
            (0, 500.0),
            (1000, 0.0),
            (2000, 50.0),
            (3000, 50.0),
            (4000, 0.0),
            (5000, 0.0),
        ]);
        let session = SessionDetector::default().detect(&entries).unwrap();

        assert_eq!((session.start_index, session.end_index), (1, 3));
        assert!(!session.left_truncated);
    }

    #[test]
    fn test_extreme_timestamps_do_not_overflow() {
        let entries = log(&[(i64::MIN, 10.0), (i64::MAX, 10.0)]);
        let session = SessionDetector::default().detect(&entries).unwrap();

        assert!(session.energy_kwh.is_finite());
        assert!(session.energy_kwh > 0.0);
    }

    #[test]
    fn test_custom_threshold() {
        let entries = log(&[(0, 0.0), (1000, 20.0), (2000, 20.0)]);
        assert!(SessionDetector::new(25.0).detect(&entries).is_none());
        assert!(SessionDetector::new(15.0).detect(&entries).is_some());
    }

    #[test]
    fn test_log_label() {
        // 2024-01-05T14:03:00Z
        let label = log_label(1_704_463_380_000, &Utc).unwrap();
        assert_eq!(label, "Jan 5th 14:03");

        assert_eq!(ordinal_suffix(1), "st");
        assert_eq!(ordinal_suffix(2), "nd");
        assert_eq!(ordinal_suffix(3), "rd");
        assert_eq!(ordinal_suffix(11), "th");
        assert_eq!(ordinal_suffix(12), "th");
        assert_eq!(ordinal_suffix(22), "nd");
        assert_eq!(ordinal_suffix(31), "st");
    }
}
