use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::collections::VecDeque;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TrendPoint {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}

/// Sliding window of the last known power value, resampled on every tick.
///
/// Between telemetry updates the last value is repeated, nothing is
/// interpolated.
#[derive(Debug)]
pub struct RealtimeTrendBuffer {
    window: Duration,
    last_sample: f64,
    points: VecDeque<TrendPoint>,
}

impl RealtimeTrendBuffer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last_sample: 0.0,
            points: VecDeque::new(),
        }
    }

    /// Remember the latest power value; does not append a point.
    pub fn on_sample(&mut self, value: f64) {
        self.last_sample = value;
    }

    /// Append the held value at `now` and evict points older than the window.
    pub fn on_tick(&mut self, now: DateTime<Utc>) -> TrendPoint {
        let point = TrendPoint {
            timestamp: now,
            value: self.last_sample,
        };
        self.points.push_back(point);

        let cutoff = now - self.window;
        while self
            .points
            .front()
            .is_some_and(|oldest| oldest.timestamp < cutoff)
        {
            self.points.pop_front();
        }

        point
    }

    pub fn last_sample(&self) -> f64 {
        self.last_sample
    }

    pub fn points(&self) -> impl Iterator<Item = &TrendPoint> {
        self.points.iter()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}
