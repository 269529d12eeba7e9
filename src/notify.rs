use crate::analytics::{
    Granularity, PeriodStats, PowerState, SeriesPoint, Session, StackedSeries, TelemetrySample,
    TrendPoint,
};
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionSignal {
    Restored,
    Lost,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogPoint {
    pub ts: i64,
    pub pw: f64,
    pub label: String,
}

/// Derived state published to the rendering layer
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Update {
    Connection {
        signal: ConnectionSignal,
    },
    RealtimeReading {
        device_id: String,
        sample: TelemetrySample,
    },
    TrendPointAppended {
        point: TrendPoint,
    },
    PowerStateChanged {
        device_id: String,
        state: PowerState,
        uptime: String,
    },
    LogReplaced {
        device_id: String,
        entries: Vec<LogPoint>,
    },
    LogEntryAppended {
        device_id: String,
        entry: LogPoint,
    },
    SessionComputed {
        device_id: String,
        session: Option<Session>,
    },
    PeriodStatsUpdated {
        device_id: String,
        granularity: Granularity,
        stats: PeriodStats,
        series: Vec<SeriesPoint>,
    },
    StackedUsageUpdated {
        series: StackedSeries,
        combined: PeriodStats,
    },
}

/// Publishing side of the update channel
#[derive(Debug, Clone)]
pub struct Notifier {
    tx: broadcast::Sender<Update>,
}

impl Notifier {
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Update> {
        self.tx.subscribe()
    }

    pub fn emit(&self, update: Update) {
        match self.tx.send(update) {
            Ok(count) => debug!("published update to {} subscribers", count),
            Err(_) => debug!("no update subscribers, skipping"),
        }
    }
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new(256)
    }
}
