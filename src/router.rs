use crate::analytics::period::{self, Granularity, UsageEntry};
use crate::analytics::session::{log_label, LogEntry};
use crate::analytics::{
    MultiDeviceMerger, PeriodAggregator, RealtimeTrendBuffer, SessionDetector, TrendPoint,
};
use crate::context::{DashboardContext, DashboardMode};
use crate::error::Result;
use crate::notify::{LogPoint, Update};
use crate::ws::protocol::{Envelope, InboundMessage, Payload};
use chrono::{DateTime, Local, NaiveDate, Utc};
use tracing::{debug, warn};

/// Dispatches inbound messages to the analytics components.
///
/// Owns all message-derived state; every message is handled to completion
/// before the next one, so nothing here needs locking.
#[derive(Debug)]
pub struct MessageRouter {
    ctx: DashboardContext,
    trend: RealtimeTrendBuffer,
    log: Vec<LogEntry>,
    detector: SessionDetector,
    aggregator: PeriodAggregator,
    daily: MultiDeviceMerger,
    monthly: MultiDeviceMerger,
}

impl MessageRouter {
    pub fn new(ctx: DashboardContext) -> Self {
        let settings = ctx.settings;
        Self {
            ctx,
            trend: RealtimeTrendBuffer::new(settings.trend_window),
            log: Vec::new(),
            detector: SessionDetector::new(settings.session_threshold_w),
            aggregator: PeriodAggregator::new(settings.currency_rate),
            daily: MultiDeviceMerger::new(Granularity::Daily),
            monthly: MultiDeviceMerger::new(Granularity::Monthly),
        }
    }

    pub fn context(&self) -> &DashboardContext {
        &self.ctx
    }

    pub fn trend(&self) -> &RealtimeTrendBuffer {
        &self.trend
    }

    pub fn log(&self) -> &[LogEntry] {
        &self.log
    }

    pub fn merger(&self, granularity: Granularity) -> &MultiDeviceMerger {
        match granularity {
            Granularity::Daily => &self.daily,
            Granularity::Monthly => &self.monthly,
        }
    }

    /// Handle one text frame; a bad frame is logged and dropped.
    pub fn receive(&mut self, text: &str, today: NaiveDate) {
        if let Err(e) = self.handle_text(text, today) {
            warn!(error = %e, "dropping inbound message");
        }
    }

    /// Decode a text frame and dispatch it.
    ///
    /// Frames for an inactive device, or kinds the overview does not use, are
    /// dropped before their payload is decoded, so they never produce errors.
    pub fn handle_text(&mut self, text: &str, today: NaiveDate) -> Result<()> {
        let envelope = Envelope::parse(text)?;

        match &self.ctx.mode {
            DashboardMode::Single(active) if active.device_id != envelope.device_id => {
                debug!(device_id = %envelope.device_id, "ignoring message for inactive device");
                return Ok(());
            }
            DashboardMode::Overview if !envelope.data_type()?.is_rollup() => {
                debug!(device_id = %envelope.device_id, "overview ignores non-rollup message");
                return Ok(());
            }
            _ => {}
        }

        self.dispatch(envelope.into_message()?, today);
        Ok(())
    }

    pub fn dispatch(&mut self, message: InboundMessage, today: NaiveDate) {
        let InboundMessage { device_id, payload } = message;

        match &self.ctx.mode {
            DashboardMode::Single(active) => {
                if active.device_id != device_id {
                    debug!(device_id = %device_id, "ignoring message for inactive device");
                    return;
                }
                self.dispatch_single(device_id, payload, today);
            }
            DashboardMode::Overview => self.dispatch_overview(device_id, payload, today),
        }
    }

    /// Append a trend point; the overview has no realtime trend.
    pub fn on_tick(&mut self, now: DateTime<Utc>) -> Option<TrendPoint> {
        if self.ctx.mode == DashboardMode::Overview {
            return None;
        }
        let point = self.trend.on_tick(now);
        self.ctx.notifier.emit(Update::TrendPointAppended { point });
        Some(point)
    }

    fn dispatch_single(&mut self, device_id: String, payload: Payload, today: NaiveDate) {
        match payload {
            Payload::RealtimeUsage(sample) => {
                self.trend.on_sample(sample.power);
                self.ctx
                    .notifier
                    .emit(Update::RealtimeReading { device_id, sample });
            }
            Payload::DailyUsage(entries) => {
                self.publish_period(device_id, Granularity::Daily, &entries, today)
            }
            Payload::MonthlyUsage(entries) => {
                self.publish_period(device_id, Granularity::Monthly, &entries, today)
            }
            Payload::PowerState(state) => {
                self.ctx.notifier.emit(Update::PowerStateChanged {
                    device_id,
                    state,
                    uptime: state.uptime_label(),
                });
            }
            Payload::NewLogEntry(entry) => {
                self.log.push(entry);
                self.ctx.notifier.emit(Update::LogEntryAppended {
                    device_id,
                    entry: log_point(&entry),
                });
            }
            Payload::LoggedData(entries) => {
                self.log = entries;
                let session = self.detector.detect(&self.log);
                debug!(
                    device_id = %device_id,
                    entries = self.log.len(),
                    session = ?session,
                    "usage log replaced"
                );

                self.ctx.notifier.emit(Update::LogReplaced {
                    device_id: device_id.clone(),
                    entries: self.log.iter().map(log_point).collect(),
                });
                self.ctx
                    .notifier
                    .emit(Update::SessionComputed { device_id, session });
            }
        }
    }

    fn dispatch_overview(&mut self, device_id: String, payload: Payload, today: NaiveDate) {
        let (granularity, entries) = match payload {
            Payload::DailyUsage(entries) => (Granularity::Daily, entries),
            Payload::MonthlyUsage(entries) => (Granularity::Monthly, entries),
            _ => {
                debug!(device_id = %device_id, "overview ignores non-rollup message");
                return;
            }
        };

        let stats = self.aggregator.aggregate(granularity, &entries, today);
        let merger = match granularity {
            Granularity::Daily => &mut self.daily,
            Granularity::Monthly => &mut self.monthly,
        };
        merger.ingest(&device_id, &entries, stats);

        self.ctx.notifier.emit(Update::StackedUsageUpdated {
            series: merger.stacked(&self.ctx.registry),
            combined: merger.combined_stats(),
        });
    }

    fn publish_period(
        &self,
        device_id: String,
        granularity: Granularity,
        entries: &[UsageEntry],
        today: NaiveDate,
    ) {
        let stats = self.aggregator.aggregate(granularity, entries, today);
        self.ctx.notifier.emit(Update::PeriodStatsUpdated {
            device_id,
            granularity,
            stats,
            series: period::series(granularity, entries),
        });
    }
}

fn log_point(entry: &LogEntry) -> LogPoint {
    LogPoint {
        ts: entry.ts,
        pw: entry.pw,
        label: log_label(entry.ts, &Local).unwrap_or_else(|| entry.ts.to_string()),
    }
}
