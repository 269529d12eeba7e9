pub mod merge;
pub mod period;
pub mod power;
pub mod session;
pub mod trend;
pub mod units;

pub use merge::{DeviceDataset, MultiDeviceMerger, StackedSeries};
pub use period::{Granularity, PeriodAggregator, PeriodStats, SeriesPoint, UsageEntry};
pub use power::PowerState;
pub use session::{LogEntry, Session, SessionDetector};
pub use trend::{RealtimeTrendBuffer, TrendPoint};
pub use units::TelemetrySample;
