pub mod analytics;
pub mod config;
pub mod context;
pub mod device;
pub mod error;
pub mod notify;
pub mod router;
pub mod ws;

// Re-export commonly used items
pub use config::Config;
pub use context::{AnalyticsSettings, DashboardContext, DashboardMode};
pub use device::{Device, DeviceRegistry};
pub use error::{AppError, Result};
pub use notify::{ConnectionSignal, Notifier, Update};
pub use router::MessageRouter;
pub use ws::{ClientRequest, CommandHandle, ConnectionManager, WsConnector};
