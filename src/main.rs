use energy_live::{
    config::Config,
    notify::Update,
    ConnectionManager, DashboardContext, MessageRouter, Notifier, WsConnector,
};
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    info!("Starting energy-live");

    // Load configuration
    let config_path =
        std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config/config.yaml".to_string());

    let config = Config::load(&config_path)?;
    info!("Configuration loaded from: {}", config_path);

    let registry = config.registry();
    let mode = config.mode(&registry)?;
    info!(
        mode = ?mode,
        devices = registry.len(),
        endpoint = %config.channel.endpoint,
        "dashboard resolved"
    );

    let notifier = Notifier::default();
    tokio::spawn(render_updates(notifier.subscribe()));

    let ctx = DashboardContext::new(mode, registry, config.analytics_settings(), notifier);
    let manager = ConnectionManager::new(
        WsConnector::new(config.channel.endpoint.clone()),
        MessageRouter::new(ctx),
        config.reconnect_delay(),
        config.tick_period(),
    );

    manager.run(shutdown_signal()).await;

    info!("Shutdown complete");
    Ok(())
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "energy_live=debug".into());

    if std::env::var("LOG_FORMAT").is_ok_and(|f| f == "json") {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

/// Stand-in renderer: writes every update to the log
async fn render_updates(mut rx: broadcast::Receiver<Update>) {
    loop {
        match rx.recv().await {
            Ok(Update::TrendPointAppended { point }) => {
                debug!(value = point.value, "trend point");
            }
            Ok(Update::RealtimeReading { device_id, sample }) => {
                info!(device_id = %device_id, "realtime {}", sample);
            }
            Ok(Update::SessionComputed { device_id, session }) => match session {
                Some(s) => info!(device_id = %device_id, "last session {} kWh", s.display_kwh()),
                None => info!(device_id = %device_id, "no recent session"),
            },
            Ok(update) => match serde_json::to_string(&update) {
                Ok(json) => info!("{}", json),
                Err(e) => warn!("Failed to serialize update: {}", e),
            },
            Err(RecvError::Lagged(skipped)) => warn!("renderer lagged, skipped {} updates", skipped),
            Err(RecvError::Closed) => break,
        }
    }
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down gracefully");
        },
        _ = terminate => {
            info!("Received SIGTERM, shutting down gracefully");
        },
    }
}
