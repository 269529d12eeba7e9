use crate::error::{AppError, Result};
use crate::notify::{ConnectionSignal, Update};
use crate::router::MessageRouter;
use crate::ws::protocol::ClientRequest;
use crate::ws::transport::{Channel, Connector};
use chrono::{Local, Utc};
use std::future::Future;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{interval, sleep, Interval, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Fixed pause between a lost channel and the next connect attempt
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_millis(2000);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    WaitingToRetry,
}

/// Sends user commands over whichever channel is currently open
#[derive(Debug, Clone)]
pub struct CommandHandle {
    tx: mpsc::Sender<ClientRequest>,
}

impl CommandHandle {
    pub async fn toggle_power(&self, device_id: &str) -> Result<()> {
        self.tx
            .send(ClientRequest::toggle_power_state(device_id))
            .await
            .map_err(|_| AppError::Channel("connection manager stopped".to_string()))
    }
}

/// Owns the duplex channel: connect, replay requests, serve, reconnect.
///
/// Reconnection uses a fixed delay and never gives up. Ticks for the
/// realtime trend keep running while disconnected.
pub struct ConnectionManager<C: Connector> {
    connector: C,
    router: MessageRouter,
    reconnect_delay: Duration,
    tick_period: Duration,
    command_tx: mpsc::Sender<ClientRequest>,
    commands: mpsc::Receiver<ClientRequest>,
    state: ConnectionState,
    outage_signalled: bool,
}

impl<C: Connector> ConnectionManager<C> {
    pub fn new(
        connector: C,
        router: MessageRouter,
        reconnect_delay: Duration,
        tick_period: Duration,
    ) -> Self {
        let (command_tx, commands) = mpsc::channel(16);
        Self {
            connector,
            router,
            reconnect_delay,
            tick_period,
            command_tx,
            commands,
            state: ConnectionState::Disconnected,
            outage_signalled: false,
        }
    }

    pub fn commands(&self) -> CommandHandle {
        CommandHandle {
            tx: self.command_tx.clone(),
        }
    }

    /// Run until `shutdown` resolves, then hand back the router and its state.
    pub async fn run<F>(mut self, shutdown: F) -> MessageRouter
    where
        F: Future<Output = ()>,
    {
        let mut ticker = interval(self.tick_period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        loop {
            self.set_state(ConnectionState::Connecting);
            let attempt = tokio::select! {
                biased;
                _ = &mut shutdown => break,
                attempt = idle(
                    self.connector.connect(),
                    &mut ticker,
                    &mut self.router,
                    &mut self.commands,
                ) => attempt,
            };

            match attempt {
                Ok(mut channel) => {
                    self.set_state(ConnectionState::Connected);
                    self.outage_signalled = false;
                    self.router.context().notifier.emit(Update::Connection {
                        signal: ConnectionSignal::Restored,
                    });

                    let served = tokio::select! {
                        biased;
                        _ = &mut shutdown => break,
                        served = self.serve(&mut channel, &mut ticker) => served,
                    };
                    match served {
                        Ok(()) => info!("channel closed by peer"),
                        Err(e) => warn!(error = %e, "channel failed"),
                    }
                }
                Err(e) => warn!(error = %e, "connect attempt failed"),
            }

            self.set_state(ConnectionState::Disconnected);
            self.signal_outage();

            self.set_state(ConnectionState::WaitingToRetry);
            tokio::select! {
                biased;
                _ = &mut shutdown => break,
                _ = idle(
                    sleep(self.reconnect_delay),
                    &mut ticker,
                    &mut self.router,
                    &mut self.commands,
                ) => {}
            }
        }

        info!("connection manager stopped");
        self.router
    }

    /// Replay cached-data requests, then pump frames until the channel ends.
    async fn serve(&mut self, channel: &mut C::Channel, ticker: &mut Interval) -> Result<()> {
        for device_id in self.router.context().tracked_devices() {
            debug!(device_id = %device_id, "requesting cached data");
            channel
                .send_text(ClientRequest::get_cached_data(device_id).to_json()?)
                .await?;
        }

        loop {
            tokio::select! {
                frame = channel.recv_text() => match frame {
                    Some(Ok(text)) => self.router.receive(&text, Local::now().date_naive()),
                    Some(Err(e)) => return Err(e),
                    None => return Ok(()),
                },
                _ = ticker.tick() => {
                    self.router.on_tick(Utc::now());
                }
                Some(request) = self.commands.recv() => {
                    debug!(device_id = request.device_id(), "sending command");
                    channel.send_text(request.to_json()?).await?;
                }
            }
        }
    }

    fn signal_outage(&mut self) {
        if self.outage_signalled {
            return;
        }
        self.outage_signalled = true;
        self.router.context().notifier.emit(Update::Connection {
            signal: ConnectionSignal::Lost,
        });
    }

    fn set_state(&mut self, state: ConnectionState) {
        debug!(from = ?self.state, to = ?state, "connection state");
        self.state = state;
    }
}

/// Await `fut` while still servicing ticks; commands are dropped meanwhile.
async fn idle<F: Future>(
    fut: F,
    ticker: &mut Interval,
    router: &mut MessageRouter,
    commands: &mut mpsc::Receiver<ClientRequest>,
) -> F::Output {
    tokio::pin!(fut);
    loop {
        tokio::select! {
            out = &mut fut => return out,
            _ = ticker.tick() => {
                router.on_tick(Utc::now());
            }
            Some(request) = commands.recv() => {
                warn!(device_id = request.device_id(), "not connected, dropping command");
            }
        }
    }
}
