//! The sleep/resume monitor and its bus reconnect state machine.
//!
//! States: `Disconnected → Connecting → Subscribed → signal loop`. Any
//! failure loops back to `Disconnected` after a fixed delay; only
//! cancellation terminates the task. The bus connection is released on
//! every exit path (RAII drop), so no handle is ever leaked.

use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use futures::StreamExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::config::SleepMonitorConfig;
use crate::debounce::Debouncer;
use crate::error::{MonitorError, Result};
use crate::logind::{ManagerProxy, PrepareForSleepStream};

/// Notification that the host resumed from sleep, emitted after the
/// network grace period.
#[derive(Debug, Clone)]
pub struct ResumeEvent {
    /// When the resume signal was accepted.
    pub at: DateTime<Utc>,
}

/// Background monitor for the host's suspend/resume broadcast.
///
/// Runs until the cancellation token fires or `shutdown` is called.
/// Resume notifications arrive on the channel returned by
/// [`SleepMonitor::start`]; the monitor itself never awaits whatever the
/// consumer does with them.
pub struct SleepMonitor {
    cancel: CancellationToken,
    task: JoinHandle<()>,
    shutdown_timeout: Duration,
}

impl SleepMonitor {
    /// Start the monitor under `cancel` and return it together with the
    /// resume event channel.
    ///
    /// # Errors
    ///
    /// Returns `MonitorError::Configuration` if `config` fails
    /// validation.
    pub fn start(
        config: SleepMonitorConfig,
        cancel: CancellationToken,
    ) -> Result<(Self, mpsc::Receiver<ResumeEvent>)> {
        config.validate()?;

        let (events_tx, events_rx) = mpsc::channel(config.event_buffer);
        let token = cancel.child_token();
        let shutdown_timeout = config.shutdown_timeout;
        let task = tokio::spawn(run(config, token.clone(), events_tx));

        Ok((
            Self {
                cancel: token,
                task,
                shutdown_timeout,
            },
            events_rx,
        ))
    }

    /// Stop the monitor and wait for its task with a bounded timeout.
    ///
    /// # Errors
    ///
    /// Returns `MonitorError::Shutdown` if the task panicked or did not
    /// stop in time.
    pub async fn shutdown(self) -> Result<()> {
        self.cancel.cancel();
        match tokio::time::timeout(self.shutdown_timeout, self.task).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(join_error)) => Err(MonitorError::Shutdown(format!(
                "monitor task panicked: {join_error}"
            ))),
            Err(_) => Err(MonitorError::Shutdown(
                "monitor task did not stop in time".to_string(),
            )),
        }
    }
}

async fn run(
    config: SleepMonitorConfig,
    cancel: CancellationToken,
    events: mpsc::Sender<ResumeEvent>,
) {
    let debouncer = Debouncer::new(config.debounce_window);

    loop {
        // Disconnected → Connecting
        let Some(connection) = connect(&config, &cancel).await else {
            return;
        };

        // Connecting → Subscribed
        let signals = match subscribe(&connection).await {
            Ok(signals) => signals,
            Err(error) => {
                tracing::warn!(%error, "failed to subscribe to PrepareForSleep, reconnecting");
                drop(connection);
                if !wait(config.subscribe_retry_delay, &cancel).await {
                    return;
                }
                continue;
            }
        };
        tracing::debug!("subscribed to logind PrepareForSleep");

        // Subscribed → signal loop
        let reconnect = signal_loop(signals, &config, &cancel, &debouncer, &events).await;

        // Connection cleanup runs on every path out of the loop.
        drop(connection);
        if !reconnect {
            return;
        }
        tracing::debug!("signal stream closed, reconnecting to system bus");
        if !wait(config.reconnect_delay, &cancel).await {
            return;
        }
    }
}

/// Open the system bus connection, retrying until it succeeds or the
/// token fires.
async fn connect(
    config: &SleepMonitorConfig,
    cancel: &CancellationToken,
) -> Option<zbus::Connection> {
    loop {
        match zbus::Connection::system().await {
            Ok(connection) => return Some(connection),
            Err(error) => {
                tracing::warn!(%error, "system bus connection failed, retrying");
                if !wait(config.connect_retry_delay, cancel).await {
                    return None;
                }
            }
        }
    }
}

async fn subscribe(connection: &zbus::Connection) -> zbus::Result<PrepareForSleepStream> {
    let proxy = ManagerProxy::new(connection).await?;
    proxy.receive_prepare_for_sleep().await
}

/// Read signals until the stream closes or cancellation fires. Returns
/// whether the monitor should reconnect.
async fn signal_loop(
    mut signals: PrepareForSleepStream<'_>,
    config: &SleepMonitorConfig,
    cancel: &CancellationToken,
    debouncer: &Debouncer,
    events: &mpsc::Sender<ResumeEvent>,
) -> bool {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => return false,
            signal = signals.next() => match signal {
                Some(signal) => match signal.args() {
                    Ok(args) => {
                        handle_signal(*args.start(), config, cancel, debouncer, events);
                    }
                    Err(error) => {
                        tracing::warn!(%error, "malformed PrepareForSleep payload");
                    }
                },
                // Stream closed: the bus connection dropped.
                None => return true,
            },
        }
    }
}

fn handle_signal(
    entering_sleep: bool,
    config: &SleepMonitorConfig,
    cancel: &CancellationToken,
    debouncer: &Debouncer,
    events: &mpsc::Sender<ResumeEvent>,
) {
    if entering_sleep {
        tracing::debug!("host preparing for sleep");
        return;
    }
    if !debouncer.should_fire(Instant::now()) {
        tracing::debug!("duplicate resume signal ignored");
        return;
    }

    tracing::info!("host resumed from sleep, scheduling refresh");

    // Fire-and-forget: give the network time to re-establish, then
    // notify. The signal loop is never blocked by this.
    let grace = config.resume_grace;
    let events = events.clone();
    let cancel = cancel.clone();
    tokio::spawn(async move {
        tokio::select! {
            _ = cancel.cancelled() => {}
            _ = tokio::time::sleep(grace) => {
                if events.send(ResumeEvent { at: Utc::now() }).await.is_err() {
                    tracing::debug!("resume event receiver dropped");
                }
            }
        }
    });
}

/// Cancellable sleep. Returns `false` when the token fired first.
async fn wait(duration: Duration, cancel: &CancellationToken) -> bool {
    tokio::select! {
        _ = cancel.cancelled() => false,
        _ = tokio::time::sleep(duration) => true,
    }
}
