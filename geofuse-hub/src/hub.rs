//! The fusion hub and its per-key merge loop.
//!
//! One merge task runs per actively subscribed key. It owns the provider
//! streams for that key (restarting them on a forced refresh), applies
//! the selection rule to every incoming fix, sweeps the estimate for TTL
//! expiry, and republishes every change to the key's subscribers.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use parking_lot::Mutex;
use tokio::sync::{broadcast, mpsc};
use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;

use geofuse_core::{EstimateUpdate, Fix, LocationProvider};

use crate::config::HubConfig;
use crate::error::{HubError, Result};
use crate::estimate::EstimateStore;

/// Commands the hub sends to a key's merge task.
#[derive(Debug)]
enum MergeCommand {
    /// Restart the provider streams so every source re-reads now.
    Refresh,
}

/// Per-key state held by the hub while at least one subscriber exists.
struct KeyEntry {
    subscribers: usize,
    updates: broadcast::Sender<EstimateUpdate>,
    commands: mpsc::Sender<MergeCommand>,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

struct HubInner {
    providers: Vec<Arc<dyn LocationProvider>>,
    config: HubConfig,
    estimates: Arc<EstimateStore>,
    keys: Mutex<HashMap<String, KeyEntry>>,
    cancel: CancellationToken,
}

impl HubInner {
    /// Release one subscription for `key`; tears the key down when the
    /// last subscriber is gone.
    fn release(&self, key: &str) {
        let mut keys = self.keys.lock();
        let Some(entry) = keys.get_mut(key) else {
            return;
        };
        entry.subscribers = entry.subscribers.saturating_sub(1);
        if entry.subscribers > 0 {
            return;
        }
        if let Some(entry) = keys.remove(key) {
            entry.cancel.cancel();
            self.estimates.remove(key);
            tracing::debug!(key, "last subscriber gone, merge loop stopped");
        }
    }
}

/// Fusion hub merging all registered provider streams into one best
/// current estimate per key.
///
/// # Thread Safety
///
/// The hub is cheap to clone-share via its methods taking `&self`; the
/// per-key estimate is guarded so readers always observe a complete fix.
///
/// # Resource Management
///
/// Every subscription is backed by one merge task plus one stream task
/// and one forwarder task per provider, all tied to a cancellation token
/// hierarchy rooted in the hub. Dropping the last [`EstimateStream`] for
/// a key tears its tasks down; [`LocationHub::shutdown`] tears down
/// everything with a bounded wait.
pub struct LocationHub {
    inner: Arc<HubInner>,
}

impl LocationHub {
    /// Create a hub over `providers`.
    ///
    /// # Errors
    ///
    /// Returns `HubError::Configuration` if `config` fails validation.
    pub fn new(providers: Vec<Arc<dyn LocationProvider>>, config: HubConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            inner: Arc::new(HubInner {
                providers,
                config,
                estimates: Arc::new(EstimateStore::new()),
                keys: Mutex::new(HashMap::new()),
                cancel: CancellationToken::new(),
            }),
        })
    }

    /// Subscribe to the evolving best estimate for `key`.
    ///
    /// The first subscriber for a key starts its merge loop and one
    /// provider stream per registered provider. Further subscribers share
    /// the same loop. Dropping the returned stream releases the
    /// subscription; when the last one goes, the key's tasks stop and its
    /// state is removed.
    ///
    /// The stream yields an update on every change to the estimate,
    /// including the transition to unknown when it expires.
    pub fn subscribe(&self, key: &str) -> EstimateStream {
        let mut keys = self.inner.keys.lock();
        let entry = keys
            .entry(key.to_string())
            .or_insert_with(|| self.spawn_key(key));
        entry.subscribers += 1;
        let rx = entry.updates.subscribe();
        drop(keys);

        tracing::debug!(key, "subscriber added");
        EstimateStream {
            key: key.to_string(),
            rx,
            inner: Arc::clone(&self.inner),
        }
    }

    /// One-shot snapshot of the current estimate for `key`.
    ///
    /// Returns `None` when no provider has produced a winning fix yet or
    /// the estimate has expired.
    pub fn current_estimate(&self, key: &str) -> Option<Fix> {
        self.inner.estimates.current(key, Utc::now())
    }

    /// Last fix seen from every source for `key`, winners and losers
    /// alike. Diagnostics only.
    pub fn source_fixes(&self, key: &str) -> Vec<Fix> {
        self.inner.estimates.source_fixes(key)
    }

    /// Force a fresh read from every provider for `key` by restarting its
    /// streams. No-op when the key has no active subscription.
    pub async fn refresh(&self, key: &str) {
        let commands = {
            let keys = self.inner.keys.lock();
            keys.get(key).map(|entry| entry.commands.clone())
        };
        if let Some(commands) = commands {
            let _ = commands.send(MergeCommand::Refresh).await;
        }
    }

    /// Force a fresh read for every actively subscribed key.
    pub async fn refresh_all(&self) {
        let commands: Vec<_> = {
            let keys = self.inner.keys.lock();
            keys.values().map(|entry| entry.commands.clone()).collect()
        };
        for sender in commands {
            let _ = sender.send(MergeCommand::Refresh).await;
        }
    }

    /// Shutdown the hub: cancel every merge loop and wait for each with a
    /// bounded timeout.
    ///
    /// # Errors
    ///
    /// Returns `HubError::Shutdown` if a merge task panicked or did not
    /// stop within the configured timeout.
    pub async fn shutdown(self) -> Result<()> {
        self.inner.cancel.cancel();
        let entries: Vec<(String, KeyEntry)> = self.inner.keys.lock().drain().collect();

        for (key, entry) in entries {
            match tokio::time::timeout(self.inner.config.shutdown_timeout, entry.task).await {
                Ok(Ok(())) => {}
                Ok(Err(join_error)) => {
                    return Err(HubError::Shutdown(format!(
                        "merge task for {key:?} panicked: {join_error}"
                    )));
                }
                Err(_) => {
                    return Err(HubError::Shutdown(format!(
                        "merge task for {key:?} did not stop in time"
                    )));
                }
            }
        }
        Ok(())
    }

    fn spawn_key(&self, key: &str) -> KeyEntry {
        let cancel = self.inner.cancel.child_token();
        let (updates, _) = broadcast::channel(self.inner.config.update_buffer);
        let (commands_tx, commands_rx) = mpsc::channel(4);

        let task = tokio::spawn(merge_loop(
            self.inner.providers.clone(),
            Arc::clone(&self.inner.estimates),
            key.to_string(),
            cancel.clone(),
            updates.clone(),
            commands_rx,
            self.inner.config.clone(),
        ));

        tracing::debug!(key, "merge loop started");
        KeyEntry {
            subscribers: 0,
            updates,
            commands: commands_tx,
            cancel,
            task,
        }
    }
}

/// Subscriber handle for one key's evolving estimate.
///
/// Dropping the stream releases the subscription.
pub struct EstimateStream {
    key: String,
    rx: broadcast::Receiver<EstimateUpdate>,
    inner: Arc<HubInner>,
}

impl EstimateStream {
    /// The key this stream follows.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Wait for the next estimate change.
    ///
    /// Returns `None` once the key's merge loop has stopped. A subscriber
    /// that lags behind the broadcast capacity skips the missed updates
    /// and continues with the most recent ones.
    pub async fn next(&mut self) -> Option<EstimateUpdate> {
        loop {
            match self.rx.recv().await {
                Ok(update) => return Some(update),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(
                        key = %self.key,
                        skipped,
                        "subscriber lagged, skipping missed updates"
                    );
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

impl Drop for EstimateStream {
    fn drop(&mut self) {
        self.inner.release(&self.key);
    }
}

async fn merge_loop(
    providers: Vec<Arc<dyn LocationProvider>>,
    estimates: Arc<EstimateStore>,
    key: String,
    cancel: CancellationToken,
    updates: broadcast::Sender<EstimateUpdate>,
    mut commands: mpsc::Receiver<MergeCommand>,
    config: HubConfig,
) {
    let (merge_tx, mut merge_rx) = mpsc::channel(config.merge_buffer);
    let mut forwarders = JoinSet::new();
    let mut generation = start_streams(&providers, &cancel, &key, &merge_tx, &mut forwarders);
    let mut sweep = tokio::time::interval(config.sweep_interval);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,

            Some(fix) = merge_rx.recv() => {
                handle_fix(&estimates, &updates, &key, fix);
            }

            _ = sweep.tick() => {
                if estimates.expire(&key, Utc::now()) {
                    tracing::info!(%key, "estimate expired, location now unknown");
                    let _ = updates.send(EstimateUpdate::Unknown { key: key.clone() });
                }
            }

            Some(command) = commands.recv() => match command {
                MergeCommand::Refresh => {
                    tracing::debug!(%key, "forced refresh, restarting provider streams");
                    generation.cancel();
                    while forwarders.join_next().await.is_some() {}
                    generation =
                        start_streams(&providers, &cancel, &key, &merge_tx, &mut forwarders);
                }
            },
        }
    }

    generation.cancel();
    forwarders.shutdown().await;
}

/// Start one stream per provider under a fresh child token and forward
/// everything into the merge channel. Returns the token governing this
/// generation of streams.
fn start_streams(
    providers: &[Arc<dyn LocationProvider>],
    parent: &CancellationToken,
    key: &str,
    merge_tx: &mpsc::Sender<Fix>,
    forwarders: &mut JoinSet<()>,
) -> CancellationToken {
    let generation = parent.child_token();

    for provider in providers {
        let mut stream = provider.lookup_stream(generation.clone(), key);
        let tx = merge_tx.clone();
        let token = generation.clone();
        forwarders.spawn(async move {
            loop {
                let Some(fix) = stream.recv().await else { break };
                tokio::select! {
                    _ = token.cancelled() => break,
                    sent = tx.send(fix) => {
                        if sent.is_err() {
                            break;
                        }
                    }
                }
            }
        });
    }

    generation
}

fn handle_fix(
    estimates: &EstimateStore,
    updates: &broadcast::Sender<EstimateUpdate>,
    key: &str,
    fix: Fix,
) {
    // A fix for a foreign key or with an out-of-range confidence is a
    // provider logic defect, not a runtime condition.
    debug_assert_eq!(fix.key, key, "provider emitted a fix for a foreign key");
    debug_assert!(fix.confidence_in_range(), "confidence outside [0, 1]");
    if fix.key != key || !fix.confidence_in_range() {
        tracing::error!(
            key,
            fix_key = %fix.key,
            source = %fix.source,
            confidence = fix.confidence,
            "discarding invalid fix"
        );
        return;
    }

    let now = Utc::now();
    let source = fix.source.clone();
    if estimates.apply(fix.clone(), now) {
        tracing::debug!(key, %source, "new winning fix");
        let _ = updates.send(EstimateUpdate::Updated(fix));
    } else {
        tracing::trace!(key, %source, "fix lost selection, recorded for diagnostics");
    }
}
