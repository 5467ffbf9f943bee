//! The polling loop shared by all providers.
//!
//! Providers only describe how to take one measurement ([`PollSource`]);
//! this module provides the common streaming behavior: read, suppress
//! unchanged values, emit, sleep, repeat, with every suspension point
//! racing the cancellation token.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use geofuse_core::{ChangeTracker, Fix, Reading};

use crate::error::Result;

/// Buffer size for a provider's fix channel. Emissions are rare (change
/// suppression), so a small buffer suffices.
const STREAM_BUFFER: usize = 8;

/// One measurement source driven by the shared polling loop.
///
/// Implementors provide the measurement and its timings; the loop in
/// [`spawn_stream`] provides the streaming contract.
#[async_trait]
pub trait PollSource: Send + Sync {
    /// Stable provider name, stamped into every emitted fix.
    fn name(&self) -> &str;

    /// How long to wait between reads (and after a failed read).
    fn period(&self) -> Duration;

    /// Expiry window stamped into every emitted fix.
    fn ttl(&self) -> Duration;

    /// Take one measurement.
    async fn locate(&self) -> Result<Reading>;
}

/// Spawn the polling loop for `source` and return the stream of fixes.
///
/// The returned receiver yields fixes until `cancel` fires or the
/// receiver is dropped. The loop:
///
/// 1. takes a measurement (`locate`), racing cancellation;
/// 2. on failure, logs and falls through to the poll wait; errors never
///    end the stream;
/// 3. on success, emits a stamped [`Fix`] only if the reading changed
///    since the last emission, with the send racing cancellation;
/// 4. waits out the poll period, racing cancellation.
pub(crate) fn spawn_stream<S>(
    source: S,
    cancel: CancellationToken,
    key: &str,
) -> mpsc::Receiver<Fix>
where
    S: PollSource + 'static,
{
    let (tx, rx) = mpsc::channel(STREAM_BUFFER);
    let key = key.to_string();
    tokio::spawn(poll_loop(source, cancel, key, tx));
    rx
}

async fn poll_loop<S: PollSource>(
    source: S,
    cancel: CancellationToken,
    key: String,
    tx: mpsc::Sender<Fix>,
) {
    let mut tracker = ChangeTracker::new();

    loop {
        let outcome = tokio::select! {
            _ = cancel.cancelled() => return,
            outcome = source.locate() => outcome,
        };

        match outcome {
            Ok(reading) => {
                if tracker.has_changed(&reading) {
                    tracker.update(&reading);
                    let fix = stamp(&source, &key, reading);

                    tokio::select! {
                        _ = cancel.cancelled() => return,
                        sent = tx.send(fix) => {
                            if sent.is_err() {
                                // Receiver gone; nobody is listening.
                                return;
                            }
                        }
                    }
                }
            }
            Err(error) => {
                tracing::debug!(
                    provider = source.name(),
                    %error,
                    "location read failed, retrying after poll period"
                );
            }
        }

        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = tokio::time::sleep(source.period()) => {}
        }
    }
}

fn stamp<S: PollSource>(source: &S, key: &str, reading: Reading) -> Fix {
    Fix {
        key: key.to_string(),
        lat: reading.lat,
        lon: reading.lon,
        altitude: reading.altitude,
        accuracy_m: reading.accuracy_m,
        confidence: reading.confidence,
        source: source.name().to_string(),
        at: Utc::now(),
        ttl: source.ttl(),
    }
}
