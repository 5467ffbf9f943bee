//! The streaming contract every location source implements.

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::fix::Fix;

/// One raw measurement from a location source, before it is stamped into
/// a [`Fix`] with key, source name, timestamp and TTL.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reading {
    /// Latitude in signed degrees.
    pub lat: f64,
    /// Longitude in signed degrees.
    pub lon: f64,
    /// Altitude in meters; `None` when the source cannot measure it.
    pub altitude: Option<f64>,
    /// Radius of the uncertainty circle in meters.
    pub accuracy_m: f64,
    /// The source's own trust in this reading, in `[0, 1]`.
    pub confidence: f64,
}

/// A source of location data.
///
/// Implementations produce a lazy, infinite stream of fixes for a key.
/// The behavioral contract:
///
/// - The stream emits a fix only on the first successful read or when the
///   underlying reading has meaningfully changed since the last emission.
/// - Read failures are swallowed and retried after the provider's polling
///   period; the stream never terminates on error and never emits a
///   sentinel value.
/// - The only way the stream ends is cancellation of `cancel`. Every wait
///   and every emission races the token, so shutdown is prompt.
/// - The stream is not restartable, but calling `lookup_stream` again
///   after cancellation starts a fresh stream cleanly.
pub trait LocationProvider: Send + Sync {
    /// Stable identifier for this provider. Used for diagnostics and as
    /// the self-refresh/tie-break key, so it must be distinct across the
    /// registered providers.
    fn name(&self) -> &str;

    /// Start streaming fixes for `key` until `cancel` fires.
    fn lookup_stream(&self, cancel: CancellationToken, key: &str) -> mpsc::Receiver<Fix>;
}
