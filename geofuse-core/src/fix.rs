//! Location observations and the selection order between them.
//!
//! A [`Fix`] is one immutable, timestamped observation from a single
//! provider. The hub only ever replaces a stored fix with a newer one; no
//! field is mutated in place, so a reader can never observe a torn value.

use std::cmp::Ordering;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

/// One timestamped location observation from a provider.
///
/// A fix is immutable once constructed. It carries its own expiry window
/// (`at + ttl`); once that has passed the fix must no longer be served,
/// regardless of whether anything newer has arrived.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fix {
    /// Logical subject being located.
    pub key: String,
    /// Latitude in signed degrees.
    pub lat: f64,
    /// Longitude in signed degrees.
    pub lon: f64,
    /// Altitude in meters. `None` when the source cannot measure it.
    pub altitude: Option<f64>,
    /// Radius of the uncertainty circle in meters. Smaller is better.
    pub accuracy_m: f64,
    /// The provider's own trust in this reading, in `[0, 1]`.
    pub confidence: f64,
    /// Name of the provider that produced this fix.
    pub source: String,
    /// When the observation was made.
    pub at: DateTime<Utc>,
    /// How long the fix may be served before it is stale.
    pub ttl: Duration,
}

impl Fix {
    /// The instant at which this fix becomes stale.
    pub fn expires_at(&self) -> DateTime<Utc> {
        let ttl = TimeDelta::from_std(self.ttl).unwrap_or(TimeDelta::MAX);
        self.at
            .checked_add_signed(ttl)
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    /// Whether this fix is stale at `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at()
    }

    /// Whether the fix carries a confidence inside the permitted `[0, 1]`
    /// range. A fix outside the range is a provider logic defect, not a
    /// runtime condition.
    pub fn confidence_in_range(&self) -> bool {
        (0.0..=1.0).contains(&self.confidence)
    }

    /// Decide whether this incoming fix replaces `current` as the winning
    /// estimate at time `now`.
    ///
    /// The order is deterministic:
    ///
    /// 1. A provider always replaces its own prior contribution, so a
    ///    source can refresh itself even with a weaker reading.
    /// 2. An expired `current` loses unconditionally to any fresh fix.
    /// 3. Higher confidence wins.
    /// 4. Equal confidence: smaller accuracy radius wins.
    /// 5. Equal on both: the more recent observation wins.
    ///
    /// `NaN` in confidence or accuracy compares as equal and falls through
    /// to the next rule.
    pub fn supersedes(&self, current: &Fix, now: DateTime<Utc>) -> bool {
        if self.source == current.source {
            return true;
        }
        if current.is_expired_at(now) {
            return true;
        }
        match self.confidence.partial_cmp(&current.confidence) {
            Some(Ordering::Greater) => true,
            Some(Ordering::Less) => false,
            _ => match self.accuracy_m.partial_cmp(&current.accuracy_m) {
                Some(Ordering::Less) => true,
                Some(Ordering::Greater) => false,
                _ => self.at > current.at,
            },
        }
    }
}

/// What subscribers of the fusion hub receive on every change to the
/// current estimate of a key.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum EstimateUpdate {
    /// A new winning fix for the key.
    Updated(Fix),
    /// The estimate for the key expired or was cleared.
    Unknown {
        /// The key whose estimate is no longer known.
        key: String,
    },
}

impl EstimateUpdate {
    /// The key this update refers to.
    pub fn key(&self) -> &str {
        match self {
            EstimateUpdate::Updated(fix) => &fix.key,
            EstimateUpdate::Unknown { key } => key,
        }
    }
}
