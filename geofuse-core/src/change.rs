//! Change suppression for provider streams.

use crate::provider::Reading;

/// Last-emitted snapshot of a provider stream, used to suppress emissions
/// when a fresh read carries the same position as the previous one.
///
/// Comparison is exact equality on the positional fields (latitude,
/// longitude, altitude, accuracy); confidence does not participate. One
/// tracker lives per stream task, created when the stream starts and
/// dropped when it ends.
#[derive(Debug, Default)]
pub struct ChangeTracker {
    last: Option<Snapshot>,
}

#[derive(Debug, PartialEq)]
struct Snapshot {
    lat: f64,
    lon: f64,
    altitude: Option<f64>,
    accuracy_m: f64,
}

impl Snapshot {
    fn of(reading: &Reading) -> Self {
        Self {
            lat: reading.lat,
            lon: reading.lon,
            altitude: reading.altitude,
            accuracy_m: reading.accuracy_m,
        }
    }
}

impl ChangeTracker {
    /// Create a tracker that treats the first reading as a change.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `reading` differs from the last committed snapshot. Pure;
    /// does not commit.
    pub fn has_changed(&self, reading: &Reading) -> bool {
        match &self.last {
            Some(snapshot) => *snapshot != Snapshot::of(reading),
            None => true,
        }
    }

    /// Commit `reading` as the new snapshot.
    pub fn update(&mut self, reading: &Reading) {
        self.last = Some(Snapshot::of(reading));
    }
}
