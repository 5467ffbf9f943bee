//! Location provider backed by an operator-maintained coordinates file.
//!
//! The file holds four decimal numbers, one per non-blank line, in fixed
//! order: latitude, longitude, altitude, accuracy in meters. A missing or
//! malformed file is a retry condition, never fatal. Because the file is
//! operator-provided ground truth, its readings carry full confidence.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use geofuse_core::{Fix, LocationProvider, Reading};

use crate::error::{ProviderError, Result};
use crate::poll::{spawn_stream, PollSource};

/// Default poll period for the coordinates file.
pub const DEFAULT_PERIOD: Duration = Duration::from_secs(2 * 60);
/// Default expiry window for file-sourced fixes.
pub const DEFAULT_TTL: Duration = Duration::from_secs(15 * 60);

/// Operator input is trusted as ground truth.
const FILE_CONFIDENCE: f64 = 1.0;
/// Latitude, longitude, altitude, accuracy.
const REQUIRED_VALUES: usize = 4;

/// Reads geolocation data from a coordinates file on a short period.
#[derive(Debug, Clone)]
pub struct FileProvider {
    name: String,
    path: PathBuf,
    period: Duration,
    ttl: Duration,
}

impl FileProvider {
    /// Create a file provider for `path` with the default period and TTL.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            name: "file".to_string(),
            path: path.into(),
            period: DEFAULT_PERIOD,
            ttl: DEFAULT_TTL,
        }
    }

    /// Override the poll period.
    pub fn with_period(mut self, period: Duration) -> Self {
        self.period = period;
        self
    }

    /// Override the fix TTL.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    async fn read_file(&self) -> Result<Reading> {
        let contents =
            tokio::fs::read_to_string(&self.path)
                .await
                .map_err(|source| ProviderError::Io {
                    path: self.path.clone(),
                    source,
                })?;

        let mut values = Vec::with_capacity(REQUIRED_VALUES);
        for line in contents.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let value: f64 = line.parse().map_err(|_| ProviderError::Parse {
                path: self.path.clone(),
                value: line.to_string(),
            })?;
            values.push(value);
        }

        if values.len() < REQUIRED_VALUES {
            return Err(ProviderError::MissingValues {
                expected: REQUIRED_VALUES,
                found: values.len(),
            });
        }

        Ok(Reading {
            lat: values[0],
            lon: values[1],
            altitude: Some(values[2]),
            accuracy_m: values[3],
            confidence: FILE_CONFIDENCE,
        })
    }
}

#[async_trait]
impl PollSource for FileProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn period(&self) -> Duration {
        self.period
    }

    fn ttl(&self) -> Duration {
        self.ttl
    }

    async fn locate(&self) -> Result<Reading> {
        self.read_file().await
    }
}

impl LocationProvider for FileProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookup_stream(&self, cancel: CancellationToken, key: &str) -> mpsc::Receiver<Fix> {
        spawn_stream(self.clone(), cancel, key)
    }
}
