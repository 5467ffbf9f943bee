//! Configuration for the fusion hub.

use std::time::Duration;

use crate::error::HubError;

/// Configuration for [`crate::LocationHub`].
#[derive(Debug, Clone)]
pub struct HubConfig {
    /// How often the merge loop checks the current estimate for expiry.
    /// Default: 10 seconds
    pub sweep_interval: Duration,

    /// Buffer size of the per-key channel provider streams are fanned
    /// into.
    /// Default: 32
    pub merge_buffer: usize,

    /// Capacity of the per-key subscriber broadcast channel. A slow
    /// subscriber that lags past this many updates skips ahead.
    /// Default: 64
    pub update_buffer: usize,

    /// How long `shutdown` waits for each merge task to stop.
    /// Default: 5 seconds
    pub shutdown_timeout: Duration,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            sweep_interval: Duration::from_secs(10),
            merge_buffer: 32,
            update_buffer: 64,
            shutdown_timeout: Duration::from_secs(5),
        }
    }
}

impl HubConfig {
    /// Create a new HubConfig with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the TTL sweep interval.
    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }

    /// Override the merge channel buffer size.
    pub fn with_merge_buffer(mut self, size: usize) -> Self {
        self.merge_buffer = size;
        self
    }

    /// Override the subscriber broadcast capacity.
    pub fn with_update_buffer(mut self, size: usize) -> Self {
        self.update_buffer = size;
        self
    }

    /// Override the shutdown timeout.
    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    /// Validate the configuration and return any issues.
    pub fn validate(&self) -> Result<(), HubError> {
        if self.sweep_interval == Duration::ZERO {
            return Err(HubError::Configuration(
                "sweep interval must be greater than 0".to_string(),
            ));
        }
        if self.merge_buffer == 0 {
            return Err(HubError::Configuration(
                "merge buffer size must be greater than 0".to_string(),
            ));
        }
        if self.update_buffer == 0 {
            return Err(HubError::Configuration(
                "update buffer size must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}
