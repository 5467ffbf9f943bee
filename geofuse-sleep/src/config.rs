//! Configuration for the sleep/resume monitor.

use std::time::Duration;

use crate::error::MonitorError;

/// Configuration for [`crate::SleepMonitor`].
#[derive(Debug, Clone)]
pub struct SleepMonitorConfig {
    /// Wait between failed attempts to open the system bus connection.
    /// Default: 5 seconds
    pub connect_retry_delay: Duration,

    /// Wait after a failed signal subscription before reconnecting.
    /// Default: 10 seconds
    pub subscribe_retry_delay: Duration,

    /// Wait after the bus dropped the signal stream before reconnecting.
    /// Default: 2 seconds
    pub reconnect_delay: Duration,

    /// Minimum spacing between acted-on resume events; duplicates inside
    /// the window are ignored.
    /// Default: 2 seconds
    pub debounce_window: Duration,

    /// How long to wait after a resume before notifying, so the network
    /// can re-establish first.
    /// Default: 5 seconds
    pub resume_grace: Duration,

    /// Buffer size of the resume event channel.
    /// Default: 8
    pub event_buffer: usize,

    /// How long `shutdown` waits for the monitor task to stop.
    /// Default: 5 seconds
    pub shutdown_timeout: Duration,
}

impl Default for SleepMonitorConfig {
    fn default() -> Self {
        Self {
            connect_retry_delay: Duration::from_secs(5),
            subscribe_retry_delay: Duration::from_secs(10),
            reconnect_delay: Duration::from_secs(2),
            debounce_window: Duration::from_secs(2),
            resume_grace: Duration::from_secs(5),
            event_buffer: 8,
            shutdown_timeout: Duration::from_secs(5),
        }
    }
}

impl SleepMonitorConfig {
    /// Create a new SleepMonitorConfig with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the debounce window.
    pub fn with_debounce_window(mut self, window: Duration) -> Self {
        self.debounce_window = window;
        self
    }

    /// Override the post-resume grace period.
    pub fn with_resume_grace(mut self, grace: Duration) -> Self {
        self.resume_grace = grace;
        self
    }

    /// Override the connect retry delay.
    pub fn with_connect_retry_delay(mut self, delay: Duration) -> Self {
        self.connect_retry_delay = delay;
        self
    }

    /// Override the subscribe retry delay.
    pub fn with_subscribe_retry_delay(mut self, delay: Duration) -> Self {
        self.subscribe_retry_delay = delay;
        self
    }

    /// Override the reconnect delay.
    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    /// Validate the configuration and return any issues.
    pub fn validate(&self) -> Result<(), MonitorError> {
        if self.event_buffer == 0 {
            return Err(MonitorError::Configuration(
                "event buffer size must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}
