//! Error types for the sleep/resume monitor.
//!
//! Bus failures never appear here: connect and subscribe errors are
//! retried inside the monitor's state machine and surface only as log
//! lines.

/// Errors that can occur in the sleep monitor.
#[derive(Debug, thiserror::Error)]
pub enum MonitorError {
    /// Invalid configuration provided
    #[error("configuration error: {0}")]
    Configuration(String),

    /// An error occurred during shutdown
    #[error("shutdown error: {0}")]
    Shutdown(String),
}

/// Convenience type alias for Results using MonitorError.
pub type Result<T> = std::result::Result<T, MonitorError>;
