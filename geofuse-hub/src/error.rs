//! Error types for the fusion hub.

/// Errors that can occur in the fusion hub.
///
/// Provider failures never appear here: they are retried inside the
/// provider streams and surface only as log lines and, eventually, an
/// expired estimate.
#[derive(Debug, thiserror::Error)]
pub enum HubError {
    /// Invalid configuration provided
    #[error("configuration error: {0}")]
    Configuration(String),

    /// An error occurred during shutdown
    #[error("shutdown error: {0}")]
    Shutdown(String),
}

/// Convenience type alias for Results using HubError.
pub type Result<T> = std::result::Result<T, HubError>;
