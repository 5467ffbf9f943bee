//! Error types for location providers.
//!
//! Every variant here is transient: the polling loop logs it, waits out
//! the provider's period and retries. Nothing crosses the provider
//! boundary as a stream error.

use std::path::PathBuf;

/// Errors a provider read can fail with.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// The coordinates file could not be opened or read
    #[error("failed to read {path}: {source}")]
    Io {
        /// Path of the coordinates file
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// A line in the coordinates file did not parse as a number
    #[error("invalid number {value:?} in {path}")]
    Parse {
        /// Path of the coordinates file
        path: PathBuf,
        /// The offending line
        value: String,
    },

    /// The coordinates file held fewer values than required
    #[error("coordinates file has {found} values, need {expected}")]
    MissingValues {
        /// Number of values required
        expected: usize,
        /// Number of values found
        found: usize,
    },

    /// The geolocation request failed (connect, timeout, decode)
    #[error("geolocation request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The geolocation endpoint answered with a non-success status
    #[error("geolocation endpoint returned {status}")]
    Status {
        /// The HTTP status code received
        status: reqwest::StatusCode,
    },
}

/// Convenience type alias for Results using ProviderError.
pub type Result<T> = std::result::Result<T, ProviderError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let error = ProviderError::MissingValues {
            expected: 4,
            found: 3,
        };
        assert_eq!(error.to_string(), "coordinates file has 3 values, need 4");

        let error = ProviderError::Parse {
            path: PathBuf::from("/tmp/location"),
            value: "abc".to_string(),
        };
        assert_eq!(error.to_string(), "invalid number \"abc\" in /tmp/location");

        let error = ProviderError::Status {
            status: reqwest::StatusCode::BAD_GATEWAY,
        };
        assert_eq!(
            error.to_string(),
            "geolocation endpoint returned 502 Bad Gateway"
        );
    }
}
