//! # geofuse-hub
//!
//! The fusion hub owns one stream per registered location provider and
//! merges them into a single best current estimate per key. Subscribers
//! receive every change to the estimate, including its expiry back to
//! "unknown"; one-shot readers get snapshot clones. A forced-refresh path
//! restarts the provider streams out of band, used after host resume.

mod config;
mod error;
mod estimate;
mod hub;

pub use config::HubConfig;
pub use error::{HubError, Result};
pub use hub::{EstimateStream, LocationHub};
