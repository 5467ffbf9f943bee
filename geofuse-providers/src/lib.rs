//! # geofuse-providers
//!
//! Concrete location providers for the geofuse fusion engine:
//!
//! - [`FileProvider`]: an operator-maintained coordinates file, polled on
//!   a short period and trusted as ground truth.
//! - [`FreeGeoIpProvider`] and [`FreeIpApiProvider`]: two independent
//!   IP-geolocation web services, polled on a long period with confidence
//!   and accuracy derived from how specific the response is.
//!
//! All providers share one polling loop ([`poll`]) that implements the
//! streaming contract of `geofuse_core::LocationProvider`: emit on
//! change, swallow and retry read failures, end only on cancellation.

pub mod error;
pub mod file;
pub mod freegeoip;
pub mod freeipapi;
mod poll;
mod specificity;

pub use error::{ProviderError, Result};
pub use file::FileProvider;
pub use freegeoip::FreeGeoIpProvider;
pub use freeipapi::FreeIpApiProvider;
pub use poll::PollSource;
