//! # geofuse-core
//!
//! Data-model primitives and contracts for the geofuse location fusion
//! engine. This crate defines what a location observation is, how two
//! observations are compared, and the streaming contract every location
//! source must obey. It carries no I/O of its own; concrete providers live
//! in `geofuse-providers` and the merge loop in `geofuse-hub`.

mod change;
mod fix;
mod provider;

pub use change::ChangeTracker;
pub use fix::{EstimateUpdate, Fix};
pub use provider::{LocationProvider, Reading};
