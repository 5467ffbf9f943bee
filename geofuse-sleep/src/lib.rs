//! # geofuse-sleep
//!
//! Watches the system bus for the host's suspend/resume broadcast and
//! emits a [`ResumeEvent`] after every genuine resume, so the location
//! hub can force a fresh pull instead of serving pre-suspend data.
//!
//! The monitor keeps its bus connection alive through a reconnect state
//! machine (`Disconnected → Connecting → Subscribed → signal loop`),
//! debounces duplicate resume signals, and waits out a short grace period
//! before notifying so the network has a chance to come back first.

mod config;
mod debounce;
mod error;
mod logind;
mod monitor;

pub use config::SleepMonitorConfig;
pub use error::{MonitorError, Result};
pub use monitor::{ResumeEvent, SleepMonitor};
