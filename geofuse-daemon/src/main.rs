//! geofuse daemon: fuses all location providers into one best estimate
//! and prints every change as a JSON line, for a downstream weather or
//! address lookup to consume. A resume from host sleep forces a fresh
//! pull from every provider.
//!
//! Configuration is environment-based:
//! - `GEOFUSE_LOCATION_FILE`: path of the operator coordinates file
//!   (default `/etc/geofuse/location`)
//! - `RUST_LOG`: log filter for tracing output on stderr

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use geofuse_core::{EstimateUpdate, LocationProvider};
use geofuse_hub::{HubConfig, LocationHub};
use geofuse_providers::{FileProvider, FreeGeoIpProvider, FreeIpApiProvider};
use geofuse_sleep::{SleepMonitor, SleepMonitorConfig};

/// The single subject this daemon locates.
const LOCATION_KEY: &str = "host";
const DEFAULT_LOCATION_FILE: &str = "/etc/geofuse/location";

#[derive(Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
enum StatusLine<'a> {
    Ok {
        key: &'a str,
        lat: f64,
        lon: f64,
        accuracy_m: f64,
        confidence: f64,
        source: &'a str,
        at: DateTime<Utc>,
    },
    Unknown {
        key: &'a str,
    },
}

impl<'a> StatusLine<'a> {
    fn from_update(update: &'a EstimateUpdate) -> Self {
        match update {
            EstimateUpdate::Updated(fix) => StatusLine::Ok {
                key: &fix.key,
                lat: fix.lat,
                lon: fix.lon,
                accuracy_m: fix.accuracy_m,
                confidence: fix.confidence,
                source: &fix.source,
                at: fix.at,
            },
            EstimateUpdate::Unknown { key } => StatusLine::Unknown { key },
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let location_file = std::env::var("GEOFUSE_LOCATION_FILE")
        .unwrap_or_else(|_| DEFAULT_LOCATION_FILE.to_string());

    let client = reqwest::Client::new();
    let providers: Vec<Arc<dyn LocationProvider>> = vec![
        Arc::new(FileProvider::new(&location_file)),
        Arc::new(FreeGeoIpProvider::new(client.clone())),
        Arc::new(FreeIpApiProvider::new(client)),
    ];

    let hub = LocationHub::new(providers, HubConfig::default())?;
    let cancel = CancellationToken::new();
    let (monitor, mut resumes) =
        SleepMonitor::start(SleepMonitorConfig::default(), cancel.clone())?;

    let mut estimates = hub.subscribe(LOCATION_KEY);
    tracing::info!(%location_file, "geofuse daemon started");

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = &mut ctrl_c => {
                tracing::info!("interrupt received, shutting down");
                break;
            }

            update = estimates.next() => match update {
                Some(update) => print_update(&update)?,
                None => break,
            },

            resume = resumes.recv() => {
                if let Some(event) = resume {
                    tracing::info!(resumed_at = %event.at, "resume detected, forcing location refresh");
                    hub.refresh_all().await;
                }
            }
        }
    }

    cancel.cancel();
    drop(estimates);
    if let Err(error) = monitor.shutdown().await {
        tracing::warn!(%error, "sleep monitor shutdown failed");
    }
    if let Err(error) = hub.shutdown().await {
        tracing::warn!(%error, "hub shutdown failed");
    }
    Ok(())
}

fn print_update(update: &EstimateUpdate) -> serde_json::Result<()> {
    let line = serde_json::to_string(&StatusLine::from_update(update))?;
    println!("{line}");
    Ok(())
}
