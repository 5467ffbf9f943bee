//! IP-geolocation provider backed by freeipapi.com.
//!
//! Independent of [`crate::FreeGeoIpProvider`]: different operator,
//! different response schema (camelCase), same specificity ladder.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use geofuse_core::{Fix, LocationProvider, Reading};

use crate::error::{ProviderError, Result};
use crate::poll::{spawn_stream, PollSource};
use crate::specificity::Specificity;

/// Default lookup endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://freeipapi.com/api/json";
/// Default poll period.
pub const DEFAULT_PERIOD: Duration = Duration::from_secs(30 * 60);
/// Default expiry window for fixes from this service.
pub const DEFAULT_TTL: Duration = Duration::from_secs(60 * 60);
/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Streams geolocation fixes from freeipapi.com.
#[derive(Debug, Clone)]
pub struct FreeIpApiProvider {
    name: String,
    client: reqwest::Client,
    endpoint: String,
    timeout: Duration,
    period: Duration,
    ttl: Duration,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FreeIpApiResponse {
    latitude: f64,
    longitude: f64,
    #[serde(default)]
    country_code: String,
    #[serde(default)]
    region_name: String,
    #[serde(default)]
    city_name: String,
    #[serde(default)]
    zip_code: String,
}

impl FreeIpApiProvider {
    /// Create a provider using `client` and the default endpoint and
    /// timings.
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            name: "freeipapi".to_string(),
            client,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            timeout: DEFAULT_TIMEOUT,
            period: DEFAULT_PERIOD,
            ttl: DEFAULT_TTL,
        }
    }

    /// Override the lookup endpoint.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Override the per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Override the poll period.
    pub fn with_period(mut self, period: Duration) -> Self {
        self.period = period;
        self
    }

    /// Override the fix TTL.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    async fn fetch(&self) -> Result<Reading> {
        let response = self
            .client
            .get(&self.endpoint)
            .timeout(self.timeout)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(ProviderError::Status {
                status: response.status(),
            });
        }
        let body: FreeIpApiResponse = response.json().await?;

        let specificity = Specificity::resolve(
            !body.country_code.is_empty(),
            !body.region_name.is_empty(),
            !body.city_name.is_empty(),
            !body.zip_code.is_empty(),
        );

        Ok(Reading {
            lat: body.latitude,
            lon: body.longitude,
            altitude: None,
            accuracy_m: specificity.accuracy_m(),
            confidence: specificity.confidence(),
        })
    }
}

#[async_trait]
impl PollSource for FreeIpApiProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn period(&self) -> Duration {
        self.period
    }

    fn ttl(&self) -> Duration {
        self.ttl
    }

    async fn locate(&self) -> Result<Reading> {
        self.fetch().await
    }
}

impl LocationProvider for FreeIpApiProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookup_stream(&self, cancel: CancellationToken, key: &str) -> mpsc::Receiver<Fix> {
        spawn_stream(self.clone(), cancel, key)
    }
}
