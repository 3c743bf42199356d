//! OSRM-backed Routing Engine over HTTP.

use crate::error::EnvError;
use crate::routing::{RouteSummary, RoutingEngine};
use crate::types::Coordinate;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

/// HTTP client for an OSRM `route` service.
///
/// Issues `GET {base}/route/v1/driving/{lng},{lat};{lng},{lat}?overview=full&geometries=geojson`
/// and converts the first route into a [`RouteSummary`].
pub struct OsrmClient {
    client: Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct OsrmResponse {
    code: String,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    routes: Vec<OsrmRoute>,
}

#[derive(Debug, Deserialize)]
struct OsrmRoute {
    /// Metres
    distance: f64,
    /// Seconds
    duration: f64,
    geometry: OsrmGeometry,
}

#[derive(Debug, Deserialize)]
struct OsrmGeometry {
    #[serde(default)]
    coordinates: Vec<[f64; 2]>,
}

impl OsrmResponse {
    fn into_summary(self) -> Result<RouteSummary, EnvError> {
        if self.code != "Ok" {
            return Err(EnvError::routing(format!(
                "OSRM returned code {}: {}",
                self.code,
                self.message.unwrap_or_default()
            )));
        }

        // A successful answer without routes is an empty result, not an outage
        let Some(route) = self.routes.into_iter().next() else {
            return Ok(RouteSummary {
                distance_km: 0.0,
                eta_minutes: 0.0,
                path: Vec::new(),
            });
        };

        Ok(RouteSummary {
            distance_km: route.distance / 1000.0,
            eta_minutes: route.duration / 60.0,
            path: route.geometry.coordinates.into_iter().map(Coordinate::from).collect(),
        })
    }
}

impl OsrmClient {
    /// Creates a client for the OSRM server at `base_url`.
    ///
    /// Every request is bounded by `timeout`.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, EnvError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| EnvError::transport(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Returns the configured base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Builds the request URL for a route between two coordinates.
    pub fn route_url(&self, origin: Coordinate, destination: Coordinate) -> String {
        format!(
            "{}/route/v1/driving/{},{};{},{}?overview=full&geometries=geojson",
            self.base_url, origin.longitude, origin.latitude, destination.longitude, destination.latitude
        )
    }
}

#[async_trait]
impl RoutingEngine for OsrmClient {
    async fn route(&self, origin: Coordinate, destination: Coordinate) -> Result<RouteSummary, EnvError> {
        let url = self.route_url(origin, destination);
        debug!(%url, "requesting route");

        let response = self.client.get(&url).send().await.map_err(|e| {
            if e.is_timeout() {
                EnvError::routing(format!("request timed out: {}", e))
            } else {
                EnvError::routing(format!("request failed: {}", e))
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(EnvError::routing(format!("OSRM responded with HTTP {}", status)));
        }

        let body: OsrmResponse = response
            .json()
            .await
            .map_err(|e| EnvError::routing(format!("malformed OSRM response: {}", e)))?;

        body.into_summary()
    }
}
