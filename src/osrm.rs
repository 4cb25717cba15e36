//! Directions HTTP adapter for travel legs.
//!
//! OSRM's `route` service and Mapbox's `directions` API answer with the same
//! `routes[0].legs[]` shape, so one client serves both.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::RoutingError;
use crate::stop::Coordinates;
use crate::traits::{Leg, LegProvider, MAX_BATCH};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DirectionsFlavor {
    #[default]
    Osrm,
    Mapbox,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DirectionsConfig {
    pub base_url: String,
    pub flavor: DirectionsFlavor,
    pub profile: String,
    pub access_token: Option<String>,
    pub timeout_secs: u64,
    /// Waypoints per request; Mapbox caps driving requests at 25.
    pub max_batch: usize,
}

impl Default for DirectionsConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000".to_string(),
            flavor: DirectionsFlavor::Osrm,
            profile: "driving".to_string(),
            access_token: None,
            timeout_secs: 10,
            max_batch: MAX_BATCH,
        }
    }
}

impl DirectionsConfig {
    pub fn mapbox(access_token: impl Into<String>) -> Self {
        Self {
            base_url: "https://api.mapbox.com".to_string(),
            flavor: DirectionsFlavor::Mapbox,
            access_token: Some(access_token.into()),
            ..Self::default()
        }
    }

    /// Request URL for a sequence of points (sent as `lng,lat`).
    pub fn route_url(&self, points: &[Coordinates]) -> String {
        let coords = points
            .iter()
            .map(|point| format!("{:.6},{:.6}", point.lng, point.lat))
            .collect::<Vec<_>>()
            .join(";");

        let mut url = match self.flavor {
            DirectionsFlavor::Osrm => format!(
                "{}/route/v1/{}/{}?overview=false",
                self.base_url, self.profile, coords
            ),
            DirectionsFlavor::Mapbox => format!(
                "{}/directions/v5/mapbox/{}/{}?overview=false",
                self.base_url, self.profile, coords
            ),
        };
        if let Some(token) = &self.access_token {
            url.push_str("&access_token=");
            url.push_str(token);
        }
        url
    }
}

#[derive(Debug, Clone)]
pub struct DirectionsClient {
    config: DirectionsConfig,
    client: reqwest::blocking::Client,
}

impl DirectionsClient {
    pub fn new(config: DirectionsConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { config, client })
    }

    pub fn config(&self) -> &DirectionsConfig {
        &self.config
    }
}

impl LegProvider for DirectionsClient {
    fn max_batch(&self) -> usize {
        self.config.max_batch
    }

    fn legs_for(&self, points: &[Coordinates]) -> Result<Vec<Leg>, RoutingError> {
        if points.len() < 2 {
            return Ok(Vec::new());
        }

        let url = self.config.route_url(points);
        debug!(points = points.len(), flavor = ?self.config.flavor, "requesting directions");

        // Error statuses still carry a JSON body with `code` and `message`.
        let body = self.client.get(url).send()?.json::<RouteResponse>()?;
        body.into_legs()
    }
}

#[derive(Debug, Deserialize)]
struct RouteResponse {
    #[serde(default)]
    code: String,
    message: Option<String>,
    #[serde(default)]
    routes: Vec<RouteBody>,
}

#[derive(Debug, Deserialize)]
struct RouteBody {
    legs: Vec<LegBody>,
}

#[derive(Debug, Deserialize)]
struct LegBody {
    duration: f64,
    distance: f64,
}

impl RouteResponse {
    fn into_legs(self) -> Result<Vec<Leg>, RoutingError> {
        let failure = || {
            RoutingError::Provider(
                self.message
                    .clone()
                    .unwrap_or_else(|| format!("provider answered {}", self.code)),
            )
        };
        if self.code != "Ok" {
            return Err(failure());
        }
        let route = self.routes.first().ok_or_else(failure)?;
        Ok(route
            .legs
            .iter()
            .map(|leg| Leg::new(leg.duration, leg.distance))
            .collect())
    }
}
