//! Planner configuration.

use chrono::NaiveDate;
use serde::Deserialize;
use tracing::warn;

use crate::clock::TimeOfDay;
use crate::cluster::DEFAULT_ITERATIONS;
use crate::error::ConfigError;
use crate::manifest::{DistanceUnit, ManifestOptions};
use crate::osrm::{DirectionsConfig, DirectionsFlavor};
use crate::store::ClusterSettings;

/// Everything the planner needs from its caller.
///
/// Deserialized values pass through [`PlannerConfig::normalized`] like
/// environment ones do.
#[derive(Debug, Clone, Deserialize)]
#[serde(from = "UncheckedConfig")]
pub struct PlannerConfig {
    /// Number of routes (`k`), at least 1.
    pub route_count: usize,
    /// Due-date pressure in `[0, 1]`.
    pub urgency_weight: f64,
    pub cluster_iterations: usize,
    /// Minutes spent at each stop.
    pub service_delay_minutes: u32,
    /// Operator-entered start time, e.g. `"8:00 AM"`.
    pub start_time: String,
    pub distance_unit: DistanceUnit,
    pub parallel_chunks: bool,
    pub directions: DirectionsConfig,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            route_count: 1,
            urgency_weight: 0.0,
            cluster_iterations: DEFAULT_ITERATIONS,
            service_delay_minutes: 1,
            start_time: "8:00 AM".to_string(),
            distance_unit: DistanceUnit::Miles,
            parallel_chunks: false,
            directions: DirectionsConfig::default(),
        }
    }
}

/// Wire shape of [`PlannerConfig`] before clamping.
#[derive(Deserialize)]
#[serde(default)]
struct UncheckedConfig {
    route_count: usize,
    urgency_weight: f64,
    cluster_iterations: usize,
    service_delay_minutes: u32,
    start_time: String,
    distance_unit: DistanceUnit,
    parallel_chunks: bool,
    directions: DirectionsConfig,
}

impl Default for UncheckedConfig {
    fn default() -> Self {
        let config = PlannerConfig::default();
        Self {
            route_count: config.route_count,
            urgency_weight: config.urgency_weight,
            cluster_iterations: config.cluster_iterations,
            service_delay_minutes: config.service_delay_minutes,
            start_time: config.start_time,
            distance_unit: config.distance_unit,
            parallel_chunks: config.parallel_chunks,
            directions: config.directions,
        }
    }
}

impl From<UncheckedConfig> for PlannerConfig {
    fn from(raw: UncheckedConfig) -> Self {
        Self {
            route_count: raw.route_count,
            urgency_weight: raw.urgency_weight,
            cluster_iterations: raw.cluster_iterations,
            service_delay_minutes: raw.service_delay_minutes,
            start_time: raw.start_time,
            distance_unit: raw.distance_unit,
            parallel_chunks: raw.parallel_chunks,
            directions: raw.directions,
        }
        .normalized()
    }
}

impl PlannerConfig {
    /// Loads configuration from `PLANNER_*` environment variables.
    ///
    /// Unset variables keep their defaults; malformed numbers are errors.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`PlannerConfig::from_env`] over an arbitrary source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(value) = number(&lookup, "PLANNER_ROUTE_COUNT")? {
            config.route_count = value;
        }
        if let Some(value) = number::<f64>(&lookup, "PLANNER_URGENCY_WEIGHT")? {
            config.urgency_weight = value;
        }
        if let Some(value) = number(&lookup, "PLANNER_CLUSTER_ITERATIONS")? {
            config.cluster_iterations = value;
        }
        if let Some(value) = number(&lookup, "PLANNER_SERVICE_DELAY_MINUTES")? {
            config.service_delay_minutes = value;
        }
        if let Some(value) = lookup("PLANNER_START_TIME") {
            config.start_time = value;
        }
        if let Some(value) = lookup("PLANNER_DISTANCE_UNIT") {
            config.distance_unit = match value.to_ascii_lowercase().as_str() {
                "mi" | "miles" => DistanceUnit::Miles,
                "km" | "kilometers" => DistanceUnit::Kilometers,
                _ => {
                    return Err(ConfigError::UnknownValue {
                        key: "PLANNER_DISTANCE_UNIT",
                        value,
                    });
                }
            };
        }
        if let Some(value) = lookup("PLANNER_PARALLEL_CHUNKS") {
            config.parallel_chunks = matches!(value.as_str(), "1" | "true" | "yes");
        }

        if let Some(value) = lookup("PLANNER_DIRECTIONS_URL") {
            config.directions.base_url = value;
        }
        if let Some(value) = lookup("PLANNER_DIRECTIONS_FLAVOR") {
            config.directions.flavor = match value.to_ascii_lowercase().as_str() {
                "osrm" => DirectionsFlavor::Osrm,
                "mapbox" => DirectionsFlavor::Mapbox,
                _ => {
                    return Err(ConfigError::UnknownValue {
                        key: "PLANNER_DIRECTIONS_FLAVOR",
                        value,
                    });
                }
            };
        }
        if let Some(value) = lookup("PLANNER_DIRECTIONS_PROFILE") {
            config.directions.profile = value;
        }
        if let Some(value) = lookup("PLANNER_DIRECTIONS_TOKEN") {
            config.directions.access_token = Some(value);
        }
        if let Some(value) = number(&lookup, "PLANNER_DIRECTIONS_TIMEOUT_SECS")? {
            config.directions.timeout_secs = value;
        }
        if let Some(value) = number(&lookup, "PLANNER_DIRECTIONS_MAX_BATCH")? {
            config.directions.max_batch = value;
        }

        Ok(config.normalized())
    }

    /// Clamps values into their valid ranges.
    pub fn normalized(mut self) -> Self {
        if self.route_count == 0 {
            warn!("route count 0 is not allowed, using 1");
            self.route_count = 1;
        }
        self.urgency_weight = if self.urgency_weight.is_finite() {
            self.urgency_weight.clamp(0.0, 1.0)
        } else {
            0.0
        };
        self.directions.max_batch = self.directions.max_batch.max(2);
        self
    }

    pub fn cluster_settings(&self, today: NaiveDate) -> ClusterSettings {
        ClusterSettings {
            urgency_weight: self.urgency_weight,
            iterations: self.cluster_iterations,
            today,
        }
    }

    pub fn manifest_options(&self) -> ManifestOptions {
        ManifestOptions {
            start_time: TimeOfDay::parse_or_default(Some(&self.start_time)),
            service_delay_minutes: self.service_delay_minutes,
            distance_unit: self.distance_unit,
            parallel: self.parallel_chunks,
        }
    }
}

fn number<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
) -> Result<Option<T>, ConfigError> {
    lookup(key)
        .map(|value| {
            value
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidNumber { key, value })
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn from_pairs(pairs: &[(&str, &str)]) -> Result<PlannerConfig, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        PlannerConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = from_pairs(&[]).unwrap();
        assert_eq!(config.route_count, 1);
        assert_eq!(config.cluster_iterations, 10);
        assert_eq!(config.service_delay_minutes, 1);
        assert_eq!(config.directions.max_batch, 25);
    }

    #[test]
    fn test_overrides_and_clamping() {
        let config = from_pairs(&[
            ("PLANNER_ROUTE_COUNT", "3"),
            ("PLANNER_URGENCY_WEIGHT", "1.7"),
            ("PLANNER_DISTANCE_UNIT", "km"),
            ("PLANNER_DIRECTIONS_FLAVOR", "mapbox"),
        ])
        .unwrap();
        assert_eq!(config.route_count, 3);
        assert_eq!(config.urgency_weight, 1.0);
        assert_eq!(config.distance_unit, DistanceUnit::Kilometers);
        assert_eq!(config.directions.flavor, DirectionsFlavor::Mapbox);
    }

    #[test]
    fn test_malformed_number_is_error() {
        let err = from_pairs(&[("PLANNER_ROUTE_COUNT", "three")]).unwrap_err();
        assert_eq!(
            err,
            ConfigError::InvalidNumber {
                key: "PLANNER_ROUTE_COUNT",
                value: "three".to_string()
            }
        );
    }

    #[test]
    fn test_deserialize_partial_json() {
        let config: PlannerConfig =
            serde_json::from_str(r#"{"route_count": 2, "start_time": "7:30 AM"}"#).unwrap();
        assert_eq!(config.route_count, 2);
        assert_eq!(config.manifest_options().start_time, TimeOfDay::from_hm(7, 30).unwrap());
        assert_eq!(config.service_delay_minutes, 1);
    }

    #[test]
    fn test_deserialized_values_are_clamped() {
        let config: PlannerConfig = serde_json::from_str(
            r#"{"route_count": 0, "urgency_weight": 3.0, "directions": {"max_batch": 1}}"#,
        )
        .unwrap();
        assert_eq!(config.route_count, 1);
        assert_eq!(config.urgency_weight, 1.0);
        assert_eq!(config.directions.max_batch, 2);
    }

    #[test]
    fn test_cluster_settings_carry_iterations() {
        let config = from_pairs(&[("PLANNER_CLUSTER_ITERATIONS", "4")]).unwrap();
        let today = NaiveDate::from_ymd_opt(2024, 5, 10).unwrap();
        let settings = config.cluster_settings(today);
        assert_eq!(settings.iterations, 4);
        assert_eq!(settings.today, today);
    }
}
