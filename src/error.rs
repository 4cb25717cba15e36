//! Error taxonomy for the planner.

use thiserror::Error;

use crate::stop::StopId;

/// Failures of a manifest computation. Any of these leaves the stops untouched.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RoutingError {
    #[error("not enough valid stops to route (found {found}, need at least 2)")]
    InsufficientStops { found: usize },
    #[error("routing failed: {0}")]
    Provider(String),
    #[error("routing provider returned {got} legs, expected {expected}")]
    LegCountMismatch { expected: usize, got: usize },
    #[error("manifest computation cancelled")]
    Cancelled,
}

impl From<reqwest::Error> for RoutingError {
    fn from(err: reqwest::Error) -> Self {
        RoutingError::Provider(err.to_string())
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("unknown stop {0}")]
    UnknownStop(StopId),
    #[error("route count must be at least 1, got {0}")]
    InvalidRouteCount(usize),
    #[error("route {index} is out of range for {route_count} routes")]
    BucketOutOfRange { index: usize, route_count: usize },
    #[error("position {position} is out of range for {len} stops")]
    PositionOutOfRange { position: usize, len: usize },
    #[error(transparent)]
    Routing(#[from] RoutingError),
}

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("persistence request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("persistence service rejected request: {0}")]
    Rejected(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unrecognized time of day {0:?}")]
pub struct ClockError(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("{key} is not a valid number: {value:?}")]
    InvalidNumber { key: &'static str, value: String },
    #[error("{key} has unknown value {value:?}")]
    UnknownValue { key: &'static str, value: String },
}
