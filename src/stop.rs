//! Stop records and the activity predicate.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Stable identifier of a stop. The persistence service sends either strings
/// or integers; both are kept as text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "RawId", into = "String")]
pub struct StopId(String);

impl StopId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StopId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for StopId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for StopId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<i64> for StopId {
    fn from(value: i64) -> Self {
        Self(value.to_string())
    }
}

impl From<StopId> for String {
    fn from(id: StopId) -> Self {
        id.0
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Int(i64),
    Text(String),
}

impl From<RawId> for StopId {
    fn from(raw: RawId) -> Self {
        match raw {
            RawId::Int(value) => value.into(),
            RawId::Text(value) => Self(value),
        }
    }
}

/// A point in degree space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinates {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Builds coordinates from optional wire values. Zero, missing and
    /// non-finite components all count as "not geocoded".
    pub fn from_parts(lat: Option<f64>, lng: Option<f64>) -> Option<Self> {
        match (lat, lng) {
            (Some(lat), Some(lng))
                if lat.is_finite() && lng.is_finite() && lat != 0.0 && lng != 0.0 =>
            {
                Some(Self { lat, lng })
            }
            _ => None,
        }
    }

    /// Planar distance in degree space.
    pub fn planar_distance(&self, other: &Coordinates) -> f64 {
        let d_lat = self.lat - other.lat;
        let d_lng = self.lng - other.lng;
        (d_lat * d_lat + d_lng * d_lng).sqrt()
    }
}

/// Free-form status tag with the values the planner gives meaning to.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum StopStatus {
    #[default]
    Blank,
    Active,
    Cancelled,
    Completed,
    Routed,
    Unrouted,
    Other(String),
}

impl StopStatus {
    pub fn as_str(&self) -> &str {
        match self {
            StopStatus::Blank => "",
            StopStatus::Active => "active",
            StopStatus::Cancelled => "cancelled",
            StopStatus::Completed => "completed",
            StopStatus::Routed => "routed",
            StopStatus::Unrouted => "unrouted",
            StopStatus::Other(value) => value,
        }
    }
}

impl From<String> for StopStatus {
    fn from(value: String) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "" => StopStatus::Blank,
            "active" => StopStatus::Active,
            "cancelled" => StopStatus::Cancelled,
            "completed" => StopStatus::Completed,
            "routed" => StopStatus::Routed,
            "unrouted" => StopStatus::Unrouted,
            _ => StopStatus::Other(value),
        }
    }
}

impl From<&str> for StopStatus {
    fn from(value: &str) -> Self {
        value.to_string().into()
    }
}

impl From<StopStatus> for String {
    fn from(status: StopStatus) -> Self {
        status.as_str().to_string()
    }
}

pub const DRIVER_NAME_FIELD: &str = "driverName";
pub const DRIVER_ID_FIELD: &str = "driverId";

/// One service location.
#[derive(Debug, Clone, PartialEq)]
pub struct Stop {
    pub id: StopId,
    pub coordinates: Option<Coordinates>,
    pub due_date: Option<NaiveDate>,
    pub status: StopStatus,
    pub address: Option<String>,
    pub cluster_index: usize,
    pub locked: bool,
    pub eta: Option<String>,
    pub distance_label: Option<String>,
    pub leg_duration_secs: Option<f64>,
    /// Fields the planner does not interpret, carried back to persistence as-is.
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Stop {
    pub fn new(id: impl Into<StopId>) -> Self {
        Self {
            id: id.into(),
            coordinates: None,
            due_date: None,
            status: StopStatus::Blank,
            address: None,
            cluster_index: 0,
            locked: false,
            eta: None,
            distance_label: None,
            leg_duration_secs: None,
            extra: serde_json::Map::new(),
        }
    }

    pub fn at(mut self, lat: f64, lng: f64) -> Self {
        self.coordinates = Some(Coordinates::new(lat, lng));
        self
    }

    pub fn due(mut self, date: NaiveDate) -> Self {
        self.due_date = Some(date);
        self
    }

    pub fn with_status(mut self, status: impl Into<StopStatus>) -> Self {
        self.status = status.into();
        self
    }

    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }

    /// Assigned driver as carried in the passthrough fields.
    pub fn driver_id(&self) -> Option<&str> {
        self.extra.get(DRIVER_ID_FIELD).and_then(serde_json::Value::as_str)
    }

    pub fn driver_name(&self) -> Option<&str> {
        self.extra.get(DRIVER_NAME_FIELD).and_then(serde_json::Value::as_str)
    }

    pub fn is_geocoded(&self) -> bool {
        self.coordinates.is_some()
    }

    pub fn is_completed(&self) -> bool {
        self.status == StopStatus::Completed
    }

    /// Whole days from `today` until the due date; `None` when undated.
    pub fn days_until_due(&self, today: NaiveDate) -> Option<i64> {
        self.due_date
            .map(|due| due.signed_duration_since(today).num_days())
    }
}

/// Which screen the session is driving. It decides what counts as active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    #[default]
    Driver,
    Manager,
    Map,
    List,
    Routing,
}

impl ViewMode {
    pub fn is_active(&self, stop: &Stop) -> bool {
        match self {
            ViewMode::Routing => stop.status == StopStatus::Routed,
            _ => stop.status != StopStatus::Cancelled,
        }
    }

    /// Active and geocoded: the stops clustering and routing operate on.
    pub fn is_routable(&self, stop: &Stop) -> bool {
        stop.is_geocoded() && self.is_active(stop)
    }
}

impl std::str::FromStr for ViewMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "driver" => Ok(ViewMode::Driver),
            "manager" => Ok(ViewMode::Manager),
            "map" => Ok(ViewMode::Map),
            "list" => Ok(ViewMode::List),
            "routing" => Ok(ViewMode::Routing),
            other => Err(other.to_string()),
        }
    }
}
