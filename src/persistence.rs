//! Wire format and HTTP client for the stop persistence service.
//!
//! The service is a single web-app endpoint: `GET` with a query selecting the
//! session, `POST` with a JSON body whose `action` field picks the operation.

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::clock::TimeOfDay;
use crate::error::PersistenceError;
use crate::stop::{Coordinates, Stop, StopId, StopStatus, ViewMode};
use crate::store::StopStore;
use crate::traits::StopRepository;

/// Which stop list to load. The first present field wins, in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionQuery {
    pub company: Option<String>,
    pub driver: Option<String>,
    pub route_id: Option<String>,
}

impl SessionQuery {
    pub fn query_pair(&self) -> Option<(&'static str, &str)> {
        if let Some(company) = &self.company {
            Some(("company", company))
        } else if let Some(driver) = &self.driver {
            Some(("driver", driver))
        } else {
            self.route_id.as_deref().map(|id| ("id", id))
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Permissions {
    pub modify: bool,
    pub reoptimize: bool,
}

impl Default for Permissions {
    fn default() -> Self {
        Self {
            modify: true,
            reoptimize: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoadedSession {
    pub stops: Vec<Stop>,
    pub service_delay_minutes: Option<u32>,
    pub permissions: Permissions,
    pub display_name: Option<String>,
    /// Start time carried over from a previously computed manifest.
    pub start_time: Option<TimeOfDay>,
    /// Drivers stops can be reassigned to.
    pub inspectors: Vec<Inspector>,
}

/// A roster entry from the load response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inspector {
    #[serde(deserialize_with = "text_or_number")]
    pub id: String,
    #[serde(default)]
    pub name: String,
}

/// A stop as the persistence service sends and receives it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StopRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub row_id: Option<StopId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<StopId>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub lat: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub lng: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
    #[serde(default, deserialize_with = "status_or_blank")]
    pub status: StopStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eta: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dist: Option<String>,
    #[serde(default, deserialize_with = "lenient_f64", skip_serializing_if = "Option::is_none")]
    pub duration_secs: Option<f64>,
    /// Route bucket; written out for the service, ignored on load.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cluster: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manual_cluster: Option<bool>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl StopRecord {
    /// Converts to a fresh stop in bucket 0, unlocked. Records without any id
    /// are dropped.
    pub fn into_stop(self) -> Option<Stop> {
        let Some(id) = self.row_id.or(self.id) else {
            warn!("dropping stop record without id");
            return None;
        };
        let mut stop = Stop::new(id);
        stop.coordinates = Coordinates::from_parts(self.lat, self.lng);
        stop.due_date = self.due_date.as_deref().and_then(parse_due_date);
        stop.status = self.status;
        stop.address = self.address;
        stop.eta = self.eta;
        stop.distance_label = self.dist;
        stop.leg_duration_secs = self.duration_secs;
        stop.extra = self.extra;
        Some(stop)
    }
}

impl From<&Stop> for StopRecord {
    fn from(stop: &Stop) -> Self {
        Self {
            row_id: Some(stop.id.clone()),
            id: Some(stop.id.clone()),
            lat: stop.coordinates.map(|c| c.lat),
            lng: stop.coordinates.map(|c| c.lng),
            due_date: stop.due_date.map(|date| date.format("%Y-%m-%d").to_string()),
            status: stop.status.clone(),
            address: stop.address.clone(),
            eta: stop.eta.clone(),
            dist: stop.distance_label.clone(),
            duration_secs: stop.leg_duration_secs,
            cluster: Some(stop.cluster_index),
            manual_cluster: Some(stop.locked),
            extra: stop.extra.clone(),
        }
    }
}

/// Accepts `2024-05-10`, ISO date-times starting with one, and `5/10/2024`.
pub fn parse_due_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    let parsed = raw
        .get(..10)
        .and_then(|head| NaiveDate::parse_from_str(head, "%Y-%m-%d").ok())
        .or_else(|| NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok())
        .or_else(|| NaiveDate::parse_from_str(raw, "%m/%d/%Y").ok());
    if parsed.is_none() {
        debug!(raw, "ignoring unparseable due date");
    }
    parsed
}

fn lenient_f64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumberOrText {
        Number(f64),
        Text(String),
    }

    Ok(match Option::<NumberOrText>::deserialize(deserializer)? {
        Some(NumberOrText::Number(value)) => Some(value),
        Some(NumberOrText::Text(text)) => text.trim().parse().ok(),
        None => None,
    })
}

fn text_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(StopId::deserialize(deserializer)?.into())
}

/// A `null` status reads as blank, like a missing one.
fn status_or_blank<'de, D: Deserializer<'de>>(deserializer: D) -> Result<StopStatus, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?
        .map(StopStatus::from)
        .unwrap_or_default())
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum LoadResponse {
    Bare(Vec<StopRecord>),
    Full(SessionBody),
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct SessionBody {
    stops: Vec<StopRecord>,
    #[serde(deserialize_with = "lenient_f64")]
    service_delay: Option<f64>,
    permissions: Option<Permissions>,
    display_name: Option<String>,
    inspectors: Option<Vec<Inspector>>,
}

impl LoadResponse {
    fn into_session(self) -> LoadedSession {
        let body = match self {
            LoadResponse::Bare(stops) => SessionBody {
                stops,
                ..SessionBody::default()
            },
            LoadResponse::Full(body) => body,
        };
        let stops: Vec<Stop> = body
            .stops
            .into_iter()
            .filter_map(StopRecord::into_stop)
            .collect();
        let start_time = stops
            .first()
            .and_then(|stop| stop.eta.as_deref())
            .and_then(|eta| eta.parse().ok());

        LoadedSession {
            stops,
            service_delay_minutes: body
                .service_delay
                .filter(|delay| *delay >= 0.0)
                .map(|delay| delay as u32),
            permissions: body.permissions.unwrap_or_default(),
            display_name: body.display_name,
            start_time,
            inspectors: body.inspectors.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SyncAction {
    Optimize,
}

/// Optimize request: either whole routes (routing view) or the plain list.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncRequest {
    pub action: SyncAction,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub driver: Option<String>,
    pub start_time: String,
    pub start_addr: String,
    pub end_addr: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub route_clusters: Option<Vec<Vec<StopRecord>>>,
    /// Urgency weight as a 0-100 slider value.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority_level: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stops: Option<Vec<StopRecord>>,
}

impl SyncRequest {
    /// Builds the request for `store`: grouped routes in the routing view,
    /// the full ordered list otherwise. Start and end addresses default to
    /// those of the first and last stop.
    ///
    /// Route groups hold routable stops only; inactive and ungeocoded stops
    /// are left out of `routeClusters` even when their bucket matches.
    pub fn for_store(
        store: &StopStore,
        start_time: TimeOfDay,
        urgency_weight: f64,
        driver: Option<String>,
    ) -> Self {
        let stops = store.stops();
        let address_of = |stop: Option<&Stop>| {
            stop.and_then(|stop| stop.address.clone()).unwrap_or_default()
        };

        let mut request = Self {
            action: SyncAction::Optimize,
            driver,
            start_time: start_time.to_string(),
            start_addr: address_of(stops.first()),
            end_addr: address_of(stops.last()),
            route_clusters: None,
            priority_level: None,
            stops: None,
        };

        if store.view() == ViewMode::Routing {
            request.route_clusters = Some(
                store
                    .route_groups()
                    .into_iter()
                    .map(|group| group.into_iter().map(StopRecord::from).collect())
                    .collect(),
            );
            request.priority_level = Some((urgency_weight.clamp(0.0, 1.0) * 100.0).round() as u32);
        } else {
            request.stops = Some(stops.iter().map(StopRecord::from).collect());
        }
        request
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SyncResponse {
    updated_stops: Option<Vec<StopRecord>>,
    error: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "action", rename_all = "camelCase")]
enum ActionRequest<'a> {
    #[serde(rename_all = "camelCase")]
    SaveRoute {
        route_id: &'a str,
        driver: Option<&'a str>,
        stops: Vec<StopRecord>,
    },
    #[serde(rename_all = "camelCase")]
    UnrouteOrder { row_id: &'a StopId },
    #[serde(rename_all = "camelCase")]
    DeleteOrder { row_id: &'a StopId },
    #[serde(rename_all = "camelCase")]
    UpdateOrder {
        row_id: &'a StopId,
        updates: &'a Map<String, Value>,
    },
}

/// Sheet column keys the service expects for a driver change.
pub const DRIVER_NAME_COLUMN: &str = "HKAwZ";
pub const DRIVER_ID_COLUMN: &str = "xuPjx";

/// `updates` body for an `updateOrder` that moves a stop to another driver.
pub fn driver_updates(name: &str, driver_id: &str) -> Map<String, Value> {
    let mut updates = Map::new();
    updates.insert(DRIVER_NAME_COLUMN.to_string(), Value::from(name));
    updates.insert(DRIVER_ID_COLUMN.to_string(), Value::from(driver_id));
    updates
}

#[derive(Debug, Clone)]
pub struct PersistenceConfig {
    pub endpoint: String,
    pub timeout_secs: u64,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:8080/exec".to_string(),
            timeout_secs: 30,
        }
    }
}

/// [`StopRepository`] over the web-app endpoint.
#[derive(Debug, Clone)]
pub struct WebAppClient {
    config: PersistenceConfig,
    client: reqwest::blocking::Client,
}

impl WebAppClient {
    pub fn new(config: PersistenceConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { config, client })
    }

    fn post<T: Serialize + ?Sized>(
        &self,
        body: &T,
    ) -> Result<reqwest::blocking::Response, PersistenceError> {
        Ok(self
            .client
            .post(&self.config.endpoint)
            .json(body)
            .send()?
            .error_for_status()?)
    }
}

impl StopRepository for WebAppClient {
    fn load(&self, query: &SessionQuery) -> Result<LoadedSession, PersistenceError> {
        let Some(pair) = query.query_pair() else {
            return Err(PersistenceError::Rejected(
                "no company, driver or route selected".to_string(),
            ));
        };
        let response = self
            .client
            .get(&self.config.endpoint)
            .query(&[pair])
            .send()?
            .error_for_status()?
            .json::<LoadResponse>()?;
        let session = response.into_session();
        debug!(stops = session.stops.len(), "session loaded");
        Ok(session)
    }

    fn save_route(
        &self,
        route_id: &str,
        driver: Option<&str>,
        stops: &[Stop],
    ) -> Result<(), PersistenceError> {
        self.post(&ActionRequest::SaveRoute {
            route_id,
            driver,
            stops: stops.iter().map(StopRecord::from).collect(),
        })?;
        Ok(())
    }

    fn sync(&self, request: &SyncRequest) -> Result<Vec<Stop>, PersistenceError> {
        let response = self.post(request)?.json::<SyncResponse>()?;
        match (response.updated_stops, response.error) {
            (Some(records), _) => Ok(records
                .into_iter()
                .filter_map(StopRecord::into_stop)
                .collect()),
            (None, error) => Err(PersistenceError::Rejected(
                error.unwrap_or_else(|| "response carried no updated stops".to_string()),
            )),
        }
    }

    fn unroute_order(&self, id: &StopId) -> Result<(), PersistenceError> {
        self.post(&ActionRequest::UnrouteOrder { row_id: id })?;
        Ok(())
    }

    fn delete_order(&self, id: &StopId) -> Result<(), PersistenceError> {
        self.post(&ActionRequest::DeleteOrder { row_id: id })?;
        Ok(())
    }

    fn update_order(
        &self,
        id: &StopId,
        updates: &Map<String, Value>,
    ) -> Result<(), PersistenceError> {
        self.post(&ActionRequest::UpdateOrder {
            row_id: id,
            updates,
        })?;
        Ok(())
    }
}
