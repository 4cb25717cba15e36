//! Seams to the planner's external collaborators.
//!
//! The core never talks to the network directly: travel legs come from a
//! [`LegProvider`] and stop lists travel through a [`StopRepository`].

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{PersistenceError, RoutingError};
use crate::persistence::{LoadedSession, SessionQuery, SyncRequest};
use crate::stop::{Coordinates, Stop, StopId};

/// Default number of points a provider accepts per request.
pub const MAX_BATCH: usize = 25;

/// Travel between two consecutive points of a requested sequence.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Leg {
    pub duration_secs: f64,
    pub distance_meters: f64,
}

impl Leg {
    pub fn new(duration_secs: f64, distance_meters: f64) -> Self {
        Self {
            duration_secs,
            distance_meters,
        }
    }
}

/// Supplies travel legs for an ordered list of points.
///
/// Implementations return exactly `points.len() - 1` legs, in order.
pub trait LegProvider {
    /// Largest number of points accepted by one [`LegProvider::legs_for`] call.
    fn max_batch(&self) -> usize {
        MAX_BATCH
    }

    fn legs_for(&self, points: &[Coordinates]) -> Result<Vec<Leg>, RoutingError>;
}

impl<P: LegProvider + ?Sized> LegProvider for &P {
    fn max_batch(&self) -> usize {
        (**self).max_batch()
    }

    fn legs_for(&self, points: &[Coordinates]) -> Result<Vec<Leg>, RoutingError> {
        (**self).legs_for(points)
    }
}

/// The remote service stop lists are loaded from and written back to.
pub trait StopRepository {
    fn load(&self, query: &SessionQuery) -> Result<LoadedSession, PersistenceError>;

    /// Persists a driver route after its manifest was computed.
    fn save_route(
        &self,
        route_id: &str,
        driver: Option<&str>,
        stops: &[Stop],
    ) -> Result<(), PersistenceError>;

    /// Sends an optimize request and returns the service's updated stop list.
    fn sync(&self, request: &SyncRequest) -> Result<Vec<Stop>, PersistenceError>;

    fn unroute_order(&self, id: &StopId) -> Result<(), PersistenceError>;

    fn delete_order(&self, id: &StopId) -> Result<(), PersistenceError>;

    /// Writes column updates onto one order, e.g. a driver change.
    fn update_order(
        &self,
        id: &StopId,
        updates: &Map<String, Value>,
    ) -> Result<(), PersistenceError>;
}
